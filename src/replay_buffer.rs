use std::collections::VecDeque;

use ndarray::{Array1, Array3, Array4, Axis};
use rand::Rng;

use crate::error::{QcompError, Result};

/// One observed step: stacked frames `(frames, height, width)` before and after the action
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: Array3<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array3<f32>,
    pub terminal: bool,
}

/// A fixed-size batch of transitions, stacked along a leading batch axis
#[derive(Clone, Debug)]
pub struct TransitionBatch {
    pub states: Array4<f32>,
    pub actions: Vec<usize>,
    pub rewards: Array1<f32>,
    pub next_states: Array4<f32>,
    pub terminals: Vec<bool>,
}

impl TransitionBatch {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Stack single transitions into a batch; all states must share one shape.
    pub fn from_transitions(transitions: &[&Transition]) -> Result<Self> {
        let first = transitions
            .first()
            .ok_or_else(|| QcompError::shape("at least one transition", "none"))?;
        let (frames, height, width) = first.state.dim();
        let batch_size = transitions.len();

        let mut states = Array4::zeros((batch_size, frames, height, width));
        let mut next_states = Array4::zeros((batch_size, frames, height, width));
        for (i, transition) in transitions.iter().enumerate() {
            for state in [&transition.state, &transition.next_state] {
                if state.dim() != (frames, height, width) {
                    return Err(QcompError::shape(
                        format!("{:?}", (frames, height, width)),
                        format!("{:?}", state.dim()),
                    ));
                }
            }
            states.index_axis_mut(Axis(0), i).assign(&transition.state);
            next_states.index_axis_mut(Axis(0), i).assign(&transition.next_state);
        }

        Ok(TransitionBatch {
            states,
            actions: transitions.iter().map(|t| t.action).collect(),
            rewards: transitions.iter().map(|t| t.reward).collect(),
            next_states,
            terminals: transitions.iter().map(|t| t.terminal).collect(),
        })
    }

    /// Check every component against the expected `(batch, frames, height, width)` and action count.
    pub fn validate(&self, expected: (usize, usize, usize, usize), num_actions: usize) -> Result<()> {
        for states in [&self.states, &self.next_states] {
            if states.dim() != expected {
                return Err(QcompError::shape(format!("{:?}", expected), format!("{:?}", states.dim())));
            }
        }
        let batch_size = expected.0;
        for (name, len) in [
            ("actions", self.actions.len()),
            ("rewards", self.rewards.len()),
            ("terminals", self.terminals.len()),
        ] {
            if len != batch_size {
                return Err(QcompError::shape(
                    format!("{} {}", batch_size, name),
                    format!("{}", len),
                ));
            }
        }
        if let Some(&action) = self.actions.iter().find(|&&a| a >= num_actions) {
            return Err(QcompError::InvalidAction { action, num_actions });
        }
        Ok(())
    }
}

/// Fixed-capacity experience memory; the oldest transition is evicted first.
#[derive(Clone)]
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn add(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Sample `batch_size` distinct transitions uniformly.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<&Transition>> {
        if batch_size > self.buffer.len() {
            return Err(QcompError::shape(
                format!("at least {} stored transitions", batch_size),
                format!("{}", self.buffer.len()),
            ));
        }
        Ok(rand::seq::index::sample(rng, self.buffer.len(), batch_size)
            .into_iter()
            .map(|i| &self.buffer[i])
            .collect())
    }

    /// Sample and stack a training batch.
    pub fn sample_batch<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<TransitionBatch> {
        let transitions = self.sample(batch_size, rng)?;
        TransitionBatch::from_transitions(&transitions)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
