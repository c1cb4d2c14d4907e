use std::collections::VecDeque;
use std::path::Path;

use serde::{Serialize, Deserialize};

/// Rolling history of what the learner observed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// RMS training loss per step
    pub losses: VecDeque<f32>,

    /// Batch compression loss per step
    pub compression_losses: VecDeque<f32>,

    /// Mean action value of the selected actions per step
    pub q_values: VecDeque<f32>,

    /// Epsilon passed to action selection
    pub epsilons: VecDeque<f32>,

    /// Exploration bias applied on top of epsilon
    pub exploration_biases: VecDeque<f32>,
}

fn push_bounded(history: &mut VecDeque<f32>, value: f32, capacity: usize) {
    if history.len() >= capacity {
        history.pop_front();
    }
    history.push_back(value);
}

fn mean_of(history: &VecDeque<f32>, window: usize) -> Option<f32> {
    if history.is_empty() {
        return None;
    }
    let n = window.min(history.len());
    let sum: f32 = history.iter().rev().take(n).sum();
    Some(sum / n as f32)
}

/// Tracks metrics during training
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    metrics: TrainingMetrics,
    history_size: usize,
    total_steps: usize,
    total_actions: usize,
}

impl MetricsTracker {
    pub fn new(history_size: usize) -> Self {
        MetricsTracker {
            metrics: TrainingMetrics::default(),
            history_size: history_size.max(1),
            total_steps: 0,
            total_actions: 0,
        }
    }

    /// Record one completed training step
    pub fn record_step(&mut self, loss: f32, compression_loss: f32, mean_q: f32) {
        push_bounded(&mut self.metrics.losses, loss, self.history_size);
        push_bounded(&mut self.metrics.compression_losses, compression_loss, self.history_size);
        push_bounded(&mut self.metrics.q_values, mean_q, self.history_size);
        self.total_steps += 1;
    }

    /// Record the exploration parameters of one action choice
    pub fn record_action(&mut self, epsilon: f32, bias: f32) {
        push_bounded(&mut self.metrics.epsilons, epsilon, self.history_size);
        push_bounded(&mut self.metrics.exploration_biases, bias, self.history_size);
        self.total_actions += 1;
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn total_actions(&self) -> usize {
        self.total_actions
    }

    /// Get recent average loss
    pub fn avg_loss(&self, window: usize) -> Option<f32> {
        mean_of(&self.metrics.losses, window)
    }

    pub fn avg_compression_loss(&self, window: usize) -> Option<f32> {
        mean_of(&self.metrics.compression_losses, window)
    }

    pub fn avg_exploration_bias(&self, window: usize) -> Option<f32> {
        mean_of(&self.metrics.exploration_biases, window)
    }

    /// Save metrics to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> crate::error::Result<()> {
        let serialized = serde_json::to_string_pretty(&self.metrics)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new(1000)
    }
}
