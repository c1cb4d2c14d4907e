//! Action selection.
//!
//! Both policies add an exploration bias derived from the compression loss of
//! the current observation, normalised by the largest compression loss seen
//! so far: the worse the compressor reconstructs a state, the more the agent
//! explores there.

use std::fmt;
use std::str::FromStr;

use log::warn;
use ndarray::{Array1, ArrayView1};
use rand::distributions::WeightedIndex;
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::{QcompError, Result};

/// Policy chosen at construction
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ActionSelection {
    /// Random action with probability `epsilon + bias`, greedy otherwise
    EpsilonGreedy,
    /// Boltzmann sampling at temperature `epsilon + bias`
    Softmax,
}

impl FromStr for ActionSelection {
    type Err = QcompError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "epsilon-greedy" | "epsilon_greedy" => Ok(ActionSelection::EpsilonGreedy),
            "softmax" => Ok(ActionSelection::Softmax),
            other => Err(QcompError::configuration(
                "action_selection".to_string(),
                format!("unrecognized action selection '{}'", other),
            )),
        }
    }
}

impl fmt::Display for ActionSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionSelection::EpsilonGreedy => write!(f, "epsilon-greedy"),
            ActionSelection::Softmax => write!(f, "softmax"),
        }
    }
}

/// `loss / max_loss`, or 0 while no positive compression loss has been observed.
pub fn exploration_bias(compression_loss: f32, max_compression_loss: f32) -> f32 {
    if max_compression_loss > 0.0 {
        compression_loss / max_compression_loss
    } else {
        0.0
    }
}

/// Index of the first maximal value; NaN entries never win.
pub fn argmax(values: ArrayView1<f32>) -> usize {
    let mut best = 0;
    for (index, &value) in values.iter().enumerate() {
        if value > values[best] || values[best].is_nan() {
            best = index;
        }
    }
    best
}

/// Sampling weights `exp((q − max q) / tau)`.
///
/// Shifting by the maximum leaves the sampling distribution unchanged and
/// keeps the largest weight at exactly 1, so small temperatures cannot
/// overflow. A non-positive or non-finite temperature, or non-finite values,
/// are reported as a [`QcompError::NumericHazard`].
pub fn softmax_weights(q_values: ArrayView1<f32>, tau: f32) -> Result<Array1<f32>> {
    if !(tau.is_finite() && tau > 0.0) {
        warn!("softmax temperature {} is not positive; the action distribution is degenerate", tau);
        return Err(QcompError::NumericHazard(format!("softmax temperature must be positive, got {}", tau)));
    }
    if q_values.iter().any(|q| !q.is_finite()) {
        warn!("non-finite action values {:?} passed to softmax selection", q_values);
        return Err(QcompError::NumericHazard("action values must be finite".to_string()));
    }
    let max = q_values[argmax(q_values)];
    Ok(q_values.mapv(|q| ((q - max) / tau).exp()))
}

impl ActionSelection {
    /// Choose an action for one observation.
    ///
    /// * `q_values` - action values of the observation
    /// * `epsilon` - base exploration parameter
    /// * `bias` - exploration bias from [`exploration_bias`]
    pub fn select<R: Rng + ?Sized>(&self, q_values: ArrayView1<f32>, epsilon: f32, bias: f32, rng: &mut R) -> Result<usize> {
        let num_actions = q_values.len();
        if num_actions == 0 {
            return Err(QcompError::shape("at least one action value", "none"));
        }

        match self {
            ActionSelection::EpsilonGreedy => {
                if rng.gen::<f32>() < epsilon + bias {
                    Ok(rng.gen_range(0..num_actions))
                } else {
                    Ok(argmax(q_values))
                }
            }
            ActionSelection::Softmax => {
                let weights = softmax_weights(q_values, epsilon + bias)?;
                let distribution = WeightedIndex::new(weights.iter())
                    .map_err(|e| QcompError::NumericHazard(format!("softmax weights unusable: {}", e)))?;
                Ok(rng.sample(distribution))
            }
        }
    }
}
