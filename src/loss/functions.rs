use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Serialize, Deserialize};

use crate::error::{QcompError, Result};

/// TD loss for a single difference `diff = target − prediction`.
///
/// With `delta > 0` this is the Huber loss: `½·diff²` while `|diff| ≤ delta`,
/// then `½·delta² + delta·(|diff| − delta)`, so the slope stays at `±delta`
/// past the clip point instead of dropping to zero. With `delta == 0` it is
/// plain `½·diff²`.
pub fn clipped_loss(diff: f32, delta: f32) -> f32 {
    if delta > 0.0 {
        let quadratic = diff.abs().min(delta);
        let linear = diff.abs() - quadratic;
        0.5 * quadratic * quadratic + delta * linear
    } else {
        0.5 * diff * diff
    }
}

/// Derivative of [`clipped_loss`] with respect to `diff`
pub fn clipped_loss_derivative(diff: f32, delta: f32) -> f32 {
    if delta > 0.0 {
        diff.clamp(-delta, delta)
    } else {
        diff
    }
}

/// Per-example compression loss: mean over features of `½·(original − reconstructed)²`.
pub fn reconstruction_losses(original: ArrayView2<f32>, reconstructed: ArrayView2<f32>) -> Array1<f32> {
    let diff = &original - &reconstructed;
    let width = diff.ncols().max(1) as f32;
    diff.mapv(|d| 0.5 * d * d).sum_axis(Axis(1)) / width
}

/// How per-example losses are folded into one batch loss
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchAccumulator {
    Sum,
    Mean,
}

impl BatchAccumulator {
    pub fn accumulate(&self, losses: ArrayView1<f32>) -> f32 {
        match self {
            BatchAccumulator::Sum => losses.sum(),
            BatchAccumulator::Mean => losses.mean().unwrap_or(0.0),
        }
    }

    /// Factor each example's loss gradient carries under this accumulator
    pub fn gradient_scale(&self, batch_size: usize) -> f32 {
        match self {
            BatchAccumulator::Sum => 1.0,
            BatchAccumulator::Mean => 1.0 / batch_size.max(1) as f32,
        }
    }
}

impl FromStr for BatchAccumulator {
    type Err = QcompError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(BatchAccumulator::Sum),
            "mean" => Ok(BatchAccumulator::Mean),
            other => Err(QcompError::configuration(
                "batch_accumulator".to_string(),
                format!("bad accumulator '{}'", other),
            )),
        }
    }
}

impl fmt::Display for BatchAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchAccumulator::Sum => write!(f, "sum"),
            BatchAccumulator::Mean => write!(f, "mean"),
        }
    }
}
