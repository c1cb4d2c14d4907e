use ndarray::{Array2, ArrayView2};
use rand::Rng;
use serde::{Serialize, Deserialize};
use crate::error::{QcompError, Result};

/// Dropout Layer
///
/// Randomly zeroes input units with probability `dropout_rate` during
/// training and rescales the survivors by `1 / (1 - rate)`. Inference paths
/// skip the layer entirely. The layer sits in front of the compressor,
/// whose input is a constant, so no backward pass is needed.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DropoutLayer {
    /// Dropout probability (probability of dropping a unit)
    pub dropout_rate: f32,
}

impl DropoutLayer {
    pub fn new(dropout_rate: f32) -> Result<Self> {
        if !(0.0..1.0).contains(&dropout_rate) {
            return Err(QcompError::configuration(
                "dropout".to_string(),
                format!("rate must be in [0, 1), got {}", dropout_rate),
            ));
        }
        Ok(DropoutLayer { dropout_rate })
    }

    /// Apply dropout to a training batch; draws from `rng` only with a non-zero rate.
    pub fn forward_batch<R: Rng + ?Sized>(&self, inputs: ArrayView2<f32>, rng: &mut R) -> Array2<f32> {
        if self.dropout_rate == 0.0 {
            return inputs.to_owned();
        }

        let keep = 1.0 - self.dropout_rate;
        let scale = 1.0 / keep;
        inputs.mapv(|v| if rng.gen::<f32>() < keep { v * scale } else { 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_zero_rate_is_identity() {
        let layer = DropoutLayer::new(0.0).unwrap();
        let inputs = Array2::from_elem((3, 4), 2.0);
        let out = layer.forward_batch(inputs.view(), &mut StdRng::seed_from_u64(1));
        assert_eq!(out, inputs);
    }

    #[test]
    fn test_training_zeroes_or_rescales() {
        let layer = DropoutLayer::new(0.5).unwrap();
        let inputs = Array2::from_elem((10, 10), 1.0);
        let out = layer.forward_batch(inputs.view(), &mut StdRng::seed_from_u64(1));
        assert!(out.iter().all(|&v| v == 0.0 || (v - 2.0).abs() < 1e-6));
        assert!(out.iter().any(|&v| v == 0.0));
    }

    #[test]
    fn test_rejects_rate_of_one() {
        assert!(DropoutLayer::new(1.0).is_err());
    }
}
