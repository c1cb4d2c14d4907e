use ndarray::{Array, Dimension, ShapeBuilder};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Uniform;
use serde::{Serialize, Deserialize};

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    /// Xavier/Glorot uniform initialization
    XavierUniform,

    /// He/Kaiming uniform initialization (for ReLU)
    HeUniform,
}

impl WeightInit {
    /// Initialize a weight tensor of any rank.
    ///
    /// `fan_in` and `fan_out` are passed explicitly because convolution
    /// kernels count the receptive field, not just the leading axes.
    pub fn initialize<Sh, D, R>(&self, shape: Sh, fan_in: usize, fan_out: usize, rng: &mut R) -> Array<f32, D>
    where
        Sh: ShapeBuilder<Dim = D>,
        D: Dimension,
        R: Rng + ?Sized,
    {
        match self {
            WeightInit::XavierUniform => {
                let limit = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
                Array::random_using(shape, Uniform::new_inclusive(-limit, limit), rng)
            }

            WeightInit::HeUniform => {
                let limit = (6.0 / fan_in.max(1) as f32).sqrt();
                Array::random_using(shape, Uniform::new_inclusive(-limit, limit), rng)
            }
        }
    }

    /// Get the recommended initialization for an activation function
    pub fn for_activation(activation: &crate::activations::Activation) -> Self {
        use crate::activations::Activation;

        match activation {
            Activation::Relu => WeightInit::HeUniform,
            Activation::Linear => WeightInit::XavierUniform,
        }
    }
}

/// Constant every bias starts from
pub const BIAS_INIT: f32 = 0.1;
