use ndarray::{Array, ArrayBase, Data, Dimension};
use serde::{Serialize, Deserialize};

/// An enumeration of the activation functions a layer can apply.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
}

impl Activation {
    /// Apply the activation function to a tensor in-place.
    pub fn apply<D: Dimension>(&self, input: &mut Array<f32, D>) {
        match self {
            Activation::Relu => input.mapv_inplace(|v| v.max(0.0)),
            Activation::Linear => {}
        }
    }

    /// Compute the derivative at the given pre-activation values.
    pub fn derivative<S, D>(&self, pre_activation: &ArrayBase<S, D>) -> Array<f32, D>
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        match self {
            Activation::Relu => pre_activation.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => Array::ones(pre_activation.raw_dim()),
        }
    }
}
