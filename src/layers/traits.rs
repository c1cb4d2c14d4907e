use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD};

/// Trait shared by every layer that owns trainable tensors.
///
/// Parameters are exposed as dynamic-rank views in a fixed order; gradients
/// produced by the layer's backward pass use the same order.
pub trait Layer: Send + Sync {
    /// Views of the trainable tensors, weights first then biases
    fn parameters(&self) -> Vec<ArrayViewD<'_, f32>>;

    /// Mutable views of the trainable tensors, in the same order as [`Layer::parameters`]
    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>>;

    /// Number of scalar parameters in the layer
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }

    /// Owned copies of every parameter tensor
    fn parameter_values(&self) -> Vec<ArrayD<f32>> {
        self.parameters().into_iter().map(|p| p.to_owned()).collect()
    }
}
