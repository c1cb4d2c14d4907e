use ndarray::{Array1, Array2, ArrayView2, ArrayViewD, ArrayViewMutD, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};
use crate::activations::Activation;
use crate::error::{QcompError, Result};
use super::initialization::{WeightInit, BIAS_INIT};
use super::traits::Layer as LayerTrait;

/// Gradients produced by a dense layer's backward pass
pub struct DenseGradients {
    /// Error propagated to the layer input
    pub input: Array2<f32>,
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
}

/// A fully connected (dense) layer in a neural network
#[derive(Serialize, Deserialize, Clone)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl DenseLayer {
    /// Create a new dense layer.
    ///
    /// Weights follow the recommended initialisation for the activation and
    /// biases start at a small positive constant.
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, activation: Activation, rng: &mut R) -> Self {
        let weights = WeightInit::for_activation(&activation)
            .initialize((input_size, output_size), input_size, output_size, rng);
        let biases = Array1::from_elem(output_size, BIAS_INIT);
        DenseLayer {
            weights,
            biases,
            activation,
            pre_activation_output: None,
            inputs: None,
        }
    }

    #[cfg(test)]
    pub fn with_weights(mut self, weights: Array2<f32>) -> Self {
        assert_eq!(weights.dim(), self.weights.dim());
        self.weights = weights;
        self
    }

    #[cfg(test)]
    pub fn with_biases(mut self, biases: Array1<f32>) -> Self {
        assert_eq!(biases.dim(), self.biases.dim());
        self.biases = biases;
        self
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    fn pre_activation(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        if inputs.ncols() != self.input_size() {
            return Err(QcompError::shape(
                format!("{} input columns", self.input_size()),
                format!("{}", inputs.ncols()),
            ));
        }
        Ok(inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0)))
    }

    /// Forward pass without touching the backward cache
    pub fn predict_batch(&self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut outputs = self.pre_activation(inputs)?;
        self.activation.apply(&mut outputs);
        Ok(outputs)
    }

    /// Forward pass that remembers inputs and pre-activations for [`DenseLayer::backward_batch`]
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        let pre_activation = self.pre_activation(inputs)?;
        let mut outputs = pre_activation.clone();
        self.activation.apply(&mut outputs);
        self.inputs = Some(inputs.to_owned());
        self.pre_activation_output = Some(pre_activation);
        Ok(outputs)
    }

    /// Backpropagate `output_errors` (dLoss/dOutput) through the last cached forward pass.
    pub fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<DenseGradients> {
        let (pre_activation_output, inputs) = match (&self.pre_activation_output, &self.inputs) {
            (Some(pre), Some(inputs)) => (pre, inputs),
            _ => {
                return Err(QcompError::Training(
                    "forward_batch() must be called before backward_batch()".to_string(),
                ))
            }
        };
        if output_errors.dim() != pre_activation_output.dim() {
            return Err(QcompError::shape(
                format!("{:?}", pre_activation_output.dim()),
                format!("{:?}", output_errors.dim()),
            ));
        }

        let adjusted_error = &output_errors * &self.activation.derivative(pre_activation_output);
        let weights = inputs.t().dot(&adjusted_error);
        let biases = adjusted_error.sum_axis(Axis(0));
        let input = adjusted_error.dot(&self.weights.t());

        Ok(DenseGradients { input, weights, biases })
    }
}

impl LayerTrait for DenseLayer {
    fn parameters(&self) -> Vec<ArrayViewD<'_, f32>> {
        vec![self.weights.view().into_dyn(), self.biases.view().into_dyn()]
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        vec![self.weights.view_mut().into_dyn(), self.biases.view_mut().into_dyn()]
    }
}
