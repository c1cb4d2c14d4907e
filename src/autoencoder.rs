//! Compressor branch: an autoencoder over the value network's trunk features.
//!
//! The branch reads the feature matrix as a constant. Its reconstruction
//! error (the compression loss) trains only the compressor's own layers and
//! never reaches the shared trunk.

use ndarray::{Array1, Array2, ArrayD, ArrayView2, ArrayViewD, ArrayViewMutD};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::error::{QcompError, Result};
use crate::layers::{DenseLayer, DropoutLayer, Layer};
use crate::loss::reconstruction_losses;
use crate::network::{assign_parameters, NetworkType};

#[derive(Serialize, Deserialize, Clone)]
pub struct Autoencoder {
    dropout: DropoutLayer,
    layers: Vec<DenseLayer>,
    feature_dim: usize,
    #[serde(skip)]
    cached: Option<(Array2<f32>, Array2<f32>)>,
}

impl Autoencoder {
    /// Build the compressor for `network_type`; the last layer always reconstructs `feature_dim` values.
    pub fn build<R: Rng + ?Sized>(network_type: NetworkType, feature_dim: usize, dropout_rate: f32, rng: &mut R) -> Result<Self> {
        let mut layers = Vec::new();
        let mut fan_in = feature_dim;
        for &(units, activation) in network_type.compressor_layers() {
            layers.push(DenseLayer::new(fan_in, units, activation, rng));
            fan_in = units;
        }
        layers.push(DenseLayer::new(fan_in, feature_dim, Activation::Linear, rng));

        Ok(Autoencoder {
            dropout: DropoutLayer::new(dropout_rate)?,
            layers,
            feature_dim,
            cached: None,
        })
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    fn check_features(&self, features: &ArrayView2<f32>) -> Result<()> {
        if features.ncols() != self.feature_dim {
            return Err(QcompError::shape(
                format!("{} feature columns", self.feature_dim),
                format!("{}", features.ncols()),
            ));
        }
        Ok(())
    }

    /// Per-example compression losses, deterministic (no dropout, no caching).
    pub fn reconstruct(&self, features: ArrayView2<f32>) -> Result<Array1<f32>> {
        self.check_features(&features)?;
        let mut current = features.to_owned();
        for layer in &self.layers {
            current = layer.predict_batch(current.view())?;
        }
        Ok(reconstruction_losses(features, current.view()))
    }

    /// Training pass with dropout on the compressor input; caches what [`Autoencoder::backward`] needs.
    pub fn forward_train<R: Rng + ?Sized>(&mut self, features: ArrayView2<f32>, rng: &mut R) -> Result<Array1<f32>> {
        self.check_features(&features)?;
        let mut current = self.dropout.forward_batch(features, rng);
        for layer in &mut self.layers {
            current = layer.forward_batch(current.view())?;
        }
        let losses = reconstruction_losses(features, current.view());
        self.cached = Some((features.to_owned(), current));
        Ok(losses)
    }

    /// Gradients of the batch-mean compression loss, in [`Autoencoder::parameters`] order.
    pub fn backward(&self) -> Result<Vec<ArrayD<f32>>> {
        let (original, reconstructed) = self.cached.as_ref().ok_or_else(|| {
            QcompError::Training("forward_train() must be called before backward()".to_string())
        })?;
        let count = original.len().max(1) as f32;
        let mut error = (reconstructed - original) / count;

        let mut grads = Vec::with_capacity(self.layers.len());
        for layer in self.layers.iter().rev() {
            let layer_grads = layer.backward_batch(error.view())?;
            grads.push([layer_grads.weights.into_dyn(), layer_grads.biases.into_dyn()]);
            error = layer_grads.input;
        }
        Ok(grads.into_iter().rev().flatten().collect())
    }

    pub fn parameters(&self) -> Vec<ArrayViewD<'_, f32>> {
        self.layers.iter().flat_map(|layer| layer.parameters()).collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        self.layers.iter_mut().flat_map(|layer| layer.parameters_mut()).collect()
    }

    pub fn parameter_values(&self) -> Vec<ArrayD<f32>> {
        self.layers.iter().flat_map(|layer| layer.parameter_values()).collect()
    }

    pub fn load_parameter_values(&mut self, values: &[ArrayD<f32>]) -> Result<()> {
        let src: Vec<_> = values.iter().map(|v| v.view()).collect();
        assign_parameters(self.parameters_mut(), &src)
    }
}
