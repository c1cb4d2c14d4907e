//! The value approximator: a convolutional trunk that turns stacked frames
//! into a feature matrix, followed by a dense head producing one value per
//! action.
//!
//! The trunk output is materialised as an explicit `[batch, feature_dim]`
//! tensor ([`Evaluation::features`]) so the compressor branch can read it as
//! a plain value without being part of the value network's backward pass.

use std::fmt;
use std::str::FromStr;

use log::{info, trace};
use ndarray::{Array2, Array4, ArrayD, ArrayView2, ArrayView4, ArrayViewD, ArrayViewMutD};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::config::LearnerConfig;
use crate::error::{QcompError, Result};
use crate::layers::{Conv2DLayer, DenseLayer, Layer};

/// Identifier of the layer topology to build
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    /// Three-convolution network from the DQN Nature paper
    Large,
    /// Two-convolution network from the 2013 DQN workshop paper
    Nips,
    /// No convolutions: features are the flattened, scaled input
    Linear,
}

/// `(filters, kernel, stride)` of one square convolution
type ConvSpec = (usize, usize, usize);

const LARGE_CONVS: [ConvSpec; 3] = [(32, 8, 4), (64, 4, 2), (64, 3, 1)];
const NIPS_CONVS: [ConvSpec; 2] = [(16, 8, 4), (32, 4, 2)];

const LARGE_COMPRESSOR: [(usize, Activation); 5] = [
    (512, Activation::Relu),
    (512, Activation::Relu),
    (256, Activation::Linear),
    (512, Activation::Relu),
    (512, Activation::Relu),
];
const NIPS_COMPRESSOR: [(usize, Activation); 3] = [
    (256, Activation::Relu),
    (128, Activation::Linear),
    (256, Activation::Relu),
];
const LINEAR_COMPRESSOR: [(usize, Activation); 1] = [(64, Activation::Relu)];

impl NetworkType {
    pub fn conv_stack(&self) -> &'static [ConvSpec] {
        match self {
            NetworkType::Large => &LARGE_CONVS,
            NetworkType::Nips => &NIPS_CONVS,
            NetworkType::Linear => &[],
        }
    }

    /// Hidden units of the value head, before the linear output layer
    pub fn head_units(&self) -> &'static [usize] {
        match self {
            NetworkType::Large => &[512],
            NetworkType::Nips => &[256],
            NetworkType::Linear => &[],
        }
    }

    /// Hidden layers of the compressor, before its linear reconstruction layer
    pub fn compressor_layers(&self) -> &'static [(usize, Activation)] {
        match self {
            NetworkType::Large => &LARGE_COMPRESSOR,
            NetworkType::Nips => &NIPS_COMPRESSOR,
            NetworkType::Linear => &LINEAR_COMPRESSOR,
        }
    }
}

impl FromStr for NetworkType {
    type Err = QcompError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "large" | "large_network" => Ok(NetworkType::Large),
            "nips" | "nips_network" => Ok(NetworkType::Nips),
            "linear" => Ok(NetworkType::Linear),
            other => Err(QcompError::configuration(
                "network_type".to_string(),
                format!("unrecognized network '{}'", other),
            )),
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkType::Large => write!(f, "large"),
            NetworkType::Nips => write!(f, "nips"),
            NetworkType::Linear => write!(f, "linear"),
        }
    }
}

/// Output of a caching forward pass
pub struct Evaluation {
    pub features: Array2<f32>,
    pub q_values: Array2<f32>,
}

/// Overwrite `dst` tensor by tensor with deep copies of `src`.
pub(crate) fn assign_parameters(dst: Vec<ArrayViewMutD<'_, f32>>, src: &[ArrayViewD<'_, f32>]) -> Result<()> {
    if dst.len() != src.len() {
        return Err(QcompError::shape(
            format!("{} parameter tensors", dst.len()),
            format!("{}", src.len()),
        ));
    }
    for (mut d, s) in dst.into_iter().zip(src) {
        if d.shape() != s.shape() {
            return Err(QcompError::shape(format!("{:?}", d.shape()), format!("{:?}", s.shape())));
        }
        d.assign(s);
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Clone)]
pub struct ValueNetwork {
    pub network_type: NetworkType,
    convs: Vec<Conv2DLayer>,
    head: Vec<DenseLayer>,
    /// `(batch, frames, height, width)` every call must match
    batch_shape: (usize, usize, usize, usize),
    /// `(channels, height, width)` of the trunk output
    trunk_shape: (usize, usize, usize),
    input_scale: f32,
    num_actions: usize,
}

impl ValueNetwork {
    pub fn build<R: Rng + ?Sized>(config: &LearnerConfig, rng: &mut R) -> Result<Self> {
        let network_type = config.network_type;
        let (mut channels, mut height, mut width) = config.state_shape();

        let mut convs = Vec::with_capacity(network_type.conv_stack().len());
        for &(filters, kernel, stride) in network_type.conv_stack() {
            let conv = Conv2DLayer::new(channels, filters, (kernel, kernel), (stride, stride), Activation::Relu, rng);
            let (h, w) = conv.output_size(height, width).ok_or_else(|| {
                QcompError::configuration(
                    "input_size".to_string(),
                    format!(
                        "{}x{} input is too small for the {} network ({}x{} kernel)",
                        config.input_width, config.input_height, network_type, kernel, kernel
                    ),
                )
            })?;
            convs.push(conv);
            channels = filters;
            height = h;
            width = w;
        }

        let feature_dim = channels * height * width;
        let mut head = Vec::new();
        let mut fan_in = feature_dim;
        for &units in network_type.head_units() {
            head.push(DenseLayer::new(fan_in, units, Activation::Relu, rng));
            fan_in = units;
        }
        head.push(DenseLayer::new(fan_in, config.num_actions, Activation::Linear, rng));

        let network = ValueNetwork {
            network_type,
            convs,
            head,
            batch_shape: config.batch_shape(),
            trunk_shape: (channels, height, width),
            input_scale: config.input_scale,
            num_actions: config.num_actions,
        };
        info!(
            "Built {} value network: {} features, {} actions, {} parameters",
            network_type,
            feature_dim,
            config.num_actions,
            network.num_parameters()
        );
        Ok(network)
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    pub fn feature_dim(&self) -> usize {
        self.trunk_shape.0 * self.trunk_shape.1 * self.trunk_shape.2
    }

    pub fn batch_shape(&self) -> (usize, usize, usize, usize) {
        self.batch_shape
    }

    /// Reject anything that is not exactly `(batch, frames, height, width)`.
    pub fn check_batch(&self, states: &ArrayView4<f32>) -> Result<()> {
        if states.dim() != self.batch_shape {
            return Err(QcompError::shape(
                format!("{:?}", self.batch_shape),
                format!("{:?}", states.dim()),
            ));
        }
        Ok(())
    }

    fn scale(&self, states: ArrayView4<f32>) -> Array4<f32> {
        let scale = self.input_scale;
        states.mapv(|v| v / scale)
    }

    fn flatten(&self, maps: Array4<f32>) -> Result<Array2<f32>> {
        let batch = maps.shape()[0];
        let flat = maps.as_standard_layout().into_owned();
        Ok(flat.into_shape((batch, self.feature_dim()))?)
    }

    /// Trunk output for a batch, without caching anything
    pub fn features(&self, states: ArrayView4<f32>) -> Result<Array2<f32>> {
        self.check_batch(&states)?;
        let mut maps = self.scale(states);
        for conv in &self.convs {
            maps = conv.predict_batch(maps.view())?;
        }
        self.flatten(maps)
    }

    /// Action values from an already computed feature matrix
    pub fn q_values_from_features(&self, features: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut current = features.to_owned();
        for layer in &self.head {
            current = layer.predict_batch(current.view())?;
        }
        Ok(current)
    }

    /// Per-action values for a batch of states; a pure function of the parameters.
    pub fn evaluate(&self, states: ArrayView4<f32>) -> Result<Array2<f32>> {
        let features = self.features(states)?;
        self.q_values_from_features(features.view())
    }

    /// Forward pass that caches activations for [`ValueNetwork::backward`].
    pub fn forward_train(&mut self, states: ArrayView4<f32>) -> Result<Evaluation> {
        self.check_batch(&states)?;
        let mut maps = self.scale(states);
        for conv in &mut self.convs {
            maps = conv.forward_batch(maps.view())?;
        }
        let features = self.flatten(maps)?;

        let mut current = features.clone();
        for layer in &mut self.head {
            current = layer.forward_batch(current.view())?;
        }
        Ok(Evaluation { features, q_values: current })
    }

    /// Gradients of the loss for every parameter, given dLoss/dQ for the last cached pass.
    ///
    /// The returned list follows [`ValueNetwork::parameters`] order.
    pub fn backward(&self, q_gradient: ArrayView2<f32>) -> Result<Vec<ArrayD<f32>>> {
        let mut head_grads = Vec::with_capacity(self.head.len());
        let mut error = q_gradient.to_owned();
        for layer in self.head.iter().rev() {
            let grads = layer.backward_batch(error.view())?;
            head_grads.push([grads.weights.into_dyn(), grads.biases.into_dyn()]);
            error = grads.input;
        }

        let mut conv_grads = Vec::with_capacity(self.convs.len());
        if !self.convs.is_empty() {
            let (c, h, w) = self.trunk_shape;
            let mut map_error = error.into_shape((self.batch_shape.0, c, h, w))?;
            for (index, conv) in self.convs.iter().enumerate().rev() {
                let grads = conv.backward_batch(map_error.view(), index > 0)?;
                trace!("conv layer {} kernel gradient norm {}", index, grads.kernels.iter().map(|g| g * g).sum::<f32>().sqrt());
                conv_grads.push([grads.kernels.into_dyn(), grads.biases.into_dyn()]);
                if let Some(input) = grads.input {
                    map_error = input;
                }
            }
        }

        Ok(conv_grads
            .into_iter()
            .rev()
            .chain(head_grads.into_iter().rev())
            .flatten()
            .collect())
    }

    /// Views of every trainable tensor: convolutions first, then the head
    pub fn parameters(&self) -> Vec<ArrayViewD<'_, f32>> {
        self.convs
            .iter()
            .flat_map(|layer| layer.parameters())
            .chain(self.head.iter().flat_map(|layer| layer.parameters()))
            .collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        self.convs
            .iter_mut()
            .flat_map(|layer| layer.parameters_mut())
            .chain(self.head.iter_mut().flat_map(|layer| layer.parameters_mut()))
            .collect()
    }

    pub fn parameter_values(&self) -> Vec<ArrayD<f32>> {
        self.convs
            .iter()
            .flat_map(|layer| layer.parameter_values())
            .chain(self.head.iter().flat_map(|layer| layer.parameter_values()))
            .collect()
    }

    pub fn num_parameters(&self) -> usize {
        self.convs.iter().map(|layer| layer.num_parameters()).sum::<usize>()
            + self.head.iter().map(|layer| layer.num_parameters()).sum::<usize>()
    }

    /// Deep-copy every parameter of `source` into this network.
    pub fn copy_parameters_from(&mut self, source: &ValueNetwork) -> Result<()> {
        let src = source.parameters();
        assign_parameters(self.parameters_mut(), &src)
    }

    /// Overwrite the parameters from owned tensors, e.g. a checkpoint.
    pub fn load_parameter_values(&mut self, values: &[ArrayD<f32>]) -> Result<()> {
        let src: Vec<_> = values.iter().map(|v| v.view()).collect();
        assign_parameters(self.parameters_mut(), &src)
    }
}
