//! Convolutional layers for stacked-frame observations
//!
//! Convolutions are lowered to a matrix product over extracted patches
//! (im2col), so the heavy lifting goes through `ndarray`'s matrix multiply.
//! Patch extraction and the scatter back to input space run per example in
//! parallel.

use ndarray::{s, Array1, Array2, Array4, ArrayView4, ArrayViewD, ArrayViewMutD, Axis, Zip};
use rand::Rng;
use serde::{Serialize, Deserialize};
use crate::activations::Activation;
use crate::error::{QcompError, Result};
use super::initialization::{WeightInit, BIAS_INIT};
use super::traits::Layer as LayerTrait;

/// Gradients produced by a convolution's backward pass
pub struct ConvGradients {
    /// Error propagated to the layer input, absent when not requested
    pub input: Option<Array4<f32>>,
    pub kernels: Array4<f32>,
    pub biases: Array1<f32>,
}

#[derive(Clone)]
struct ConvCache {
    input_dim: (usize, usize, usize, usize),
    columns: Array2<f32>,
    pre_activation: Array4<f32>,
}

/// 2D Convolutional Layer (valid padding)
///
/// Input and output tensors are laid out `[batch, channels, height, width]`.
#[derive(Serialize, Deserialize, Clone)]
pub struct Conv2DLayer {
    /// Convolution kernels/filters [out_channels, in_channels, kernel_height, kernel_width]
    pub kernels: Array4<f32>,

    /// Bias terms for each output channel
    pub biases: Array1<f32>,

    pub activation: Activation,

    pub stride: (usize, usize),

    pub in_channels: usize,

    pub out_channels: usize,

    pub kernel_size: (usize, usize),

    #[serde(skip)]
    cache: Option<ConvCache>,
}

impl Conv2DLayer {
    pub fn new<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        kernel_size: (usize, usize),
        stride: (usize, usize),
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let fan_in = in_channels * kernel_size.0 * kernel_size.1;
        let fan_out = out_channels * kernel_size.0 * kernel_size.1;
        let kernels = WeightInit::for_activation(&activation).initialize(
            (out_channels, in_channels, kernel_size.0, kernel_size.1),
            fan_in,
            fan_out,
            rng,
        );

        Conv2DLayer {
            kernels,
            biases: Array1::from_elem(out_channels, BIAS_INIT),
            activation,
            stride,
            in_channels,
            out_channels,
            kernel_size,
            cache: None,
        }
    }

    /// Spatial output size for an input of `(height, width)`, `None` when the kernel does not fit
    pub fn output_size(&self, height: usize, width: usize) -> Option<(usize, usize)> {
        if height < self.kernel_size.0 || width < self.kernel_size.1 {
            return None;
        }
        Some((
            (height - self.kernel_size.0) / self.stride.0 + 1,
            (width - self.kernel_size.1) / self.stride.1 + 1,
        ))
    }

    fn patch_len(&self) -> usize {
        self.in_channels * self.kernel_size.0 * self.kernel_size.1
    }

    /// Lay every receptive field out as one row: `[batch * out_h * out_w, in_channels * kh * kw]`
    fn im2col(&self, input: ArrayView4<f32>, out_h: usize, out_w: usize) -> Result<Array2<f32>> {
        let batch_size = input.shape()[0];
        let (kh, kw) = self.kernel_size;
        let (sh, sw) = self.stride;
        let mut columns = ndarray::Array3::<f32>::zeros((batch_size, out_h * out_w, self.patch_len()));

        Zip::from(columns.outer_iter_mut())
            .and(input.outer_iter())
            .par_for_each(|mut rows, image| {
                for oh in 0..out_h {
                    for ow in 0..out_w {
                        let patch = image.slice(s![.., oh * sh..oh * sh + kh, ow * sw..ow * sw + kw]);
                        rows.row_mut(oh * out_w + ow)
                            .iter_mut()
                            .zip(patch.iter())
                            .for_each(|(dst, &src)| *dst = src);
                    }
                }
            });

        Ok(columns.into_shape((batch_size * out_h * out_w, self.patch_len()))?)
    }

    fn convolve(&self, input: ArrayView4<f32>) -> Result<(Array2<f32>, Array4<f32>)> {
        let (batch_size, channels, height, width) = input.dim();
        if channels != self.in_channels {
            return Err(QcompError::shape(
                format!("{} input channels", self.in_channels),
                format!("{}", channels),
            ));
        }
        let (out_h, out_w) = self.output_size(height, width).ok_or_else(|| {
            QcompError::shape(
                format!("spatial size of at least {:?}", self.kernel_size),
                format!("{:?}", (height, width)),
            )
        })?;

        let columns = self.im2col(input, out_h, out_w)?;
        let kernels = self.kernels.view().into_shape((self.out_channels, self.patch_len()))?;
        let output = columns.dot(&kernels.t()) + &self.biases.view().insert_axis(Axis(0));
        let output = output
            .into_shape((batch_size, out_h, out_w, self.out_channels))?
            .permuted_axes([0, 3, 1, 2])
            .as_standard_layout()
            .into_owned();

        Ok((columns, output))
    }

    /// Forward pass without touching the backward cache
    pub fn predict_batch(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (_, mut output) = self.convolve(input)?;
        self.activation.apply(&mut output);
        Ok(output)
    }

    /// Forward pass that keeps the patch matrix and pre-activations for backward
    pub fn forward_batch(&mut self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (columns, pre_activation) = self.convolve(input)?;
        let mut output = pre_activation.clone();
        self.activation.apply(&mut output);
        self.cache = Some(ConvCache {
            input_dim: input.dim(),
            columns,
            pre_activation,
        });
        Ok(output)
    }

    /// Backward pass.
    ///
    /// `want_input_grad` is false for the first layer of a trunk, whose input
    /// is the observation itself.
    pub fn backward_batch(&self, output_gradient: ArrayView4<f32>, want_input_grad: bool) -> Result<ConvGradients> {
        let cache = self.cache.as_ref().ok_or_else(|| {
            QcompError::Training("forward_batch() must be called before backward_batch()".to_string())
        })?;
        if output_gradient.dim() != cache.pre_activation.dim() {
            return Err(QcompError::shape(
                format!("{:?}", cache.pre_activation.dim()),
                format!("{:?}", output_gradient.dim()),
            ));
        }

        let (batch_size, _, out_h, out_w) = cache.pre_activation.dim();
        let grad = &output_gradient * &self.activation.derivative(&cache.pre_activation);
        let grad = grad
            .permuted_axes([0, 2, 3, 1])
            .as_standard_layout()
            .into_owned()
            .into_shape((batch_size * out_h * out_w, self.out_channels))?;

        let kernels = grad
            .t()
            .dot(&cache.columns)
            .into_shape(self.kernels.raw_dim())?;
        let biases = grad.sum_axis(Axis(0));

        let input = if want_input_grad {
            let flat_kernels = self.kernels.view().into_shape((self.out_channels, self.patch_len()))?;
            let column_grads = grad.dot(&flat_kernels);
            Some(self.col2im(column_grads, cache.input_dim, out_h, out_w)?)
        } else {
            None
        };

        Ok(ConvGradients { input, kernels, biases })
    }

    /// Scatter-add patch gradients back to input positions
    fn col2im(
        &self,
        column_grads: Array2<f32>,
        input_dim: (usize, usize, usize, usize),
        out_h: usize,
        out_w: usize,
    ) -> Result<Array4<f32>> {
        let (batch_size, channels, _, _) = input_dim;
        let (kh, kw) = self.kernel_size;
        let (sh, sw) = self.stride;
        let patches = column_grads.into_shape((batch_size, out_h * out_w, channels, kh, kw))?;
        let mut input_grad = Array4::<f32>::zeros(input_dim);

        Zip::from(input_grad.outer_iter_mut())
            .and(patches.outer_iter())
            .par_for_each(|mut image, example| {
                for oh in 0..out_h {
                    for ow in 0..out_w {
                        let mut window = image.slice_mut(s![.., oh * sh..oh * sh + kh, ow * sw..ow * sw + kw]);
                        window += &example.index_axis(Axis(0), oh * out_w + ow);
                    }
                }
            });

        Ok(input_grad)
    }
}

impl LayerTrait for Conv2DLayer {
    fn parameters(&self) -> Vec<ArrayViewD<'_, f32>> {
        vec![self.kernels.view().into_dyn(), self.biases.view().into_dyn()]
    }

    fn parameters_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        vec![self.kernels.view_mut().into_dyn(), self.biases.view_mut().into_dyn()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn layer(stride: (usize, usize), activation: Activation) -> Conv2DLayer {
        Conv2DLayer::new(2, 3, (3, 3), stride, activation, &mut StdRng::seed_from_u64(11))
    }

    fn input(batch: usize) -> Array4<f32> {
        Array4::from_shape_fn((batch, 2, 7, 7), |(b, c, h, w)| {
            ((b * 31 + c * 7 + h * 3 + w) % 11) as f32 / 11.0 - 0.4
        })
    }

    /// Straightforward nested-loop convolution to check the im2col lowering against
    fn reference(layer: &Conv2DLayer, x: &Array4<f32>) -> Array4<f32> {
        let (b, _, h, w) = x.dim();
        let (oh, ow) = layer.output_size(h, w).unwrap();
        let mut out = Array4::zeros((b, layer.out_channels, oh, ow));
        for n in 0..b {
            for oc in 0..layer.out_channels {
                for i in 0..oh {
                    for j in 0..ow {
                        let mut sum = layer.biases[oc];
                        for ic in 0..layer.in_channels {
                            for ki in 0..layer.kernel_size.0 {
                                for kj in 0..layer.kernel_size.1 {
                                    sum += x[[n, ic, i * layer.stride.0 + ki, j * layer.stride.1 + kj]]
                                        * layer.kernels[[oc, ic, ki, kj]];
                                }
                            }
                        }
                        out[[n, oc, i, j]] = sum;
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_conv2d_matches_reference() {
        for stride in [(1, 1), (2, 2)] {
            let conv = layer(stride, Activation::Linear);
            let x = input(2);
            let fast = conv.predict_batch(x.view()).unwrap();
            let slow = reference(&conv, &x);
            assert_eq!(fast.dim(), slow.dim());
            for (a, b) in fast.iter().zip(slow.iter()) {
                assert!((a - b).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_conv2d_output_shape() {
        let conv = layer((2, 2), Activation::Relu);
        assert_eq!(conv.output_size(7, 7), Some((3, 3)));
        assert_eq!(conv.output_size(2, 7), None);
        let out = conv.predict_batch(input(1).view()).unwrap();
        assert_eq!(out.dim(), (1, 3, 3, 3));
    }

    #[test]
    fn test_conv2d_gradients_match_finite_differences() {
        let mut conv = layer((2, 2), Activation::Linear);
        let x = input(1);
        // loss = sum(output), so dLoss/dOutput is all ones
        let out = conv.forward_batch(x.view()).unwrap();
        let grads = conv.backward_batch(Array4::ones(out.raw_dim()).view(), true).unwrap();

        let eps = 1e-2;
        let base = conv.predict_batch(x.view()).unwrap().sum();

        let mut bumped = conv.clone();
        bumped.kernels[[1, 0, 2, 1]] += eps;
        let numeric = (bumped.predict_batch(x.view()).unwrap().sum() - base) / eps;
        assert!((numeric - grads.kernels[[1, 0, 2, 1]]).abs() < 1e-2);

        let mut bumped_x = x.clone();
        bumped_x[[0, 1, 2, 2]] += eps;
        let numeric = (conv.predict_batch(bumped_x.view()).unwrap().sum() - base) / eps;
        let analytic = grads.input.unwrap()[[0, 1, 2, 2]];
        assert!((numeric - analytic).abs() < 1e-2);

        assert!((grads.biases[0] - 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_rejects_wrong_channels() {
        let conv = layer((1, 1), Activation::Relu);
        let x = Array4::<f32>::zeros((1, 3, 7, 7));
        assert!(conv.predict_batch(x.view()).is_err());
    }
}
