use ndarray::array;

use super::common::assert_close;
use crate::error::QcompError;
use crate::loss::{clipped_loss, clipped_loss_derivative, reconstruction_losses, BatchAccumulator};

#[test]
fn test_clipped_loss_quadratic_region() {
    assert_close(clipped_loss(0.5, 1.0), 0.125, 1e-7);
    assert_close(clipped_loss(-0.5, 1.0), 0.125, 1e-7);
    assert_close(clipped_loss_derivative(0.5, 1.0), 0.5, 1e-7);
}

#[test]
fn test_clipped_loss_linear_region() {
    assert_close(clipped_loss(3.0, 1.0), 2.5, 1e-6);
    assert_close(clipped_loss(-3.0, 1.0), 2.5, 1e-6);
    assert_close(clipped_loss_derivative(3.0, 1.0), 1.0, 1e-7);
    assert_close(clipped_loss_derivative(-3.0, 1.0), -1.0, 1e-7);
}

#[test]
fn test_clipped_loss_is_continuous_at_delta() {
    let delta = 2.0;
    let below = clipped_loss(delta - 1e-3, delta);
    let above = clipped_loss(delta + 1e-3, delta);
    assert!((above - below).abs() < 5e-3);
    assert_close(clipped_loss(delta, delta), 0.5 * delta * delta, 1e-6);
}

#[test]
fn test_clipped_loss_slope_is_continuous_at_delta() {
    let delta = 1.0;
    let step = 1e-4;
    for sign in [1.0f32, -1.0] {
        let inside = sign * (delta - step);
        let outside = sign * (delta + step);
        let below = clipped_loss_derivative(inside, delta);
        let above = clipped_loss_derivative(outside, delta);
        assert!((above - below).abs() <= 2e-4, "derivative jumps from {} to {}", below, above);
        assert_close(above, sign * delta, 1e-6);

        // one-sided slopes of the loss itself, measured just inside and just outside the clip point
        let h = 1e-3;
        let slope_inside = (clipped_loss(inside, delta) - clipped_loss(inside - sign * h, delta)) / (sign * h);
        let slope_outside = (clipped_loss(outside + sign * h, delta) - clipped_loss(outside, delta)) / (sign * h);
        assert_close(slope_inside, sign * delta, 1e-2);
        assert_close(slope_outside, sign * delta, 1e-2);
    }
}

#[test]
fn test_zero_delta_is_plain_squared_error() {
    assert_close(clipped_loss(10.0, 0.0), 50.0, 1e-4);
    assert_close(clipped_loss_derivative(10.0, 0.0), 10.0, 1e-6);
}

#[test]
fn test_reconstruction_losses_per_example() {
    let original = array![[1.0f32, 2.0], [0.0, 0.0]];
    let reconstructed = array![[0.0f32, 0.0], [0.0, 0.0]];
    let losses = reconstruction_losses(original.view(), reconstructed.view());
    assert_close(losses[0], 1.25, 1e-6);
    assert_close(losses[1], 0.0, 1e-7);
}

#[test]
fn test_batch_accumulators() {
    let losses = array![1.0f32, 2.0, 3.0, 6.0];
    assert_close(BatchAccumulator::Sum.accumulate(losses.view()), 12.0, 1e-6);
    assert_close(BatchAccumulator::Mean.accumulate(losses.view()), 3.0, 1e-6);
    assert_close(BatchAccumulator::Sum.gradient_scale(4), 1.0, 1e-7);
    assert_close(BatchAccumulator::Mean.gradient_scale(4), 0.25, 1e-7);
}

#[test]
fn test_batch_accumulator_identifiers() {
    assert_eq!("sum".parse::<BatchAccumulator>().unwrap(), BatchAccumulator::Sum);
    assert_eq!("mean".parse::<BatchAccumulator>().unwrap(), BatchAccumulator::Mean);
    match "median".parse::<BatchAccumulator>() {
        Err(QcompError::Configuration { reason, .. }) => assert!(reason.contains("bad accumulator")),
        other => panic!("unexpected result {:?}", other),
    }
}
