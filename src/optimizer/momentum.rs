use ndarray::ArrayD;

use super::{accumulator, UpdateRule};

/// Classical momentum on top of another rule's steps.
///
/// `v ← μ·v + Δ` where `Δ` is the inner rule's step, and the parameter moves by `v`.
#[derive(Clone, Debug)]
pub struct Momentum<R> {
    pub inner: R,
    pub momentum: f32,
    velocity: Vec<ArrayD<f32>>,
}

impl<R: UpdateRule> Momentum<R> {
    pub fn new(inner: R, momentum: f32) -> Self {
        Momentum {
            inner,
            momentum,
            velocity: Vec::new(),
        }
    }
}

impl<R: UpdateRule> UpdateRule for Momentum<R> {
    fn delta(&mut self, slot: usize, gradient: &ArrayD<f32>) -> ArrayD<f32> {
        let step = self.inner.delta(slot, gradient);
        let momentum = self.momentum;
        let v = accumulator(&mut self.velocity, slot, gradient);
        v.zip_mut_with(&step, |v, &d| *v = momentum * *v + d);
        v.clone()
    }
}
