use ndarray::{ArrayD, Zip};
use serde::{Serialize, Deserialize};

use super::{accumulator, UpdateRule};

/// RMSProp optimizer
///
/// `s ← ρ·s + (1 − ρ)·g²`, step `−lr · g / sqrt(s + ε)`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RmsProp {
    pub learning_rate: f32,
    pub rho: f32,
    pub epsilon: f32,
    #[serde(skip)]
    mean_square: Vec<ArrayD<f32>>,
}

impl RmsProp {
    pub fn new(learning_rate: f32, rho: f32, epsilon: f32) -> Self {
        RmsProp {
            learning_rate,
            rho,
            epsilon,
            mean_square: Vec::new(),
        }
    }
}

impl UpdateRule for RmsProp {
    fn delta(&mut self, slot: usize, gradient: &ArrayD<f32>) -> ArrayD<f32> {
        let (rho, lr, eps) = (self.rho, self.learning_rate, self.epsilon);
        let s = accumulator(&mut self.mean_square, slot, gradient);
        Zip::from(&mut *s).and(gradient).for_each(|s, &g| *s = rho * *s + (1.0 - rho) * g * g);
        Zip::from(gradient).and(&*s).map_collect(|&g, &s| -lr * g / (s + eps).sqrt())
    }
}

/// RMSProp variant from the DQN Nature paper.
///
/// Tracks the running mean of the gradient as well as of its square and
/// normalises by the running variance, with ε inside the square root:
/// `g ← ρ·g + (1 − ρ)·∇`, `s ← ρ·s + (1 − ρ)·∇²`, step `−lr · ∇ / sqrt(s − g² + ε)`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DeepMindRmsProp {
    pub learning_rate: f32,
    pub rho: f32,
    pub epsilon: f32,
    #[serde(skip)]
    mean_grad: Vec<ArrayD<f32>>,
    #[serde(skip)]
    mean_square: Vec<ArrayD<f32>>,
}

impl DeepMindRmsProp {
    pub fn new(learning_rate: f32, rho: f32, epsilon: f32) -> Self {
        DeepMindRmsProp {
            learning_rate,
            rho,
            epsilon,
            mean_grad: Vec::new(),
            mean_square: Vec::new(),
        }
    }
}

impl UpdateRule for DeepMindRmsProp {
    fn delta(&mut self, slot: usize, gradient: &ArrayD<f32>) -> ArrayD<f32> {
        let (rho, lr, eps) = (self.rho, self.learning_rate, self.epsilon);
        let g = accumulator(&mut self.mean_grad, slot, gradient);
        Zip::from(&mut *g).and(gradient).for_each(|g, &d| *g = rho * *g + (1.0 - rho) * d);
        let s = accumulator(&mut self.mean_square, slot, gradient);
        Zip::from(&mut *s).and(gradient).for_each(|s, &d| *s = rho * *s + (1.0 - rho) * d * d);

        let g = &self.mean_grad[slot];
        let s = &self.mean_square[slot];
        // s - g² is a variance estimate and never negative up to rounding
        Zip::from(gradient)
            .and(g)
            .and(s)
            .map_collect(|&d, &g, &s| -lr * d / ((s - g * g).max(0.0) + eps).sqrt())
    }
}
