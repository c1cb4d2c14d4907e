//! # Update Rules
//!
//! Gradient-update strategies applied to an ordered list of parameter tensors.
//! Each rule keeps its own per-parameter accumulators, indexed by the slot the
//! parameter occupies in the list, and produces an additive step for every
//! slot. [`Momentum`] wraps any rule and accumulates those steps.
//!
//! The configured combination is resolved once, at construction, into an
//! [`UpdateStrategy`].

pub mod momentum;
pub mod rmsprop;

use std::fmt;
use std::str::FromStr;

use ndarray::{ArrayD, ArrayViewMutD};
use serde::{Serialize, Deserialize};

use crate::error::{QcompError, Result};

pub use momentum::Momentum;
pub use rmsprop::{DeepMindRmsProp, RmsProp};

pub trait UpdateRule {
    /// Additive change for the parameter in `slot` given its gradient
    fn delta(&mut self, slot: usize, gradient: &ArrayD<f32>) -> ArrayD<f32>;

    /// Apply one update to every parameter.
    fn apply(&mut self, params: &mut [ArrayViewMutD<'_, f32>], gradients: &[ArrayD<f32>]) -> Result<()> {
        if params.len() != gradients.len() {
            return Err(QcompError::shape(
                format!("{} gradients", params.len()),
                format!("{}", gradients.len()),
            ));
        }
        for (slot, (param, gradient)) in params.iter_mut().zip(gradients).enumerate() {
            if param.shape() != gradient.shape() {
                return Err(QcompError::shape(
                    format!("gradient of shape {:?} for slot {}", param.shape(), slot),
                    format!("{:?}", gradient.shape()),
                ));
            }
            let step = self.delta(slot, gradient);
            *param += &step;
        }
        Ok(())
    }
}

/// Fetch the accumulator for `slot`, creating zeroed ones up to it on first use.
pub(crate) fn accumulator<'a>(state: &'a mut Vec<ArrayD<f32>>, slot: usize, like: &ArrayD<f32>) -> &'a mut ArrayD<f32> {
    while state.len() <= slot {
        state.push(ArrayD::zeros(like.raw_dim()));
    }
    if state[slot].shape() != like.shape() {
        state[slot] = ArrayD::zeros(like.raw_dim());
    }
    &mut state[slot]
}

/// Plain gradient descent
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Sgd {
    pub learning_rate: f32,
}

impl Sgd {
    pub fn new(learning_rate: f32) -> Self {
        Sgd { learning_rate }
    }
}

impl UpdateRule for Sgd {
    fn delta(&mut self, _slot: usize, gradient: &ArrayD<f32>) -> ArrayD<f32> {
        gradient * -self.learning_rate
    }
}

/// Update rule identifiers accepted in configuration
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRuleKind {
    DeepmindRmsprop,
    Rmsprop,
    Sgd,
}

impl FromStr for UpdateRuleKind {
    type Err = QcompError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deepmind_rmsprop" | "deepmind-rmsprop" => Ok(UpdateRuleKind::DeepmindRmsprop),
            "rmsprop" => Ok(UpdateRuleKind::Rmsprop),
            "sgd" => Ok(UpdateRuleKind::Sgd),
            other => Err(QcompError::configuration(
                "update_rule".to_string(),
                format!("unrecognized update rule '{}'", other),
            )),
        }
    }
}

impl fmt::Display for UpdateRuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateRuleKind::DeepmindRmsprop => write!(f, "deepmind_rmsprop"),
            UpdateRuleKind::Rmsprop => write!(f, "rmsprop"),
            UpdateRuleKind::Sgd => write!(f, "sgd"),
        }
    }
}

/// The rule that governs value parameters, optionally wrapped in momentum
#[derive(Clone, Debug)]
pub enum UpdateStrategy {
    DeepMindRmsProp(DeepMindRmsProp),
    RmsProp(RmsProp),
    Sgd(Sgd),
    Momentum(Box<Momentum<UpdateStrategy>>),
}

impl UpdateStrategy {
    /// Resolve a rule identifier and hyperparameters; `momentum > 0` wraps the rule.
    pub fn new(kind: UpdateRuleKind, learning_rate: f32, rho: f32, epsilon: f32, momentum: f32) -> Self {
        let base = match kind {
            UpdateRuleKind::DeepmindRmsprop => {
                UpdateStrategy::DeepMindRmsProp(DeepMindRmsProp::new(learning_rate, rho, epsilon))
            }
            UpdateRuleKind::Rmsprop => UpdateStrategy::RmsProp(RmsProp::new(learning_rate, rho, epsilon)),
            UpdateRuleKind::Sgd => UpdateStrategy::Sgd(Sgd::new(learning_rate)),
        };
        if momentum > 0.0 {
            UpdateStrategy::Momentum(Box::new(Momentum::new(base, momentum)))
        } else {
            base
        }
    }
}

impl UpdateRule for UpdateStrategy {
    fn delta(&mut self, slot: usize, gradient: &ArrayD<f32>) -> ArrayD<f32> {
        match self {
            UpdateStrategy::DeepMindRmsProp(rule) => rule.delta(slot, gradient),
            UpdateStrategy::RmsProp(rule) => rule.delta(slot, gradient),
            UpdateStrategy::Sgd(rule) => rule.delta(slot, gradient),
            UpdateStrategy::Momentum(rule) => rule.delta(slot, gradient),
        }
    }
}
