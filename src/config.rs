//! Construction-time configuration of a [`Learner`](crate::agent::Learner).
//!
//! Every identifier option is a typed enum, so an unknown update rule,
//! accumulator, action-selection or network identifier is rejected when it
//! is parsed or deserialised, never at call time.

use std::fs;
use std::path::Path;

use log::info;
use serde::{Serialize, Deserialize};

use crate::error::{QcompError, Result};
use crate::loss::BatchAccumulator;
use crate::network::NetworkType;
use crate::optimizer::UpdateRuleKind;
use crate::policy::ActionSelection;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LearnerConfig {
    pub input_width: usize,
    pub input_height: usize,
    /// Number of stacked frames per observation
    pub num_frames: usize,
    pub num_actions: usize,
    pub discount: f32,
    pub learning_rate: f32,
    /// RMSProp decay ρ
    pub rho: f32,
    /// RMSProp ε (inside the square root)
    pub rms_epsilon: f32,
    /// 0 disables momentum
    pub momentum: f32,
    /// Huber clip threshold δ; 0 falls back to plain squared error
    pub clip_delta: f32,
    /// Target snapshot refresh period in training steps; 0 disables the snapshot
    pub freeze_interval: usize,
    /// Fixed for the lifetime of the learner
    pub batch_size: usize,
    pub network_type: NetworkType,
    pub update_rule: UpdateRuleKind,
    pub batch_accumulator: BatchAccumulator,
    pub action_selection: ActionSelection,
    /// Divisor applied to raw observations (pixel range by default)
    pub input_scale: f32,
    /// Dropout rate on the compressor input during training
    pub compressor_dropout: f32,
    pub seed: u64,
    /// Number of recent steps kept by the training metrics
    pub metrics_window: usize,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        LearnerConfig {
            input_width: 84,
            input_height: 84,
            num_frames: 4,
            num_actions: 18,
            discount: 0.99,
            learning_rate: 0.00025,
            rho: 0.95,
            rms_epsilon: 0.01,
            momentum: 0.0,
            clip_delta: 1.0,
            freeze_interval: 10_000,
            batch_size: 32,
            network_type: NetworkType::Large,
            update_rule: UpdateRuleKind::DeepmindRmsprop,
            batch_accumulator: BatchAccumulator::Sum,
            action_selection: ActionSelection::EpsilonGreedy,
            input_scale: 255.0,
            compressor_dropout: 0.3,
            seed: 0,
            metrics_window: 1000,
        }
    }
}

fn check(ok: bool, name: &str, reason: String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(QcompError::configuration(name.to_string(), reason))
    }
}

impl LearnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check numeric ranges; identifiers are already valid by construction.
    pub fn validate(&self) -> Result<()> {
        check(self.input_width > 0 && self.input_height > 0, "input_size",
            format!("width and height must be positive, got {}x{}", self.input_width, self.input_height))?;
        check(self.num_frames > 0, "num_frames", "must be positive".to_string())?;
        check(self.num_actions > 0, "num_actions", "must be positive".to_string())?;
        check(self.batch_size > 0, "batch_size", "must be positive".to_string())?;
        check(self.discount > 0.0 && self.discount <= 1.0, "discount",
            format!("must be in (0, 1], got {}", self.discount))?;
        check(self.learning_rate.is_finite() && self.learning_rate > 0.0, "learning_rate",
            format!("must be positive, got {}", self.learning_rate))?;
        check((0.0..1.0).contains(&self.rho), "rho", format!("must be in [0, 1), got {}", self.rho))?;
        check(self.rms_epsilon.is_finite() && self.rms_epsilon > 0.0, "rms_epsilon",
            format!("must be positive, got {}", self.rms_epsilon))?;
        check((0.0..1.0).contains(&self.momentum), "momentum",
            format!("must be in [0, 1), got {}", self.momentum))?;
        check(self.clip_delta.is_finite() && self.clip_delta >= 0.0, "clip_delta",
            format!("must be non-negative, got {}", self.clip_delta))?;
        check(self.input_scale.is_finite() && self.input_scale > 0.0, "input_scale",
            format!("must be positive, got {}", self.input_scale))?;
        check((0.0..1.0).contains(&self.compressor_dropout), "compressor_dropout",
            format!("must be in [0, 1), got {}", self.compressor_dropout))?;
        Ok(())
    }

    /// Observation shape `(frames, height, width)`
    pub fn state_shape(&self) -> (usize, usize, usize) {
        (self.num_frames, self.input_height, self.input_width)
    }

    /// Training batch shape `(batch, frames, height, width)`
    pub fn batch_shape(&self) -> (usize, usize, usize, usize) {
        (self.batch_size, self.num_frames, self.input_height, self.input_width)
    }

    pub fn with_input_size(mut self, width: usize, height: usize) -> Self {
        self.input_width = width;
        self.input_height = height;
        self
    }

    pub fn with_num_frames(mut self, num_frames: usize) -> Self {
        self.num_frames = num_frames;
        self
    }

    pub fn with_num_actions(mut self, num_actions: usize) -> Self {
        self.num_actions = num_actions;
        self
    }

    pub fn with_discount(mut self, discount: f32) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_rmsprop(mut self, rho: f32, epsilon: f32) -> Self {
        self.rho = rho;
        self.rms_epsilon = epsilon;
        self
    }

    pub fn with_momentum(mut self, momentum: f32) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_clip_delta(mut self, clip_delta: f32) -> Self {
        self.clip_delta = clip_delta;
        self
    }

    pub fn with_freeze_interval(mut self, freeze_interval: usize) -> Self {
        self.freeze_interval = freeze_interval;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_network_type(mut self, network_type: NetworkType) -> Self {
        self.network_type = network_type;
        self
    }

    pub fn with_update_rule(mut self, update_rule: UpdateRuleKind) -> Self {
        self.update_rule = update_rule;
        self
    }

    pub fn with_batch_accumulator(mut self, batch_accumulator: BatchAccumulator) -> Self {
        self.batch_accumulator = batch_accumulator;
        self
    }

    pub fn with_action_selection(mut self, action_selection: ActionSelection) -> Self {
        self.action_selection = action_selection;
        self
    }

    pub fn with_input_scale(mut self, input_scale: f32) -> Self {
        self.input_scale = input_scale;
        self
    }

    pub fn with_compressor_dropout(mut self, rate: f32) -> Self {
        self.compressor_dropout = rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Parse and set the string identifiers in one go, failing on the first unknown one.
    pub fn with_identifiers(
        mut self,
        network_type: &str,
        update_rule: &str,
        batch_accumulator: &str,
        action_selection: &str,
    ) -> Result<Self> {
        self.network_type = network_type.parse()?;
        self.update_rule = update_rule.parse()?;
        self.batch_accumulator = batch_accumulator.parse()?;
        self.action_selection = action_selection.parse()?;
        Ok(self)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| QcompError::configuration("config".to_string(), e.to_string()))?;
        config.validate()?;
        info!("Load learner config from {:?}", path);
        Ok(config)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Save learner config into {:?}", path);
        Ok(())
    }
}
