use ndarray::{Array1, Array4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::LearnerConfig;
use crate::network::NetworkType;
use crate::optimizer::UpdateRuleKind;

/// A learner small enough to train in a unit test: 2 frames of 6x6, 3 actions, batch of 4
pub fn small_config() -> LearnerConfig {
    LearnerConfig::new()
        .with_input_size(6, 6)
        .with_num_frames(2)
        .with_num_actions(3)
        .with_batch_size(4)
        .with_network_type(NetworkType::Linear)
        .with_update_rule(UpdateRuleKind::Sgd)
        .with_learning_rate(0.01)
        .with_compressor_dropout(0.0)
        .with_freeze_interval(0)
        .with_seed(42)
}

/// Random pixel batch in `[0, 255)` with the configured shape
pub fn random_states(config: &LearnerConfig, seed: u64) -> Array4<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array4::from_shape_fn(config.batch_shape(), |_| rng.gen_range(0.0..255.0))
}

pub fn zero_rewards(config: &LearnerConfig) -> Array1<f32> {
    Array1::zeros(config.batch_size)
}

pub fn assert_close(a: f32, b: f32, tol: f32) {
    assert!((a - b).abs() <= tol, "expected {} to be within {} of {}", a, tol, b);
}
