// Test modules for all components
mod common;

pub mod test_loss;
pub mod test_policy;
pub mod test_replay_buffer;
