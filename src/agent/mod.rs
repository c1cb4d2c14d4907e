//! # Learner
//!
//! [`Learner`] owns the value network, its target snapshot, the compressor
//! branch and both update rules. One call to [`Learner::train`] performs a
//! complete step: TD targets shaped by the batch compression loss, a clipped
//! loss on the value network, and a reconstruction update on the compressor.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use qcomp::agent::Learner;
//! use qcomp::config::LearnerConfig;
//! use qcomp::replay_buffer::ReplayBuffer;
//! use rand::SeedableRng;
//!
//! let config = LearnerConfig::new().with_num_actions(6);
//! let mut learner = Learner::new(config.clone()).unwrap();
//! let buffer = ReplayBuffer::new(100_000);
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! if buffer.len() >= config.batch_size {
//!     let batch = buffer.sample_batch(config.batch_size, &mut rng).unwrap();
//!     let report = learner.train_batch(&batch).unwrap();
//!     println!("loss {} compression {}", report.loss, report.compression_loss);
//! }
//! ```

mod checkpoint;
mod learner;

pub use checkpoint::ParameterCheckpoint;
pub use learner::{Learner, StepReport};
