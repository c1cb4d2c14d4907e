use log::{debug, info};
use ndarray::{Array1, Array2, Array4, ArrayD, ArrayView1, ArrayView3, ArrayView4, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::autoencoder::Autoencoder;
use crate::config::LearnerConfig;
use crate::error::{QcompError, Result};
use crate::loss::{clipped_loss, clipped_loss_derivative};
use crate::metrics::MetricsTracker;
use crate::network::{Evaluation, ValueNetwork};
use crate::optimizer::{RmsProp, UpdateRule, UpdateStrategy};
use crate::policy::exploration_bias;
use crate::replay_buffer::TransitionBatch;
use crate::snapshot::TargetSnapshot;

/// What one training step observed, computed before the parameter update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Square root of the accumulated loss
    pub loss: f32,
    /// Sum or mean of the per-example losses, per the configured accumulator
    pub accumulated_loss: f32,
    /// Batch-mean compression loss added to every TD target
    pub compression_loss: f32,
    /// Mean predicted value of the actions taken
    pub mean_q: f32,
}

/// Deep Q-learner with a compressor branch whose reconstruction error
/// shapes both the TD targets and exploration.
///
/// # Example
///
/// ```rust
/// use qcomp::agent::Learner;
/// use qcomp::config::LearnerConfig;
/// use qcomp::network::NetworkType;
/// use ndarray::{Array1, Array3, Array4};
///
/// let config = LearnerConfig::new()
///     .with_input_size(6, 6)
///     .with_num_frames(2)
///     .with_num_actions(3)
///     .with_batch_size(4)
///     .with_network_type(NetworkType::Linear)
///     .with_freeze_interval(10);
/// let mut learner = Learner::new(config).unwrap();
///
/// let action = learner.choose_action(Array3::zeros((2, 6, 6)).view(), 0.1).unwrap();
/// assert!(action < 3);
///
/// let states = Array4::from_elem((4, 2, 6, 6), 128.0);
/// let loss = learner
///     .train(states.view(), &[0, 1, 2, 0], Array1::zeros(4).view(), states.view(), &[false; 4])
///     .unwrap();
/// assert!(loss >= 0.0);
/// ```
pub struct Learner {
    config: LearnerConfig,
    value: ValueNetwork,
    autoencoder: Autoencoder,
    target: Option<TargetSnapshot>,
    value_rule: UpdateStrategy,
    compressor_rule: RmsProp,
    rng: StdRng,
    update_counter: usize,
    /// Largest compression loss seen by this learner; only ever grows
    max_compression_loss: f32,
    metrics: MetricsTracker,
}

impl Learner {
    pub fn new(config: LearnerConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let value = ValueNetwork::build(&config, &mut rng)?;
        let autoencoder = Autoencoder::build(
            config.network_type,
            value.feature_dim(),
            config.compressor_dropout,
            &mut rng,
        )?;
        let target = if config.freeze_interval > 0 {
            Some(TargetSnapshot::new(&value))
        } else {
            None
        };
        let value_rule = UpdateStrategy::new(
            config.update_rule,
            config.learning_rate,
            config.rho,
            config.rms_epsilon,
            config.momentum,
        );
        let compressor_rule = RmsProp::new(config.learning_rate, config.rho, config.rms_epsilon);

        info!(
            "Learner ready: {} network, {} update rule, {} accumulator, {} action selection, freeze interval {}",
            config.network_type,
            config.update_rule,
            config.batch_accumulator,
            config.action_selection,
            config.freeze_interval
        );

        Ok(Learner {
            metrics: MetricsTracker::new(config.metrics_window),
            config,
            value,
            autoencoder,
            target,
            value_rule,
            compressor_rule,
            rng,
            update_counter: 0,
            max_compression_loss: 0.0,
        })
    }

    /// Train on one batch and return the RMS of the accumulated loss.
    pub fn train(
        &mut self,
        states: ArrayView4<f32>,
        actions: &[usize],
        rewards: ArrayView1<f32>,
        next_states: ArrayView4<f32>,
        terminals: &[bool],
    ) -> Result<f32> {
        Ok(self.train_step(states, actions, rewards, next_states, terminals)?.loss)
    }

    pub fn train_batch(&mut self, batch: &TransitionBatch) -> Result<StepReport> {
        self.train_step(
            batch.states.view(),
            &batch.actions,
            batch.rewards.view(),
            batch.next_states.view(),
            &batch.terminals,
        )
    }

    fn check_transitions(
        &self,
        states: &ArrayView4<f32>,
        actions: &[usize],
        rewards: &ArrayView1<f32>,
        next_states: &ArrayView4<f32>,
        terminals: &[bool],
    ) -> Result<()> {
        self.value.check_batch(states)?;
        self.value.check_batch(next_states)?;
        let batch_size = self.config.batch_size;
        for (name, len) in [
            ("actions", actions.len()),
            ("rewards", rewards.len()),
            ("terminals", terminals.len()),
        ] {
            if len != batch_size {
                return Err(QcompError::shape(format!("{} {}", batch_size, name), format!("{}", len)));
            }
        }
        let num_actions = self.config.num_actions;
        if let Some(&action) = actions.iter().find(|&&a| a >= num_actions) {
            return Err(QcompError::InvalidAction { action, num_actions });
        }
        Ok(())
    }

    /// One full training step.
    ///
    /// The TD target of example `i` is
    /// `reward[i] + compression_loss + (1 − terminal[i]) · discount · max_a next_q[i, a]`,
    /// where `compression_loss` is the batch mean shared by every example and
    /// `next_q` comes from the target snapshot, or from the live network as a
    /// constant when no snapshot is kept. The snapshot refresh decision uses the
    /// update counter before this step's increment.
    pub fn train_step(
        &mut self,
        states: ArrayView4<f32>,
        actions: &[usize],
        rewards: ArrayView1<f32>,
        next_states: ArrayView4<f32>,
        terminals: &[bool],
    ) -> Result<StepReport> {
        self.check_transitions(&states, actions, &rewards, &next_states, terminals)?;

        let freeze_interval = self.config.freeze_interval;
        if freeze_interval > 0 && self.update_counter % freeze_interval == 0 {
            self.reset_target_snapshot()?;
        }

        let next_q = match &self.target {
            Some(target) => target.evaluate(next_states)?,
            None => self.value.evaluate(next_states)?,
        };
        let Evaluation { features, q_values } = self.value.forward_train(states)?;
        let compression_loss = self
            .autoencoder
            .forward_train(features.view(), &mut self.rng)?
            .mean()
            .unwrap_or(0.0);

        let batch_size = self.config.batch_size;
        let delta = self.config.clip_delta;
        let accumulator = self.config.batch_accumulator;
        let gradient_scale = accumulator.gradient_scale(batch_size);

        let mut example_losses = Array1::<f32>::zeros(batch_size);
        let mut q_gradient = Array2::<f32>::zeros(q_values.raw_dim());
        let mut selected_q_sum = 0.0;
        for (i, next_row) in next_q.axis_iter(Axis(0)).enumerate() {
            let continuation = if terminals[i] {
                0.0
            } else {
                let max_next = next_row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
                self.config.discount * max_next
            };
            let target = rewards[i] + compression_loss + continuation;
            let predicted = q_values[[i, actions[i]]];
            let diff = target - predicted;

            example_losses[i] = clipped_loss(diff, delta);
            // diff = target − prediction, so dLoss/dPrediction = −dLoss/dDiff
            q_gradient[[i, actions[i]]] = -clipped_loss_derivative(diff, delta) * gradient_scale;
            selected_q_sum += predicted;
        }
        let accumulated_loss = accumulator.accumulate(example_losses.view());

        let value_gradients = self.value.backward(q_gradient.view())?;
        self.value_rule.apply(&mut self.value.parameters_mut(), &value_gradients)?;

        let compressor_gradients = self.autoencoder.backward()?;
        self.compressor_rule.apply(&mut self.autoencoder.parameters_mut(), &compressor_gradients)?;

        self.update_counter += 1;
        self.observe_compression_loss(compression_loss);

        let report = StepReport {
            loss: accumulated_loss.sqrt(),
            accumulated_loss,
            compression_loss,
            mean_q: selected_q_sum / batch_size as f32,
        };
        self.metrics.record_step(report.loss, report.compression_loss, report.mean_q);
        debug!(
            "step {}: loss {:.6}, compression loss {:.6}, mean q {:.4}",
            self.update_counter, report.loss, report.compression_loss, report.mean_q
        );
        Ok(report)
    }

    fn observe_compression_loss(&mut self, compression_loss: f32) {
        // f32::max ignores NaN, so the running maximum never regresses
        self.max_compression_loss = self.max_compression_loss.max(compression_loss);
    }

    /// Place one observation in row 0 of an otherwise zero, full-size batch.
    fn padded_batch(&self, state: ArrayView3<f32>) -> Result<Array4<f32>> {
        let expected = self.config.state_shape();
        if state.dim() != expected {
            return Err(QcompError::shape(format!("{:?}", expected), format!("{:?}", state.dim())));
        }
        let mut batch = Array4::zeros(self.config.batch_shape());
        batch.index_axis_mut(Axis(0), 0).assign(&state);
        Ok(batch)
    }

    /// Action values for one observation; does not touch the compression maximum.
    pub fn q_vals(&self, state: ArrayView3<f32>) -> Result<Array1<f32>> {
        let batch = self.padded_batch(state)?;
        let q_values = self.value.evaluate(batch.view())?;
        Ok(q_values.index_axis(Axis(0), 0).to_owned())
    }

    /// Action values and compression loss for one observation, from a single trunk pass.
    pub fn q_vals_and_compression_loss(&mut self, state: ArrayView3<f32>) -> Result<(Array1<f32>, f32)> {
        let batch = self.padded_batch(state)?;
        let features = self.value.features(batch.view())?;
        let q_values = self.value.q_values_from_features(features.view())?;
        let compression_loss = self.autoencoder.reconstruct(features.view())?[0];
        self.observe_compression_loss(compression_loss);
        Ok((q_values.index_axis(Axis(0), 0).to_owned(), compression_loss))
    }

    /// Compression loss of one observation; updates the running maximum.
    pub fn compression_loss(&mut self, state: ArrayView3<f32>) -> Result<f32> {
        Ok(self.q_vals_and_compression_loss(state)?.1)
    }

    /// Choose an action with the policy selected at construction.
    pub fn choose_action(&mut self, state: ArrayView3<f32>, epsilon: f32) -> Result<usize> {
        let (q_values, compression_loss) = self.q_vals_and_compression_loss(state)?;
        let bias = exploration_bias(compression_loss, self.max_compression_loss);
        self.metrics.record_action(epsilon, bias);
        self.config
            .action_selection
            .select(q_values.view(), epsilon, bias, &mut self.rng)
    }

    /// Copy the live value parameters into the target snapshot; a no-op without one.
    pub fn reset_target_snapshot(&mut self) -> Result<()> {
        if let Some(target) = &mut self.target {
            target.refresh(&self.value)?;
        }
        Ok(())
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    pub fn update_counter(&self) -> usize {
        self.update_counter
    }

    pub fn max_compression_loss(&self) -> f32 {
        self.max_compression_loss
    }

    pub fn value_network(&self) -> &ValueNetwork {
        &self.value
    }

    pub fn autoencoder(&self) -> &Autoencoder {
        &self.autoencoder
    }

    pub fn target_snapshot(&self) -> Option<&TargetSnapshot> {
        self.target.as_ref()
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    pub(crate) fn parameter_state(&self) -> (Vec<ArrayD<f32>>, Vec<ArrayD<f32>>) {
        (self.value.parameter_values(), self.autoencoder.parameter_values())
    }

    /// Replace parameters and counters wholesale; nothing changes if any tensor mismatches.
    pub(crate) fn restore_parameter_state(
        &mut self,
        value: &[ArrayD<f32>],
        autoencoder: &[ArrayD<f32>],
        update_counter: usize,
        max_compression_loss: f32,
    ) -> Result<()> {
        let mut restored_value = self.value.clone();
        restored_value.load_parameter_values(value)?;
        let mut restored_autoencoder = self.autoencoder.clone();
        restored_autoencoder.load_parameter_values(autoencoder)?;

        self.value = restored_value;
        self.autoencoder = restored_autoencoder;
        self.update_counter = update_counter;
        self.max_compression_loss = self.max_compression_loss.max(max_compression_loss);
        self.reset_target_snapshot()
    }
}
