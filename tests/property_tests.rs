#[cfg(test)]
mod property_tests {
    use ndarray::{Array1, Array2};
    use proptest::prelude::*;
    use qcomp::loss::{clipped_loss, clipped_loss_derivative, reconstruction_losses, BatchAccumulator};
    use qcomp::optimizer::{DeepMindRmsProp, UpdateRule};
    use qcomp::policy::{exploration_bias, softmax_weights, ActionSelection};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn finite_values(len: usize) -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-100.0f32..100.0, len)
    }

    proptest! {
        #[test]
        fn test_clipped_loss_is_non_negative_and_bounded_slope(diff in -1e3f32..1e3, delta in 0.0f32..10.0) {
            let loss = clipped_loss(diff, delta);
            prop_assert!(loss >= 0.0);
            prop_assert!(loss <= 0.5 * diff * diff + 1e-3);
            if delta > 0.0 {
                prop_assert!(clipped_loss_derivative(diff, delta).abs() <= delta);
            }
        }

        #[test]
        fn test_sum_is_batch_size_times_mean(losses in prop::collection::vec(0.0f32..50.0, 1..64)) {
            let losses = Array1::from_vec(losses);
            let sum = BatchAccumulator::Sum.accumulate(losses.view());
            let mean = BatchAccumulator::Mean.accumulate(losses.view());
            prop_assert!((sum - losses.len() as f32 * mean).abs() <= 1e-3 * (1.0 + sum));
        }

        #[test]
        fn test_reconstruction_losses_are_non_negative(values in finite_values(24), other in finite_values(24)) {
            let original = Array2::from_shape_vec((4, 6), values).unwrap();
            let reconstructed = Array2::from_shape_vec((4, 6), other).unwrap();
            let losses = reconstruction_losses(original.view(), reconstructed.view());
            prop_assert_eq!(losses.len(), 4);
            prop_assert!(losses.iter().all(|&l| l >= 0.0));
            let identical = reconstruction_losses(original.view(), original.view());
            prop_assert!(identical.iter().all(|&l| l == 0.0));
        }

        #[test]
        fn test_exploration_bias_at_most_one(loss in 0.0f32..100.0, extra in 0.0f32..100.0) {
            let max = loss + extra;
            let bias = exploration_bias(loss, max);
            prop_assert!((0.0..=1.0).contains(&bias));
        }

        #[test]
        fn test_softmax_weights_in_unit_interval(q in finite_values(6), tau in 0.01f32..10.0) {
            let weights = softmax_weights(Array1::from_vec(q).view(), tau).unwrap();
            prop_assert!(weights.iter().all(|&w| (0.0..=1.0).contains(&w)));
            prop_assert!(weights.iter().any(|&w| w == 1.0));
        }

        #[test]
        fn test_selected_action_in_range(q in finite_values(5), epsilon in 0.0f32..1.0, seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let q = Array1::from_vec(q);
            for selection in [ActionSelection::EpsilonGreedy, ActionSelection::Softmax] {
                let action = selection.select(q.view(), epsilon + 0.01, 0.0, &mut rng).unwrap();
                prop_assert!(action < 5);
            }
        }

        #[test]
        fn test_deepmind_rmsprop_steps_are_finite(grads in prop::collection::vec(-1e3f32..1e3, 1..20)) {
            let mut rule = DeepMindRmsProp::new(0.00025, 0.95, 0.01);
            for g in grads {
                let step = rule.delta(0, &ndarray::ArrayD::from_elem(ndarray::IxDyn(&[3]), g));
                prop_assert!(step.iter().all(|s| s.is_finite()));
                prop_assert!(g == 0.0 || step[0].signum() == -g.signum());
            }
        }
    }
}
