use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::common::assert_close;
use crate::error::QcompError;
use crate::policy::{argmax, exploration_bias, softmax_weights, ActionSelection};

#[test]
fn test_exploration_bias() {
    assert_close(exploration_bias(0.5, 0.0), 0.0, 0.0);
    assert_close(exploration_bias(1.0, 2.0), 0.5, 1e-7);
    assert_close(exploration_bias(2.0, 2.0), 1.0, 1e-7);
}

#[test]
fn test_argmax_prefers_first_maximum() {
    assert_eq!(argmax(array![1.0f32, 3.0, 3.0, 2.0].view()), 1);
    assert_eq!(argmax(array![f32::NAN, 0.5, 0.1].view()), 1);
    assert_eq!(argmax(array![0.2f32, f32::NAN, 0.1].view()), 0);
}

#[test]
fn test_greedy_when_no_exploration() {
    let mut rng = StdRng::seed_from_u64(0);
    let q = array![0.1f32, 0.9, 0.3];
    for _ in 0..100 {
        let action = ActionSelection::EpsilonGreedy.select(q.view(), 0.0, 0.0, &mut rng).unwrap();
        assert_eq!(action, 1);
    }
}

#[test]
fn test_full_exploration_covers_every_action() {
    let mut rng = StdRng::seed_from_u64(1);
    let q = array![0.1f32, 0.9, 0.3, 0.0];
    let mut counts = [0usize; 4];
    for _ in 0..2000 {
        counts[ActionSelection::EpsilonGreedy.select(q.view(), 0.5, 0.5, &mut rng).unwrap()] += 1;
    }
    for count in counts {
        assert!(count > 350 && count < 650, "counts {:?}", counts);
    }
}

#[test]
fn test_softmax_weights_are_shifted() {
    let weights = softmax_weights(array![1.0f32, 3.0, 2.0].view(), 1.0).unwrap();
    assert_close(weights[1], 1.0, 1e-7);
    assert_close(weights[0], (-2.0f32).exp(), 1e-6);

    // large values must not overflow
    let weights = softmax_weights(array![1000.0f32, 999.0].view(), 0.01).unwrap();
    assert!(weights.iter().all(|w| w.is_finite()));
}

#[test]
fn test_softmax_low_temperature_is_greedy() {
    let mut rng = StdRng::seed_from_u64(2);
    let q = array![0.1f32, 0.2, 0.9];
    for _ in 0..100 {
        assert_eq!(ActionSelection::Softmax.select(q.view(), 1e-3, 0.0, &mut rng).unwrap(), 2);
    }
}

#[test]
fn test_softmax_zero_temperature_is_a_hazard() {
    let mut rng = StdRng::seed_from_u64(3);
    let q = array![0.1f32, 0.2];
    assert!(matches!(
        ActionSelection::Softmax.select(q.view(), 0.0, 0.0, &mut rng),
        Err(QcompError::NumericHazard(_))
    ));
    assert!(matches!(
        softmax_weights(array![f32::INFINITY, 0.0].view(), 1.0),
        Err(QcompError::NumericHazard(_))
    ));
}

#[test]
fn test_action_selection_identifiers() {
    assert_eq!("epsilon-greedy".parse::<ActionSelection>().unwrap(), ActionSelection::EpsilonGreedy);
    assert_eq!("softmax".parse::<ActionSelection>().unwrap(), ActionSelection::Softmax);
    assert!(matches!("boltzmann".parse::<ActionSelection>(), Err(QcompError::Configuration { .. })));
}
