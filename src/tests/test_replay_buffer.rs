use ndarray::Array3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::QcompError;
use crate::replay_buffer::{ReplayBuffer, Transition, TransitionBatch};

fn transition(id: usize) -> Transition {
    Transition {
        state: Array3::from_elem((2, 3, 3), id as f32),
        action: id % 3,
        reward: id as f32,
        next_state: Array3::from_elem((2, 3, 3), id as f32 + 1.0),
        terminal: id % 5 == 0,
    }
}

#[test]
fn test_oldest_transitions_are_evicted() {
    let mut buffer = ReplayBuffer::new(3);
    for id in 0..5 {
        buffer.add(transition(id));
    }
    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer.capacity(), 3);

    let mut rng = StdRng::seed_from_u64(0);
    let mut rewards: Vec<f32> = buffer.sample(3, &mut rng).unwrap().iter().map(|t| t.reward).collect();
    rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(rewards, vec![2.0, 3.0, 4.0]);
}

#[test]
fn test_sample_needs_enough_transitions() {
    let mut buffer = ReplayBuffer::new(10);
    buffer.add(transition(1));
    let mut rng = StdRng::seed_from_u64(1);
    assert!(matches!(buffer.sample(2, &mut rng), Err(QcompError::Shape { .. })));
}

#[test]
fn test_sample_batch_stacks_transitions() {
    let mut buffer = ReplayBuffer::new(10);
    for id in 0..6 {
        buffer.add(transition(id));
    }
    let mut rng = StdRng::seed_from_u64(2);
    let batch = buffer.sample_batch(4, &mut rng).unwrap();
    assert_eq!(batch.len(), 4);
    assert_eq!(batch.states.dim(), (4, 2, 3, 3));
    for i in 0..4 {
        assert_eq!(batch.next_states[[i, 1, 2, 2]], batch.states[[i, 0, 0, 0]] + 1.0);
        assert_eq!(batch.rewards[i], batch.states[[i, 0, 0, 0]]);
    }
    assert!(batch.validate((4, 2, 3, 3), 3).is_ok());
}

#[test]
fn test_batch_validation() {
    let (first, second) = (transition(1), transition(2));
    let mut batch = TransitionBatch::from_transitions(&[&first, &second]).unwrap();
    assert!(matches!(batch.validate((3, 2, 3, 3), 3), Err(QcompError::Shape { .. })));
    assert!(matches!(
        batch.validate((2, 2, 3, 3), 2),
        Err(QcompError::InvalidAction { action: 2, num_actions: 2 })
    ));
    batch.terminals.pop();
    assert!(matches!(batch.validate((2, 2, 3, 3), 3), Err(QcompError::Shape { .. })));

    let mut odd = transition(3);
    odd.next_state = Array3::zeros((1, 3, 3));
    assert!(matches!(
        TransitionBatch::from_transitions(&[&first, &odd]),
        Err(QcompError::Shape { .. })
    ));
}
