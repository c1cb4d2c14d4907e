use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array3, Array4};
use qcomp::agent::Learner;
use qcomp::config::LearnerConfig;
use qcomp::network::NetworkType;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn config_for(network_type: NetworkType) -> LearnerConfig {
    let side = match network_type {
        NetworkType::Linear => 16,
        _ => 84,
    };
    LearnerConfig::new()
        .with_input_size(side, side)
        .with_num_actions(6)
        .with_network_type(network_type)
}

fn bench_train_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("train_step");
    group.sample_size(10);
    for network_type in [NetworkType::Linear, NetworkType::Nips, NetworkType::Large] {
        let config = config_for(network_type);
        let mut learner = Learner::new(config.clone()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let states = Array4::from_shape_fn(config.batch_shape(), |_| rng.gen_range(0.0..255.0));
        let next_states = Array4::from_shape_fn(config.batch_shape(), |_| rng.gen_range(0.0..255.0));
        let actions: Vec<usize> = (0..config.batch_size).map(|i| i % config.num_actions).collect();
        let rewards = Array1::from_shape_fn(config.batch_size, |i| (i % 3) as f32 - 1.0);
        let terminals = vec![false; config.batch_size];

        group.bench_with_input(BenchmarkId::from_parameter(network_type), &network_type, |b, _| {
            b.iter(|| {
                learner
                    .train(
                        black_box(states.view()),
                        &actions,
                        rewards.view(),
                        next_states.view(),
                        &terminals,
                    )
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_choose_action(c: &mut Criterion) {
    let config = config_for(NetworkType::Nips);
    let mut learner = Learner::new(config.clone()).unwrap();
    let state = Array3::from_elem(config.state_shape(), 128.0);
    c.bench_function("choose_action_nips", |b| {
        b.iter(|| learner.choose_action(black_box(state.view()), 0.05).unwrap())
    });
}

criterion_group!(benches, bench_train_step, bench_choose_action);
criterion_main!(benches);
