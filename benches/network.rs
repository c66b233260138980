use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use nichenet::{Dataset, Network};

fn random_dataset(n: usize, dim: usize, rng: &mut StdRng) -> Dataset {
    let inputs: Vec<Vec<f64>> = (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();
    let targets: Vec<Vec<f64>> = (0..n)
        .map(|i| vec![if i % 2 == 0 { 1.0 } else { 0.0 }])
        .collect();
    Dataset::from_rows(&inputs, &targets).unwrap()
}

fn bench_forward(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(17);
    let mut net = Network::new(&[8, 16, 16, 1]).unwrap();
    net.randomize_weights(&mut rng);
    let input: Vec<f64> = (0..8).map(|_| rng.gen_range(-1.0..1.0)).collect();

    c.bench_function("forward_8_16_16_1", |b| {
        b.iter(|| black_box(net.forward(black_box(&input))[0]))
    });
}

fn bench_train_epoch(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(18);
    let data = random_dataset(256, 8, &mut rng);
    let mut net = Network::new(&[8, 16, 1]).unwrap();
    net.randomize_weights(&mut rng);

    c.bench_function("train_epoch_256x8", |b| b.iter(|| net.train_epoch(&data)));
}

fn bench_partial_derivatives(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(19);
    let mut net = Network::new(&[8, 12, 1]).unwrap();
    net.randomize_weights(&mut rng);
    let input: Vec<f64> = (0..8).map(|_| rng.gen_range(-1.0..1.0)).collect();

    c.bench_function("partial_derivatives_8_12_1", |b| {
        b.iter(|| black_box(net.partial_derivatives(black_box(&input))))
    });
}

criterion_group!(
    benches,
    bench_forward,
    bench_train_epoch,
    bench_partial_derivatives
);
criterion_main!(benches);
