//! XOR demonstration binary.
//!
//! Trains a tiny network on the XOR truth table, prints the predictions,
//! and shows the partial derivatives of the output with respect to each
//! input at every pattern.

use nichenet::{Dataset, ErrorKind, Network, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let data = Dataset::from_rows(
        &[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
        ],
        &[vec![1.0], vec![1.0], vec![0.0], vec![0.0]],
    )?;

    let mut rng = StdRng::seed_from_u64(1);
    let mut net = Network::new(&[2, 3, 1])?;
    net.learning_rate = 0.8;
    net.iterations = 10_000;
    net.randomize_weights(&mut rng);

    log::info!("training on XOR for {} epochs", net.iterations);
    net.train(&data);

    let sse = net.net_error(&data, ErrorKind::SumSquared)[0];
    println!("sum squared error: {sse:.6}\n");

    for idx in 0..data.len() {
        let input = data.input(idx).to_vec();
        let out = net.evaluate(&input)[0];
        let pd = net.partial_derivatives(&input);
        println!(
            "{:?} -> {out:.4} (target {}) d_out/d_in = [{:.4}, {:.4}]",
            input,
            data.target(idx)[0],
            pd[0][0],
            pd[0][1]
        );
    }

    Ok(())
}
