//! The multi-layer perceptron training engine.
//!
//! A [`Network`] owns its topology, weight matrices, momentum buffers and the
//! transient activation state of the most recent forward pass. Training is
//! strictly on-line: one pattern through [`Network::forward`] and
//! [`Network::backward`] at a time, weights updated immediately, no batching
//! and no averaging. An epoch visits the patterns in dataset order unless the
//! caller explicitly asks for a shuffled pass.
//!
//! # Weight layout
//!
//! For layer `l` (0-based, input layer excluded) the weight matrix is a flat
//! row-major buffer with one row per neuron and `topology[l] + 1` columns;
//! the last column of each row is the bias. The momentum buffer `changes`
//! mirrors this shape and stores the previous per-connection weight delta.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{Activation, Dataset, Error, Result};

/// Which aggregate error [`Network::net_error`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `0.5 * Σ error²` per output dimension.
    SumSquared,
    /// `sqrt(mean(error²))` per output dimension.
    RootMeanSquare,
}

#[derive(Debug, Clone)]
pub struct Network {
    topology: Vec<usize>,
    /// Per layer: `topology[l+1]` rows of `topology[l] + 1` columns (bias last).
    weights: Vec<Vec<f64>>,
    /// Previous weight deltas, same shape as `weights`.
    changes: Vec<Vec<f64>>,
    /// Post-activation neuron outputs for the current pattern.
    values: Vec<Vec<f64>>,
    /// Activation derivatives expressed in terms of `values`.
    derivatives: Vec<Vec<f64>>,
    activation: Activation,
    pub learning_rate: f64,
    pub momentum: f64,
    /// Epochs performed by one [`Network::train`] call.
    pub iterations: usize,
}

impl Network {
    /// Allocate a network for the given topology (input size first, output
    /// size last). Weights start at zero; call [`Network::randomize_weights`]
    /// before training.
    pub fn new(topology: &[usize]) -> Result<Self> {
        if topology.is_empty() {
            return Err(Error::Config("network topology cannot be empty".to_owned()));
        }
        if topology.len() < 2 {
            return Err(Error::Config(
                "topology must include input and output sizes".to_owned(),
            ));
        }
        if topology.contains(&0) {
            return Err(Error::Config("all layer sizes must be > 0".to_owned()));
        }

        let mut weights = Vec::with_capacity(topology.len() - 1);
        let mut values = Vec::with_capacity(topology.len() - 1);
        for w in topology.windows(2) {
            weights.push(vec![0.0; w[1] * (w[0] + 1)]);
            values.push(vec![0.0; w[1]]);
        }
        let changes = weights.clone();
        let derivatives = values.clone();

        Ok(Self {
            topology: topology.to_vec(),
            weights,
            changes,
            values,
            derivatives,
            activation: Activation::Sigmoid,
            learning_rate: 0.9,
            momentum: 0.0,
            iterations: 1000,
        })
    }

    /// Rebuild a network from validated parts (used by model deserialization).
    pub(crate) fn from_parts(
        topology: Vec<usize>,
        activation: Activation,
        weights: Vec<Vec<f64>>,
        changes: Vec<Vec<f64>>,
        learning_rate: f64,
        momentum: f64,
        iterations: usize,
    ) -> Result<Self> {
        let mut net = Self::new(&topology)?;
        if weights.len() != net.weights.len() || changes.len() != net.changes.len() {
            return Err(Error::InvalidModel(format!(
                "expected {} weight layers, got {}",
                net.weights.len(),
                weights.len()
            )));
        }
        for (l, (w, c)) in weights.iter().zip(&changes).enumerate() {
            if w.len() != net.weights[l].len() || c.len() != net.changes[l].len() {
                return Err(Error::InvalidModel(format!(
                    "layer {l} has {} weights, expected {}",
                    w.len(),
                    net.weights[l].len()
                )));
            }
            if w.iter().chain(c.iter()).any(|v| !v.is_finite()) {
                return Err(Error::InvalidModel(format!(
                    "layer {l} contains non-finite parameters"
                )));
            }
        }
        net.weights = weights;
        net.changes = changes;
        net.activation = activation;
        net.learning_rate = learning_rate;
        net.momentum = momentum;
        net.iterations = iterations;
        Ok(net)
    }

    #[inline]
    pub fn topology(&self) -> &[usize] {
        &self.topology
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.topology[0]
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        *self.topology.last().expect("topology is never empty")
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub(crate) fn weight_layers(&self) -> &[Vec<f64>] {
        &self.weights
    }

    #[inline]
    pub(crate) fn change_layers(&self) -> &[Vec<f64>] {
        &self.changes
    }

    #[cfg(test)]
    pub(crate) fn weights_mut(&mut self, layer: usize) -> &mut [f64] {
        &mut self.weights[layer]
    }

    /// Re-initialize every weight uniformly in `[-0.5, 0.5)` and zero the
    /// momentum buffers. Must be called before reusing the network for a new
    /// repetition; construction does not randomize.
    pub fn randomize_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for layer in &mut self.weights {
            for w in layer.iter_mut() {
                *w = rng.gen_range(-0.5..0.5);
            }
        }
        for layer in &mut self.changes {
            layer.fill(0.0);
        }
    }

    /// Forward pass for one pattern. Overwrites the activation state and
    /// returns the output layer values.
    pub fn forward(&mut self, input: &[f64]) -> &[f64] {
        debug_assert_eq!(input.len(), self.input_dim());

        let act = self.activation;
        for l in 0..self.weights.len() {
            let cols = self.topology[l] + 1;
            // Borrow the previous layer's output immutably and this layer's
            // buffers mutably.
            let (prev_values, rest) = self.values.split_at_mut(l);
            let out = &mut rest[0];
            let prev: &[f64] = if l == 0 { input } else { &prev_values[l - 1] };
            let weights = &self.weights[l];
            let derivs = &mut self.derivatives[l];

            for (n, out_n) in out.iter_mut().enumerate() {
                let row = n * cols;
                let mut sum = weights[row + cols - 1]; // bias
                for (w, &p) in prev.iter().enumerate() {
                    sum += weights[row + w] * p;
                }
                let y = act.forward(sum);
                *out_n = y;
                derivs[n] = act.grad_from_output(y);
            }
        }

        self.output()
    }

    /// Output layer values from the most recent forward pass.
    #[inline]
    pub fn output(&self) -> &[f64] {
        self.values.last().expect("network has at least one layer")
    }

    /// Backpropagation for exactly one pattern, using the activation state
    /// left by [`Network::forward`] on the same input.
    ///
    /// The output error is `y - t`. Each weight moves by
    /// `Δw = lr·delta·input_activation + momentum·previous Δw`; the bias
    /// moves by `lr·delta` with no momentum term. The error handed to the
    /// earlier layer accumulates `w·error` per incoming connection.
    pub fn backward(&mut self, input: &[f64], target: &[f64]) {
        debug_assert_eq!(input.len(), self.input_dim());
        debug_assert_eq!(target.len(), self.output_dim());

        let lr = self.learning_rate;
        let m = self.momentum;

        let mut errors: Vec<f64> = self
            .output()
            .iter()
            .zip(target)
            .map(|(y, t)| y - t)
            .collect();

        for l in (0..self.weights.len()).rev() {
            let prev_size = self.topology[l];
            let cols = prev_size + 1;
            let weights = &mut self.weights[l];
            let changes = &mut self.changes[l];
            let derivs = &self.derivatives[l];

            let mut prev_errors = vec![0.0; prev_size];
            for (n, &err) in errors.iter().enumerate() {
                let delta = derivs[n] * err;
                let row = n * cols;
                for w in 0..prev_size {
                    prev_errors[w] += weights[row + w] * err;
                    let inp = if l == 0 { input[w] } else { self.values[l - 1][w] };
                    let change = lr * delta * inp + m * changes[row + w];
                    weights[row + w] -= change;
                    changes[row + w] = change;
                }
                weights[row + prev_size] -= lr * delta;
            }
            errors = prev_errors;
        }
    }

    /// Forward + backward for one pattern (one on-line gradient step).
    #[inline]
    pub fn train_pattern(&mut self, input: &[f64], target: &[f64]) {
        self.forward(input);
        self.backward(input, target);
    }

    /// One full pass over the patterns in dataset order. Deliberately
    /// unshuffled; see [`Network::train_epoch_shuffled`].
    pub fn train_epoch(&mut self, data: &Dataset) {
        for idx in 0..data.len() {
            self.train_pattern(data.input(idx), data.target(idx));
        }
    }

    /// One full pass over the dataset in a freshly shuffled order.
    pub fn train_epoch_shuffled<R: Rng + ?Sized>(&mut self, data: &Dataset, rng: &mut R) {
        let mut order: Vec<usize> = (0..data.len()).collect();
        order.shuffle(rng);
        for idx in order {
            self.train_pattern(data.input(idx), data.target(idx));
        }
    }

    /// `n` in-order epochs.
    pub fn run_iterations(&mut self, data: &Dataset, n: usize) {
        for _ in 0..n {
            self.train_epoch(data);
        }
    }

    /// `self.iterations` in-order epochs.
    pub fn train(&mut self, data: &Dataset) {
        self.run_iterations(data, self.iterations);
    }

    /// Pure forward evaluation of one pattern; weights are untouched.
    pub fn evaluate(&mut self, input: &[f64]) -> Vec<f64> {
        self.forward(input).to_vec()
    }

    /// Pure forward evaluation of every pattern in `data`.
    pub fn evaluate_set(&mut self, data: &Dataset) -> Vec<Vec<f64>> {
        (0..data.len())
            .map(|idx| self.forward(data.input(idx)).to_vec())
            .collect()
    }

    /// Aggregate network error over a dataset, one value per output
    /// dimension.
    pub fn net_error(&mut self, data: &Dataset, kind: ErrorKind) -> Vec<f64> {
        debug_assert_eq!(data.target_dim(), self.output_dim());

        let mut acc = vec![0.0; self.output_dim()];
        for idx in 0..data.len() {
            let out = self.forward(data.input(idx));
            for ((a, &y), &t) in acc.iter_mut().zip(out).zip(data.target(idx)) {
                let e = y - t;
                *a += e * e;
            }
        }
        match kind {
            ErrorKind::SumSquared => acc.iter().map(|a| 0.5 * a).collect(),
            ErrorKind::RootMeanSquare => {
                acc.iter().map(|a| (a / data.len() as f64).sqrt()).collect()
            }
        }
    }

    /// Sensitivity of each output to each input for one pattern, as an
    /// `(output_dim, input_dim)` table.
    ///
    /// Works by "sprawling" the network: for each input node the running
    /// product list starts with that node's first-layer weights, then layer
    /// by layer each entry is multiplied by its neuron's activation
    /// derivative and expanded across the fan-out of the next layer, so the
    /// list grows by the branching factor and every input-to-output path
    /// contributes exactly once. Entry `x` always refers to the neuron
    /// `x mod layer_size`, which is what the derivative lookup and the final
    /// per-output fold rely on.
    pub fn partial_derivatives(&mut self, input: &[f64]) -> Vec<Vec<f64>> {
        self.forward(input);

        let sizes = &self.topology[1..];
        let depth = sizes.len();
        let n_out = sizes[depth - 1];
        let mut result = vec![vec![0.0; input.len()]; n_out];

        for i in 0..input.len() {
            let cols0 = self.topology[0] + 1;
            let mut product: Vec<f64> = (0..sizes[0])
                .map(|n| self.weights[0][n * cols0 + i])
                .collect();

            for l in 0..depth - 1 {
                let m = sizes[l];
                for (x, p) in product.iter_mut().enumerate() {
                    *p *= self.derivatives[l][x % m];
                }
                let next = sizes[l + 1];
                let cols = self.topology[l + 1] + 1;
                let mut expanded = Vec::with_capacity(product.len() * next);
                for (j, &p) in product.iter().enumerate() {
                    let prev_neuron = j % m;
                    for q in 0..next {
                        expanded.push(p * self.weights[l + 1][q * cols + prev_neuron]);
                    }
                }
                product = expanded;
            }

            for (x, p) in product.iter_mut().enumerate() {
                *p *= self.derivatives[depth - 1][x % n_out];
            }
            for (x, &p) in product.iter().enumerate() {
                result[x % n_out][i] += p;
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assert_close(analytic: f64, numeric: f64, abs_tol: f64, rel_tol: f64) {
        let diff = (analytic - numeric).abs();
        let scale = analytic.abs().max(numeric.abs()).max(1.0);
        assert!(
            diff <= abs_tol || diff / scale <= rel_tol,
            "analytic={analytic} numeric={numeric} diff={diff}"
        );
    }

    fn xor_data() -> Dataset {
        Dataset::from_rows(
            &[
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 1.0],
                vec![0.0, 0.0],
            ],
            &[vec![1.0], vec![1.0], vec![0.0], vec![0.0]],
        )
        .unwrap()
    }

    #[test]
    fn rejects_bad_topologies() {
        assert!(Network::new(&[]).is_err());
        assert!(Network::new(&[3]).is_err());
        assert!(Network::new(&[3, 0, 1]).is_err());
        assert!(Network::new(&[3, 2, 1]).is_ok());
    }

    #[test]
    fn buffer_shapes_match_topology() {
        let net = Network::new(&[4, 3, 2]).unwrap();
        assert_eq!(net.weight_layers()[0].len(), 3 * 5);
        assert_eq!(net.weight_layers()[1].len(), 2 * 4);
        assert_eq!(net.change_layers()[0].len(), 3 * 5);
    }

    #[test]
    fn forward_is_deterministic_for_fixed_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut net = Network::new(&[3, 5, 1]).unwrap();
        net.randomize_weights(&mut rng);

        let input = [0.2, -0.4, 0.9];
        let a = net.evaluate(&input);
        let b = net.evaluate(&input);
        assert_eq!(a, b);
    }

    #[test]
    fn randomize_resets_momentum_buffers() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut net = Network::new(&[2, 3, 1]).unwrap();
        net.randomize_weights(&mut rng);
        net.train_epoch(&xor_data());
        assert!(net.change_layers()[0].iter().any(|&c| c != 0.0));

        net.randomize_weights(&mut rng);
        assert!(net.change_layers().iter().flatten().all(|&c| c == 0.0));
    }

    #[test]
    fn zero_weights_give_half_output() {
        // With all weights zero the sigmoid of the zero sum is exactly 0.5.
        let mut net = Network::new(&[2, 3, 1]).unwrap();
        let out = net.evaluate(&[0.3, -0.8]);
        assert_eq!(out, vec![0.5]);
    }

    #[test]
    fn net_error_kinds_agree_on_known_outputs() {
        let mut net = Network::new(&[2, 3, 1]).unwrap();
        let data = Dataset::from_rows(&[vec![0.0, 0.0], vec![1.0, 1.0]], &[vec![0.0], vec![1.0]])
            .unwrap();

        // Zero weights predict 0.5 everywhere: squared errors are 0.25 each.
        let ss = net.net_error(&data, ErrorKind::SumSquared);
        assert!((ss[0] - 0.25).abs() < 1e-12);
        let rms = net.net_error(&data, ErrorKind::RootMeanSquare);
        assert!((rms[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn xor_converges_on_most_seeds() {
        let data = xor_data();
        let mut successes = 0;
        for seed in 0..10u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut net = Network::new(&[2, 3, 1]).unwrap();
            net.learning_rate = 0.8;
            net.momentum = 0.0;
            net.randomize_weights(&mut rng);
            net.run_iterations(&data, 5000);
            let err = net.net_error(&data, ErrorKind::SumSquared)[0];
            if err < 0.05 {
                successes += 1;
            }
        }
        assert!(successes >= 9, "only {successes}/10 seeds converged");
    }

    #[test]
    fn shuffled_epochs_are_seed_deterministic_and_reorder_updates() {
        let data = xor_data();
        let mut seed_rng = StdRng::seed_from_u64(2);
        let mut shuffled_a = Network::new(&[2, 3, 1]).unwrap();
        shuffled_a.randomize_weights(&mut seed_rng);
        let mut shuffled_b = shuffled_a.clone();
        let mut ordered = shuffled_a.clone();

        let mut rng_a = StdRng::seed_from_u64(5);
        let mut rng_b = StdRng::seed_from_u64(5);
        for _ in 0..5 {
            shuffled_a.train_epoch_shuffled(&data, &mut rng_a);
            shuffled_b.train_epoch_shuffled(&data, &mut rng_b);
            ordered.train_epoch(&data);
        }

        // Same seed, same trajectory.
        let probe = [1.0, 0.0];
        assert_eq!(shuffled_a.evaluate(&probe), shuffled_b.evaluate(&probe));
        // Online updates depend on visit order, so the shuffled trajectory
        // diverges from the in-order one.
        assert_ne!(shuffled_a.evaluate(&probe), ordered.evaluate(&probe));
    }

    #[test]
    fn backward_reduces_single_pattern_error() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut net = Network::new(&[2, 4, 1]).unwrap();
        net.learning_rate = 0.5;
        net.randomize_weights(&mut rng);

        let input = [0.7, -0.3];
        let target = [1.0];
        let before = (net.evaluate(&input)[0] - target[0]).abs();
        for _ in 0..50 {
            net.train_pattern(&input, &target);
        }
        let after = (net.evaluate(&input)[0] - target[0]).abs();
        assert!(after < before);
    }

    #[test]
    fn partial_derivatives_match_finite_differences() {
        // Single hidden layer and deeper topologies, many random
        // input/weight configurations.
        let topologies: [&[usize]; 3] = [&[3, 4, 1], &[2, 5, 1], &[2, 4, 3, 1]];
        let mut rng = StdRng::seed_from_u64(11);
        let eps = 1e-5;

        for topology in topologies {
            for _ in 0..20 {
                let mut net = Network::new(topology).unwrap();
                net.randomize_weights(&mut rng);
                let input: Vec<f64> = (0..topology[0]).map(|_| rng.gen_range(-1.0..1.0)).collect();

                let analytic = net.partial_derivatives(&input);
                for i in 0..input.len() {
                    let mut plus = input.clone();
                    plus[i] += eps;
                    let mut minus = input.clone();
                    minus[i] -= eps;
                    for o in 0..net.output_dim() {
                        let up = net.evaluate(&plus)[o];
                        let down = net.evaluate(&minus)[o];
                        let numeric = (up - down) / (2.0 * eps);
                        assert_close(analytic[o][i], numeric, 1e-6, 1e-5);
                    }
                }
            }
        }
    }

    #[test]
    fn partial_derivatives_shape_is_outputs_by_inputs() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut net = Network::new(&[3, 4, 2]).unwrap();
        net.randomize_weights(&mut rng);
        let pd = net.partial_derivatives(&[0.1, 0.2, 0.3]);
        assert_eq!(pd.len(), 2);
        assert_eq!(pd[0].len(), 3);
    }
}
