//! The repetition-based training orchestrator.
//!
//! A run resamples the data into one split per repetition, trains a fresh
//! randomly initialized network on each split, and snapshots candidate
//! models at regular reporting steps. Candidates may be gated on train and
//! test AUC; the best surviving candidate of each repetition (lowest test
//! error, earliest on ties) becomes that repetition's model. Repetitions
//! whose candidates all fail the gate count as failed, and the run as a
//! whole only errors when every repetition fails.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::sensitivity::{Analyzer, Profiler, SensitivityReport};
use crate::serde_model::model_file_name;
use crate::split::{Split, Splitter};
use crate::{Dataset, Error, ErrorKind, Network, Result, Roc};

/// How the source data is resampled into per-repetition splits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Method {
    /// Independent random splits, one per repetition.
    RandomRepetition { test_percent: f64 },
    /// K-fold cross-validation with `repetitions` folds.
    KFold,
    /// Bootstrap samples drawn with replacement from a fixed base split.
    Bootstrap { sample_percent: f64, test_percent: f64 },
}

/// Minimum AUC a candidate must reach on each side of its split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AucThresholds {
    pub train: f64,
    pub test: f64,
}

#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Hidden layer sizes; input and output sizes come from the data.
    pub hidden: Vec<usize>,
    pub learning_rate: f64,
    pub momentum: f64,
    /// Epochs between candidate snapshots.
    pub iter_inter: usize,
    /// Number of snapshots per repetition.
    pub iter_report: usize,
    pub repetitions: usize,
    pub method: Method,
    /// `None` retains every snapshot unconditionally.
    pub auc_filter: Option<AucThresholds>,
    /// Epochs run before the first snapshot window.
    pub burn_in: usize,
    /// Shuffle the pattern order each epoch instead of visiting patterns in
    /// dataset order.
    pub shuffle: bool,
    pub seed: u64,
    pub max_split_attempts: usize,
    /// Directory the chosen models are written to, if any.
    pub save_dir: Option<PathBuf>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            hidden: vec![3],
            learning_rate: 0.9,
            momentum: 0.0,
            iter_inter: 100,
            iter_report: 10,
            repetitions: 10,
            method: Method::RandomRepetition { test_percent: 50.0 },
            auc_filter: None,
            burn_in: 0,
            shuffle: false,
            seed: 0,
            max_split_attempts: 1000,
            save_dir: None,
        }
    }
}

impl TrainOptions {
    pub fn validate(&self) -> Result<()> {
        if self.learning_rate <= 0.0 || !self.learning_rate.is_finite() {
            return Err(Error::Config("learning rate must be positive".to_owned()));
        }
        if self.momentum < 0.0 || !self.momentum.is_finite() {
            return Err(Error::Config("momentum must be non-negative".to_owned()));
        }
        if self.iter_inter == 0 {
            return Err(Error::Config("iter_inter must be > 0".to_owned()));
        }
        if self.iter_report == 0 {
            return Err(Error::Config("iter_report must be > 0".to_owned()));
        }
        if self.repetitions == 0 {
            return Err(Error::Config("repetitions must be > 0".to_owned()));
        }
        if self.hidden.contains(&0) {
            return Err(Error::Config("hidden layer sizes must be > 0".to_owned()));
        }
        let percent_ok = |p: f64| p > 0.0 && p < 100.0;
        match self.method {
            Method::RandomRepetition { test_percent } if !percent_ok(test_percent) => {
                return Err(Error::Config(format!(
                    "test percentage {test_percent} is outside (0, 100)"
                )));
            }
            Method::Bootstrap {
                sample_percent,
                test_percent,
            } if !percent_ok(test_percent) || sample_percent <= 0.0 => {
                return Err(Error::Config(
                    "bootstrap percentages must be positive, test percentage below 100".to_owned(),
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

/// One candidate snapshot's scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialResult {
    /// Total training epochs at the snapshot, burn-in included.
    pub iteration: usize,
    pub train_error: f64,
    pub test_error: f64,
    /// Present only when AUC gating is active.
    pub train_auc: Option<f64>,
    pub test_auc: Option<f64>,
}

/// The model a repetition settled on.
#[derive(Debug, Clone)]
pub struct ChosenModel {
    pub repetition: usize,
    pub result: TrialResult,
    pub network: Network,
}

/// Soft warning attached to a run that still produced models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// Some repetitions failed the AUC gate; the surviving models stand.
    SomeTrialsFailed,
    /// Only one repetition survived, so there is no model ensemble.
    SingleModel,
}

#[derive(Debug)]
pub struct RunReport {
    pub models: Vec<ChosenModel>,
    /// One report per retained model when a profiler was supplied.
    pub sensitivity: Vec<SensitivityReport>,
    /// Indices of repetitions whose candidates were all gated out.
    pub failed: Vec<usize>,
    pub advisory: Option<Advisory>,
}

/// Tint of a progress notification: green while a repetition is healthy,
/// red when it produced no model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressColor {
    Green,
    Red,
}

/// Receives run progress; implementations forward it to a UI or a channel.
/// All methods default to no-ops.
pub trait Reporter: Send {
    fn progress(&self, _step: usize, _total: usize, _message: &str, _color: ProgressColor) {}
    fn text(&self, _message: &str) {}
    fn trial(&self, _repetition: usize, _result: &TrialResult) {}
}

/// Discards everything.
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Shared cancellation flag; cloning hands out another handle to the same
/// flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Run the full repetition loop over `data`.
///
/// Cancellation is observed at repetition and snapshot boundaries, so a
/// cancelled run returns [`Error::Cancelled`] within one snapshot window.
pub fn run(
    data: &Dataset,
    profiler: Option<&Profiler>,
    opts: &TrainOptions,
    reporter: &dyn Reporter,
    cancel: &CancelToken,
) -> Result<RunReport> {
    opts.validate()?;
    if opts.auc_filter.is_some() && data.target_dim() != 1 {
        return Err(Error::Config(
            "AUC gating needs a single output variable".to_owned(),
        ));
    }

    let mut topology = Vec::with_capacity(opts.hidden.len() + 2);
    topology.push(data.input_dim());
    topology.extend_from_slice(&opts.hidden);
    topology.push(data.target_dim());

    let mut splitter = Splitter::new(data, opts.seed).with_max_attempts(opts.max_split_attempts);
    let splits: Vec<Result<Split>> = match opts.method {
        Method::RandomRepetition { test_percent } => splitter
            .repeated_random_splits(test_percent, opts.repetitions)
            .collect(),
        Method::KFold => splitter.k_fold(opts.repetitions)?.collect(),
        Method::Bootstrap {
            sample_percent,
            test_percent,
        } => splitter
            .bootstrap(sample_percent, opts.repetitions, test_percent)?
            .collect(),
    };

    if let Some(dir) = &opts.save_dir {
        fs::create_dir_all(dir)
            .map_err(|e| Error::InvalidModel(format!("cannot create {}: {e}", dir.display())))?;
    }

    let mut rng = StdRng::seed_from_u64(opts.seed.wrapping_add(1));
    let mut net = Network::new(&topology)?;
    net.learning_rate = opts.learning_rate;
    net.momentum = opts.momentum;

    let total_steps = opts.repetitions * opts.iter_report;
    let mut models = Vec::new();
    let mut sensitivity = Vec::new();
    let mut failed = Vec::new();

    for (rep, split) in splits.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let split = split?;
        reporter.text(&format!(
            "repetition {}/{}: {} train / {} test patterns",
            rep + 1,
            opts.repetitions,
            split.train.len(),
            split.test.len()
        ));

        net.randomize_weights(&mut rng);
        if opts.shuffle {
            for _ in 0..opts.burn_in {
                net.train_epoch_shuffled(&split.train, &mut rng);
            }
        } else {
            net.run_iterations(&split.train, opts.burn_in);
        }

        let mut best: Option<(TrialResult, Network)> = None;
        for step in 1..=opts.iter_report {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if opts.shuffle {
                for _ in 0..opts.iter_inter {
                    net.train_epoch_shuffled(&split.train, &mut rng);
                }
            } else {
                net.run_iterations(&split.train, opts.iter_inter);
            }

            let iteration = opts.burn_in + step * opts.iter_inter;
            let train_error = net.net_error(&split.train, ErrorKind::RootMeanSquare)[0];
            let test_error = net.net_error(&split.test, ErrorKind::RootMeanSquare)[0];

            let mut result = TrialResult {
                iteration,
                train_error,
                test_error,
                train_auc: None,
                test_auc: None,
            };

            let retained = match opts.auc_filter {
                None => true,
                Some(thresholds) => match split_aucs(&mut net, &split) {
                    Ok((train_auc, test_auc)) => {
                        // Rejected snapshots still report their AUCs.
                        result.train_auc = Some(train_auc);
                        result.test_auc = Some(test_auc);
                        train_auc >= thresholds.train && test_auc >= thresholds.test
                    }
                    // A single-class fold cannot be scored; the snapshot is
                    // skipped rather than the run aborted.
                    Err(Error::DegenerateLabels) => {
                        log::debug!(
                            "repetition {}: snapshot at {iteration} had single-class labels",
                            rep + 1
                        );
                        false
                    }
                    Err(e) => return Err(e),
                },
            };

            reporter.trial(rep, &result);
            reporter.progress(
                rep * opts.iter_report + step,
                total_steps,
                &format!("repetition {} iteration {iteration}", rep + 1),
                ProgressColor::Green,
            );

            if retained {
                let better = best
                    .as_ref()
                    .map_or(true, |(b, _)| result.test_error < b.test_error);
                if better {
                    best = Some((result, net.clone()));
                }
            }
        }

        match best {
            Some((result, network)) => {
                log::info!(
                    "repetition {}: kept snapshot at iteration {} (test error {:.6})",
                    rep + 1,
                    result.iteration,
                    result.test_error
                );
                if let Some(dir) = &opts.save_dir {
                    network.save_json(&dir.join(model_file_name(result.iteration, rep)))?;
                }
                if let Some(profiler) = profiler {
                    let mut chosen = network.clone();
                    sensitivity.push(Analyzer::new(&mut chosen, profiler)?.report(data)?);
                }
                models.push(ChosenModel {
                    repetition: rep,
                    result,
                    network,
                });
            }
            None => {
                log::warn!("repetition {}: every snapshot failed the AUC gate", rep + 1);
                reporter.progress(
                    (rep + 1) * opts.iter_report,
                    total_steps,
                    &format!(
                        "repetition {}/{} produced no model",
                        rep + 1,
                        opts.repetitions
                    ),
                    ProgressColor::Red,
                );
                failed.push(rep);
            }
        }
    }

    let advisory = advisory_for(models.len(), opts.repetitions)?;
    Ok(RunReport {
        models,
        sensitivity,
        failed,
        advisory,
    })
}

/// AUC of the current network on both sides of a split; thresholding is the
/// caller's business so even rejected snapshots carry their scores.
fn split_aucs(net: &mut Network, split: &Split) -> Result<(f64, f64)> {
    let auc_of = |net: &mut Network, data: &Dataset| -> Result<f64> {
        let scores: Vec<f64> = (0..data.len()).map(|i| net.forward(data.input(i))[0]).collect();
        Ok(Roc::new(data.targets_flat(), &scores)?.auc_roc())
    };
    Ok((auc_of(net, &split.train)?, auc_of(net, &split.test)?))
}

/// Outcome policy: no model at all is fatal, a partial or single-model
/// ensemble is advisory.
fn advisory_for(successes: usize, repetitions: usize) -> Result<Option<Advisory>> {
    if successes == 0 {
        return Err(Error::AllTrialsFailed { repetitions });
    }
    if successes == repetitions && repetitions > 1 {
        return Ok(None);
    }
    if successes == 1 {
        return Ok(Some(Advisory::SingleModel));
    }
    Ok(Some(Advisory::SomeTrialsFailed))
}

/// Learning rates tried by [`suggest_learning_rate`], smallest first.
const LEARNING_RATE_LADDER: [f64; 17] = [
    1e-5, 5e-5, 1e-4, 5e-4, 1e-3, 5e-3, 0.01, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0,
];

/// Pick the ladder rate with the largest mean error drop over a few short
/// trainings on the full dataset. A hint, not an optimum; the per-rate mean
/// drops come back alongside the winner so a caller can show the sweep.
/// Rates that made the error worse score zero.
pub fn suggest_learning_rate(data: &Dataset, opts: &TrainOptions) -> Result<(f64, Vec<(f64, f64)>)> {
    opts.validate()?;

    let mut topology = Vec::with_capacity(opts.hidden.len() + 2);
    topology.push(data.input_dim());
    topology.extend_from_slice(&opts.hidden);
    topology.push(data.target_dim());

    let trials = opts.repetitions.min(5);
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut net = Network::new(&topology)?;
    net.momentum = opts.momentum;

    let mut sweep = Vec::with_capacity(LEARNING_RATE_LADDER.len());
    let mut best = (LEARNING_RATE_LADDER[0], f64::NEG_INFINITY);
    for &lr in &LEARNING_RATE_LADDER {
        net.learning_rate = lr;
        let mut drop = 0.0;
        for _ in 0..trials {
            net.randomize_weights(&mut rng);
            let before = net.net_error(data, ErrorKind::RootMeanSquare)[0];
            net.run_iterations(data, opts.iter_inter);
            let after = net.net_error(data, ErrorKind::RootMeanSquare)[0];
            drop += before - after;
        }
        let mean_drop = (drop / trials as f64).max(0.0);
        log::debug!("learning rate {lr}: mean error drop {mean_drop:.6}");
        sweep.push((lr, mean_drop));
        if mean_drop > best.1 {
            best = (lr, mean_drop);
        }
    }
    Ok((best.0, sweep))
}
