//! Resampling policies.
//!
//! Every training repetition works on a [`Split`]: a train set the network
//! fits and a held-out test set it is scored on. Three policies produce
//! splits from one source dataset: repeated random subsampling, k-fold
//! cross-validation, and bootstrap resampling with replacement.
//!
//! Random and bootstrap draws are rejection-sampled: a draw where either
//! side contains a single class is discarded and retried, up to a cap, so
//! downstream ROC evaluation always sees both classes.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::{Dataset, Error, Result};

const DEFAULT_MAX_ATTEMPTS: usize = 1000;

/// One train/test partition of the source data.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

/// Seeded factory for train/test splits over one dataset.
pub struct Splitter<'a> {
    data: &'a Dataset,
    rng: StdRng,
    max_attempts: usize,
}

impl<'a> Splitter<'a> {
    pub fn new(data: &'a Dataset, seed: u64) -> Self {
        Self {
            data,
            rng: StdRng::seed_from_u64(seed),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Cap on rejected draws before a policy gives up with
    /// [`Error::DegenerateSample`].
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// One random split holding out `test_percent` percent of the patterns.
    ///
    /// Draws are rejected while either side is single-class.
    pub fn random_split(&mut self, test_percent: f64) -> Result<Split> {
        let n = self.data.len();
        let test_count = (n as f64 * test_percent / 100.0).floor() as usize;
        if test_count == 0 {
            return Err(Error::Config(format!(
                "test percentage {test_percent} selects zero of {n} patterns"
            )));
        }
        if test_count >= n {
            return Err(Error::Config(format!(
                "test percentage {test_percent} leaves no training patterns"
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        for _ in 0..self.max_attempts {
            indices.shuffle(&mut self.rng);
            let (test_idx, train_idx) = indices.split_at(test_count);
            let test = self.data.subset(test_idx);
            let train = self.data.subset(train_idx);
            if !test.single_class() && !train.single_class() {
                return Ok(Split { train, test });
            }
        }
        Err(Error::DegenerateSample(format!(
            "no split with both classes on each side after {} attempts",
            self.max_attempts
        )))
    }

    /// Iterator over `repetitions` independent random splits.
    pub fn repeated_random_splits(
        &mut self,
        test_percent: f64,
        repetitions: usize,
    ) -> RandomSplits<'a> {
        RandomSplits {
            inner: Splitter {
                data: self.data,
                rng: StdRng::seed_from_u64(self.rng.gen()),
                max_attempts: self.max_attempts,
            },
            test_percent,
            remaining: repetitions,
        }
    }

    /// K-fold cross-validation: the data is shuffled once and partitioned
    /// into `k` contiguous folds whose sizes differ by at most one; fold `i`
    /// is the test set of split `i`.
    ///
    /// Folds are not rejection-sampled, so a fold may come out single-class;
    /// the caller's ROC handling deals with that per repetition.
    pub fn k_fold(&mut self, k: usize) -> Result<KFold> {
        let n = self.data.len();
        if k == 0 {
            return Err(Error::Config("k must be > 0".to_owned()));
        }
        if k > n {
            return Err(Error::Config(format!(
                "cannot build {k} folds from {n} patterns"
            )));
        }
        if k == n {
            log::warn!("k equals the pattern count; this is leave-one-out validation");
        }

        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut self.rng);

        Ok(KFold {
            data: self.data,
            indices,
            k,
            next: 0,
        })
    }

    /// Bootstrap resampling: a base random split fixes the train and test
    /// pools, and each of the `count` samples draws `sample_percent` percent
    /// of each pool with replacement.
    pub fn bootstrap(
        &mut self,
        sample_percent: f64,
        count: usize,
        test_percent: f64,
    ) -> Result<Bootstrap> {
        let base = self.random_split(test_percent)?;
        let train_count = (base.train.len() as f64 * sample_percent / 100.0).floor() as usize;
        let test_count = (base.test.len() as f64 * sample_percent / 100.0).floor() as usize;
        if train_count == 0 || test_count == 0 {
            return Err(Error::DegenerateSample(format!(
                "bootstrap percentage {sample_percent} selects zero patterns from a pool"
            )));
        }

        Ok(Bootstrap {
            base,
            rng: StdRng::seed_from_u64(self.rng.gen()),
            train_count,
            test_count,
            max_attempts: self.max_attempts,
            remaining: count,
        })
    }
}

/// See [`Splitter::repeated_random_splits`].
pub struct RandomSplits<'a> {
    inner: Splitter<'a>,
    test_percent: f64,
    remaining: usize,
}

impl Iterator for RandomSplits<'_> {
    type Item = Result<Split>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.inner.random_split(self.test_percent))
    }
}

/// See [`Splitter::k_fold`].
pub struct KFold<'a> {
    data: &'a Dataset,
    indices: Vec<usize>,
    k: usize,
    next: usize,
}

impl KFold<'_> {
    fn fold_bounds(&self, fold: usize) -> (usize, usize) {
        let n = self.indices.len();
        let small = n / self.k;
        // The first `extra` folds get the smaller size so the fold sizes
        // differ by at most one.
        let extra = self.k - n % self.k;
        if fold < extra {
            (small * fold, small)
        } else {
            (small * extra + (small + 1) * (fold - extra), small + 1)
        }
    }
}

impl Iterator for KFold<'_> {
    type Item = Result<Split>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.k {
            return None;
        }
        let (start, len) = self.fold_bounds(self.next);
        self.next += 1;

        let test_idx = &self.indices[start..start + len];
        let train_idx: Vec<usize> = self.indices[..start]
            .iter()
            .chain(&self.indices[start + len..])
            .copied()
            .collect();
        Some(Ok(Split {
            train: self.data.subset(&train_idx),
            test: self.data.subset(test_idx),
        }))
    }
}

/// See [`Splitter::bootstrap`].
pub struct Bootstrap {
    base: Split,
    rng: StdRng,
    train_count: usize,
    test_count: usize,
    max_attempts: usize,
    remaining: usize,
}

impl Bootstrap {
    fn draw(&mut self) -> Result<Split> {
        for _ in 0..self.max_attempts {
            let train_idx: Vec<usize> = (0..self.train_count)
                .map(|_| self.rng.gen_range(0..self.base.train.len()))
                .collect();
            let test_idx: Vec<usize> = (0..self.test_count)
                .map(|_| self.rng.gen_range(0..self.base.test.len()))
                .collect();
            let train = self.base.train.subset(&train_idx);
            let test = self.base.test.subset(&test_idx);
            if !train.single_class() && !test.single_class() {
                return Ok(Split { train, test });
            }
        }
        Err(Error::DegenerateSample(format!(
            "no bootstrap sample with both classes after {} attempts",
            self.max_attempts
        )))
    }
}

impl Iterator for Bootstrap {
    type Item = Result<Split>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.draw())
    }
}
