//! Pattern storage.
//!
//! A [`Dataset`] holds the standardized covariate vectors, the target labels
//! (binary presence/absence, or abundance), and the pixel coordinate each
//! pattern was extracted from. Storage is contiguous row-major so the
//! per-pattern hot path works on slices.
//!
//! Datasets are immutable once built; the resampling policies in
//! [`crate::split`] derive new datasets through [`Dataset::subset`].

use crate::{Error, Result};

/// A labeled pattern set with parallel pixel metadata.
///
/// Layout:
/// - `inputs.len() == len * input_dim`
/// - `targets.len() == len * target_dim`
/// - `coords.len() == len`
#[derive(Debug, Clone)]
pub struct Dataset {
    inputs: Vec<f64>,
    targets: Vec<f64>,
    coords: Vec<(usize, usize)>,
    len: usize,
    input_dim: usize,
    target_dim: usize,
}

impl Dataset {
    /// Build a dataset from flat row-major buffers. Coordinates default to
    /// `(0, 0)`; use [`Dataset::with_coords`] to attach real pixel positions.
    pub fn from_flat(
        inputs: Vec<f64>,
        targets: Vec<f64>,
        input_dim: usize,
        target_dim: usize,
    ) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::Config("input_dim must be > 0".to_owned()));
        }
        if target_dim == 0 {
            return Err(Error::Config("target_dim must be > 0".to_owned()));
        }
        if inputs.is_empty() {
            return Err(Error::Config("dataset must not be empty".to_owned()));
        }
        if inputs.len() % input_dim != 0 {
            return Err(Error::Config(format!(
                "inputs length {} is not divisible by input_dim {}",
                inputs.len(),
                input_dim
            )));
        }
        let len = inputs.len() / input_dim;
        if targets.len() != len * target_dim {
            return Err(Error::Config(format!(
                "targets length {} does not match len * target_dim ({len} * {target_dim})",
                targets.len()
            )));
        }

        Ok(Self {
            inputs,
            targets,
            coords: vec![(0, 0); len],
            len,
            input_dim,
            target_dim,
        })
    }

    /// Build a dataset from per-pattern rows (copies into contiguous storage).
    pub fn from_rows(inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::Config("dataset must not be empty".to_owned()));
        }
        if inputs.len() != targets.len() {
            return Err(Error::Config(format!(
                "inputs/targets length mismatch: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }

        let input_dim = inputs[0].len();
        let target_dim = targets[0].len();
        for (i, row) in inputs.iter().enumerate() {
            if row.len() != input_dim {
                return Err(Error::Config(format!(
                    "input row {i} has len {}, expected {input_dim}",
                    row.len()
                )));
            }
        }
        for (i, row) in targets.iter().enumerate() {
            if row.len() != target_dim {
                return Err(Error::Config(format!(
                    "target row {i} has len {}, expected {target_dim}",
                    row.len()
                )));
            }
        }

        let mut inputs_flat = Vec::with_capacity(inputs.len() * input_dim);
        for row in inputs {
            inputs_flat.extend_from_slice(row);
        }
        let mut targets_flat = Vec::with_capacity(targets.len() * target_dim);
        for row in targets {
            targets_flat.extend_from_slice(row);
        }

        Self::from_flat(inputs_flat, targets_flat, input_dim, target_dim)
    }

    /// Attach pixel coordinates (one per pattern, same order).
    pub fn with_coords(mut self, coords: Vec<(usize, usize)>) -> Result<Self> {
        if coords.len() != self.len {
            return Err(Error::Config(format!(
                "coords length {} does not match pattern count {}",
                coords.len(),
                self.len
            )));
        }
        self.coords = coords;
        Ok(self)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn target_dim(&self) -> usize {
        self.target_dim
    }

    /// The `idx`-th covariate row. Panics if `idx >= len`.
    #[inline]
    pub fn input(&self, idx: usize) -> &[f64] {
        let start = idx * self.input_dim;
        &self.inputs[start..start + self.input_dim]
    }

    /// The `idx`-th target row. Panics if `idx >= len`.
    #[inline]
    pub fn target(&self, idx: usize) -> &[f64] {
        let start = idx * self.target_dim;
        &self.targets[start..start + self.target_dim]
    }

    #[inline]
    pub fn coord(&self, idx: usize) -> (usize, usize) {
        self.coords[idx]
    }

    /// Flat view of all targets; for the usual single-output case this is the
    /// label sequence fed to the ROC evaluator.
    #[inline]
    pub fn targets_flat(&self) -> &[f64] {
        &self.targets
    }

    /// True when every target row is identical (one class only). Splits where
    /// either side satisfies this are degenerate.
    pub fn single_class(&self) -> bool {
        (1..self.len).all(|i| self.target(i) == self.target(0))
    }

    /// New dataset from the selected pattern indices, coordinates included.
    /// Indices may repeat, which is how bootstrap resampling draws with
    /// replacement.
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        let mut inputs = Vec::with_capacity(indices.len() * self.input_dim);
        let mut targets = Vec::with_capacity(indices.len() * self.target_dim);
        let mut coords = Vec::with_capacity(indices.len());
        for &idx in indices {
            inputs.extend_from_slice(self.input(idx));
            targets.extend_from_slice(self.target(idx));
            coords.push(self.coords[idx]);
        }
        Dataset {
            inputs,
            targets,
            coords,
            len: indices.len(),
            input_dim: self.input_dim,
            target_dim: self.target_dim,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flat_validates_shapes() {
        assert!(Dataset::from_flat(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0], 2, 1).is_ok());
        assert!(Dataset::from_flat(vec![0.0, 1.0, 2.0], vec![0.0], 2, 1).is_err());
        assert!(Dataset::from_flat(vec![0.0, 1.0], vec![0.0], 2, 0).is_err());
        assert!(Dataset::from_flat(vec![], vec![], 2, 1).is_err());
    }

    #[test]
    fn subset_carries_coordinates_and_repeats() {
        let data = Dataset::from_rows(
            &[vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0]],
            &[vec![0.0], vec![1.0], vec![1.0]],
        )
        .unwrap()
        .with_coords(vec![(0, 0), (5, 7), (9, 2)])
        .unwrap();

        let sub = data.subset(&[2, 1, 1]);
        assert_eq!(sub.len(), 3);
        assert_eq!(sub.input(0), &[2.0, 2.0]);
        assert_eq!(sub.coord(0), (9, 2));
        assert_eq!(sub.coord(1), (5, 7));
        assert_eq!(sub.coord(2), (5, 7));
    }

    #[test]
    fn single_class_detection() {
        let one_class =
            Dataset::from_rows(&[vec![0.0], vec![1.0]], &[vec![1.0], vec![1.0]]).unwrap();
        assert!(one_class.single_class());

        let two_class =
            Dataset::from_rows(&[vec![0.0], vec![1.0]], &[vec![0.0], vec![1.0]]).unwrap();
        assert!(!two_class.single_class());
    }
}
