//! ROC analysis of a scored pattern set.
//!
//! Builds the ROC curve by sweeping the decision threshold over the sorted
//! scores, emitting one point per distinct score value, and integrates the
//! area under the curve with the trapezoid rule. Labels are the raw target
//! values: exactly `1.0` is a positive, exactly `0.0` a negative.

use crate::{Error, Result};

/// Cumulative classification counts for one scored label set.
#[derive(Debug, Clone)]
pub struct Roc {
    positives: usize,
    negatives: usize,
    /// Raw `(false_positives, true_positives)` counts per threshold.
    points: Vec<(f64, f64)>,
}

impl Roc {
    /// Score a label/score pairing. Fails with [`Error::DegenerateLabels`]
    /// when only one class is present.
    pub fn new(labels: &[f64], scores: &[f64]) -> Result<Self> {
        if labels.len() != scores.len() {
            return Err(Error::Config(format!(
                "labels/scores length mismatch: {} vs {}",
                labels.len(),
                scores.len()
            )));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(Error::Config("scores must be finite".to_owned()));
        }
        let positives = labels.iter().filter(|&&l| l == 1.0).count();
        let negatives = labels.iter().filter(|&&l| l == 0.0).count();
        if positives == 0 || negatives == 0 {
            return Err(Error::DegenerateLabels);
        }

        let mut order: Vec<usize> = (0..labels.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let mut points = Vec::new();
        let mut tp = 0.0;
        let mut fp = 0.0;
        let mut prev = f64::NAN;
        for &idx in &order {
            // NAN compares unequal to everything, so the first score always
            // opens a new threshold.
            if scores[idx] != prev {
                points.push((fp, tp));
                prev = scores[idx];
            }
            if labels[idx] == 1.0 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
        }
        points.push((fp, tp));

        Ok(Self {
            positives,
            negatives,
            points,
        })
    }

    #[inline]
    pub fn positives(&self) -> usize {
        self.positives
    }

    #[inline]
    pub fn negatives(&self) -> usize {
        self.negatives
    }

    /// ROC points as `(false_positive_rate, true_positive_rate)`, from
    /// `(0, 0)` to `(1, 1)`.
    pub fn roc_points(&self) -> Vec<(f64, f64)> {
        let n = self.negatives as f64;
        let p = self.positives as f64;
        self.points
            .iter()
            .map(|&(fp, tp)| (fp / n, tp / p))
            .collect()
    }

    /// Precision/recall points as `(precision, recall)`. Before any pattern
    /// is classified positive, precision is taken as `1.0`.
    pub fn precision_recall(&self) -> Vec<(f64, f64)> {
        let p = self.positives as f64;
        self.points
            .iter()
            .map(|&(fp, tp)| {
                let precision = if tp + fp == 0.0 { 1.0 } else { tp / (tp + fp) };
                (precision, tp / p)
            })
            .collect()
    }

    /// Area under this ROC curve.
    pub fn auc_roc(&self) -> f64 {
        auc(&self.roc_points())
    }
}

/// Trapezoid-rule area under a curve given as `(x, y)` points.
///
/// ROC curves start at `(0, 0)` and precision/recall curves at `(1, 0)`;
/// when the first point sits above the diagonal the axes are treated as
/// swapped, so both point orderings integrate over the recall-like axis.
pub fn auc(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let swap = points[0].0 > points[0].1;

    let mut area = 0.0;
    for pair in points.windows(2) {
        let (x0, y0) = if swap { (pair[0].1, pair[0].0) } else { pair[0] };
        let (x1, y1) = if swap { (pair[1].1, pair[1].0) } else { pair[1] };
        area += (x1 - x0).abs() * (y0 + y1) / 2.0;
    }
    area
}
