//! Response profiles and variable importance for a trained network.
//!
//! The training data is standardized, so a probe value for one variable is
//! expressed in standard-deviation units while the report axis shows the
//! real-world range. A [`Profiler`] precomputes both grids per variable;
//! an [`Analyzer`] drives a trained network over them.

use serde::{Deserialize, Serialize};

use crate::{Dataset, Error, Network, Result};

/// Summary statistics of one input variable over the training data, in both
/// real and standardized units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VarStats {
    pub mean: f64,
    pub stdev: f64,
    pub real_max: f64,
    pub real_min: f64,
    pub std_max: f64,
    pub std_min: f64,
}

/// Per-variable probe grids at a fixed resolution.
#[derive(Debug, Clone)]
pub struct Profiler {
    order: Vec<String>,
    /// `std_grid[v][step]`, `resolution + 1` steps from min to max.
    std_grid: Vec<Vec<f64>>,
    real_grid: Vec<Vec<f64>>,
    resolution: usize,
}

impl Profiler {
    /// Build grids for the variables in network-input order.
    pub fn new(variables: &[(String, VarStats)], resolution: usize) -> Result<Self> {
        if variables.is_empty() {
            return Err(Error::Config("no variables to profile".to_owned()));
        }
        if resolution == 0 {
            return Err(Error::Config("profile resolution must be > 0".to_owned()));
        }

        let grid = |min: f64, max: f64| -> Vec<f64> {
            (0..=resolution)
                .map(|x| x as f64 * (max - min) / resolution as f64 + min)
                .collect()
        };

        let mut order = Vec::with_capacity(variables.len());
        let mut std_grid = Vec::with_capacity(variables.len());
        let mut real_grid = Vec::with_capacity(variables.len());
        for (name, stats) in variables {
            order.push(name.clone());
            std_grid.push(grid(stats.std_min, stats.std_max));
            real_grid.push(grid(stats.real_min, stats.real_max));
        }

        Ok(Self {
            order,
            std_grid,
            real_grid,
            resolution,
        })
    }

    #[inline]
    pub fn variables(&self) -> &[String] {
        &self.order
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Real-unit axis for plotting `var`'s profile.
    pub fn real_axis(&self, var: &str) -> Result<&[f64]> {
        Ok(&self.real_grid[self.index_of(var)?])
    }

    fn index_of(&self, var: &str) -> Result<usize> {
        self.order
            .iter()
            .position(|name| name == var)
            .ok_or_else(|| Error::Config(format!("unknown variable '{var}'")))
    }
}

/// Drives a trained network over a [`Profiler`]'s grids.
pub struct Analyzer<'a> {
    net: &'a mut Network,
    profiler: &'a Profiler,
}

impl<'a> Analyzer<'a> {
    pub fn new(net: &'a mut Network, profiler: &'a Profiler) -> Result<Self> {
        if profiler.order.len() != net.input_dim() {
            return Err(Error::Config(format!(
                "{} profiled variables but the network has {} inputs",
                profiler.order.len(),
                net.input_dim()
            )));
        }
        Ok(Self { net, profiler })
    }

    /// Response of the first output to `var` swept over its grid, with every
    /// other variable held at its standardized mean (zero).
    pub fn profile(&mut self, var: &str) -> Result<Vec<f64>> {
        let v = self.profiler.index_of(var)?;
        let mut input = vec![0.0; self.net.input_dim()];
        let mut out = Vec::with_capacity(self.profiler.resolution + 1);
        for step in 0..=self.profiler.resolution {
            input[v] = self.profiler.std_grid[v][step];
            out.push(self.net.evaluate(&input)[0]);
        }
        Ok(out)
    }

    /// Response surface of `var` against the joint level of all other
    /// variables. Row 0 holds the others at their grid maximum and the last
    /// row at their minimum; within a row `var` sweeps its own grid.
    pub fn variation_surface(&mut self, var: &str) -> Result<Vec<Vec<f64>>> {
        let v = self.profiler.index_of(var)?;
        let r = self.profiler.resolution;
        let mut input = vec![0.0; self.net.input_dim()];
        let mut surface = Vec::with_capacity(r + 1);
        for row in (0..=r).rev() {
            for (i, slot) in input.iter_mut().enumerate() {
                if i != v {
                    *slot = self.profiler.std_grid[i][row];
                }
            }
            let mut line = Vec::with_capacity(r + 1);
            for step in 0..=r {
                input[v] = self.profiler.std_grid[v][step];
                line.push(self.net.evaluate(&input)[0]);
            }
            surface.push(line);
        }
        Ok(surface)
    }

    /// Response grid of `a` (rows) against `b` (columns), with every other
    /// variable held at zero. Row 0 holds `a` at its grid maximum, matching
    /// the orientation of [`Analyzer::variation_surface`].
    pub fn two_way_profile(&mut self, a: &str, b: &str) -> Result<Vec<Vec<f64>>> {
        let va = self.profiler.index_of(a)?;
        let vb = self.profiler.index_of(b)?;
        if va == vb {
            return Err(Error::Config(format!(
                "two-way profile needs two distinct variables, got '{a}' twice"
            )));
        }
        let r = self.profiler.resolution;
        let mut input = vec![0.0; self.net.input_dim()];
        let mut grid = Vec::with_capacity(r + 1);
        for row in (0..=r).rev() {
            input[va] = self.profiler.std_grid[va][row];
            let mut line = Vec::with_capacity(r + 1);
            for col in 0..=r {
                input[vb] = self.profiler.std_grid[vb][col];
                line.push(self.net.evaluate(&input)[0]);
            }
            grid.push(line);
        }
        Ok(grid)
    }

    /// Full per-model sensitivity report: one profile and variation surface
    /// per variable plus importance scores over `data`.
    pub fn report(&mut self, data: &Dataset) -> Result<SensitivityReport> {
        let variables = self.profiler.order.clone();
        let mut profiles = Vec::with_capacity(variables.len());
        let mut surfaces = Vec::with_capacity(variables.len());
        for var in &variables {
            profiles.push(self.profile(var)?);
            surfaces.push(self.variation_surface(var)?);
        }
        let importance = importance(self.net, data);
        Ok(SensitivityReport {
            variables,
            profiles,
            surfaces,
            importance,
        })
    }
}

/// Importance score per input variable: the sum over all patterns and
/// outputs of the squared partial derivative of the output with respect to
/// that input. Larger means the variable moves the prediction more.
pub fn importance(net: &mut Network, data: &Dataset) -> Vec<f64> {
    let mut scores = vec![0.0; net.input_dim()];
    for idx in 0..data.len() {
        let pd = net.partial_derivatives(data.input(idx));
        for row in &pd {
            for (score, &d) in scores.iter_mut().zip(row) {
                *score += d * d;
            }
        }
    }
    scores
}

/// Sensitivity output for one retained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub variables: Vec<String>,
    /// `profiles[v][step]`, indexed like [`Profiler::variables`].
    pub profiles: Vec<Vec<f64>>,
    /// `surfaces[v][row][step]`.
    pub surfaces: Vec<Vec<Vec<f64>>>,
    pub importance: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stats(real_min: f64, real_max: f64) -> VarStats {
        VarStats {
            mean: (real_min + real_max) / 2.0,
            stdev: 1.0,
            real_max,
            real_min,
            std_max: 2.0,
            std_min: -2.0,
        }
    }

    fn profiler_for(names: &[&str], resolution: usize) -> Profiler {
        let vars: Vec<(String, VarStats)> = names
            .iter()
            .map(|n| (n.to_string(), stats(0.0, 10.0)))
            .collect();
        Profiler::new(&vars, resolution).unwrap()
    }

    #[test]
    fn grids_span_min_to_max() {
        let profiler = profiler_for(&["temp"], 4);
        let axis = profiler.real_axis("temp").unwrap();
        assert_eq!(axis.len(), 5);
        assert_eq!(axis[0], 0.0);
        assert_eq!(axis[4], 10.0);
        assert!((axis[2] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_variable_is_config_error() {
        let profiler = profiler_for(&["temp"], 4);
        assert!(profiler.real_axis("rain").is_err());
    }

    #[test]
    fn analyzer_checks_variable_count() {
        let mut net = Network::new(&[3, 4, 1]).unwrap();
        let profiler = profiler_for(&["a", "b"], 4);
        assert!(Analyzer::new(&mut net, &profiler).is_err());
    }

    #[test]
    fn profile_and_surface_shapes() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut net = Network::new(&[2, 3, 1]).unwrap();
        net.randomize_weights(&mut rng);
        let profiler = profiler_for(&["a", "b"], 6);
        let mut analyzer = Analyzer::new(&mut net, &profiler).unwrap();

        let profile = analyzer.profile("a").unwrap();
        assert_eq!(profile.len(), 7);

        let surface = analyzer.variation_surface("b").unwrap();
        assert_eq!(surface.len(), 7);
        assert!(surface.iter().all(|row| row.len() == 7));

        let grid = analyzer.two_way_profile("a", "b").unwrap();
        assert_eq!(grid.len(), 7);
        assert!(analyzer.two_way_profile("a", "a").is_err());
    }

    #[test]
    fn two_way_profile_rows_descend_the_first_variable() {
        // Output rises monotonically with `a` and ignores `b`, so the top
        // row (a at its maximum) must sit above the bottom row.
        let mut net = Network::new(&[2, 1, 1]).unwrap();
        net.weights_mut(0).copy_from_slice(&[1.0, 0.0, 0.0]);
        net.weights_mut(1).copy_from_slice(&[1.0, 0.0]);
        let profiler = profiler_for(&["a", "b"], 4);
        let mut analyzer = Analyzer::new(&mut net, &profiler).unwrap();

        let grid = analyzer.two_way_profile("a", "b").unwrap();
        assert_eq!(grid.len(), 5);
        assert!(grid[0][0] > grid[4][0]);
    }

    #[test]
    fn report_covers_every_variable() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut net = Network::new(&[2, 3, 1]).unwrap();
        net.randomize_weights(&mut rng);
        let profiler = profiler_for(&["a", "b"], 5);
        let data = Dataset::from_rows(
            &[vec![0.1, 0.2], vec![-0.3, 0.4], vec![0.5, -0.6]],
            &[vec![1.0], vec![0.0], vec![1.0]],
        )
        .unwrap();

        let report = Analyzer::new(&mut net, &profiler)
            .unwrap()
            .report(&data)
            .unwrap();
        assert_eq!(report.variables, vec!["a", "b"]);
        assert_eq!(report.profiles.len(), 2);
        assert_eq!(report.surfaces.len(), 2);
        assert_eq!(report.importance.len(), 2);
    }

    #[test]
    fn importance_ranks_the_live_input_first() {
        // Wire output strongly to input 0 and not at all to input 1.
        let mut net = Network::new(&[2, 2, 1]).unwrap();
        // Hidden rows: [w_in0, w_in1, bias].
        net.weights_mut(0).copy_from_slice(&[2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        net.weights_mut(1).copy_from_slice(&[1.5, 1.5, 0.0]);

        let data = Dataset::from_rows(
            &[vec![0.2, 0.9], vec![-0.7, -0.1], vec![0.4, 0.5]],
            &[vec![1.0], vec![0.0], vec![1.0]],
        )
        .unwrap();
        let scores = importance(&mut net, &data);
        assert!(scores[0] > scores[1]);
        assert!(scores[1].abs() < 1e-12);
    }
}
