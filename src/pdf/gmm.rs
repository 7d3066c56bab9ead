//! # Gaussian mixture fitting collaborator
//!
//! The aggregation loop consumes mixture fitting through the [`MixtureFitter`]
//! trait: one call per object, taking that object's trial values, the grid
//! request, and the component count, and returning the fitted mixture together
//! with the density evaluated on the grid. The trait keeps the numeric routine
//! a black box — tests substitute stubs, and alternative fitters can be
//! plugged in without touching the pipeline.
//!
//! [`GaussianMixtureFitter`] is the default implementation: a seeded 1-D
//! expectation-maximization fit with quantile initialization, a variance
//! floor for degenerate inputs, and a relative log-likelihood convergence
//! test.
//!
//! ## Determinism
//!
//! For identical values, component count, and seed, the fit is bit-for-bit
//! reproducible: initialization uses a [`StdRng`] seeded by the caller, and
//! the EM loop itself is deterministic.
use itertools::izip;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::zpdf_errors::ZpdfError;

/// Smallest admissible component variance.
///
/// Keeps the density finite for degenerate rows (e.g., all trial values
/// equal); the corresponding sigma floor is `1e-6`.
pub const VARIANCE_FLOOR: f64 = 1e-12;

/// Grid request passed to the fitter: size and optional fixed bounds.
///
/// When a bound is `None`, the fitter derives it from the object's trial
/// values: `min(values) - 3σ` / `max(values) + 3σ` with σ the (floored)
/// sample standard deviation.
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    pub size: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Result of one per-object fit: the evaluation grid, the density on it, and
/// the K mixture parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MixturePdf {
    /// Ordered (non-decreasing) grid of G sample points.
    pub grid: Vec<f64>,
    /// Mixture density evaluated at each grid point.
    pub density: Vec<f64>,
    /// Component means, length K.
    pub mu: Vec<f64>,
    /// Component standard deviations, length K.
    pub sigma: Vec<f64>,
    /// Component weights, length K, summing to 1.
    pub weight: Vec<f64>,
}

/// Per-object mixture-fitting collaborator.
///
/// Implementations must be thread-safe: the aggregation step may fit objects
/// in parallel, each call receiving its own derived seed.
pub trait MixtureFitter: Send + Sync {
    /// Fit a K-component mixture to one object's trial values and evaluate
    /// its density on the requested grid.
    ///
    /// Arguments
    /// -----------------
    /// * `values`: the object's T raw trial predictions.
    /// * `grid`: grid size and optional fixed bounds.
    /// * `components`: number of Gaussian components K.
    /// * `seed`: RNG seed for this object (derived by the caller from the run
    ///   seed and the row index).
    ///
    /// Return
    /// ----------
    /// * The fitted [`MixturePdf`], or [`ZpdfError::GmmFitFailure`] when the
    ///   fit degenerates or fails to converge.
    fn fit_pdf(
        &self,
        values: &[f64],
        grid: &GridSpec,
        components: usize,
        seed: u64,
    ) -> Result<MixturePdf, ZpdfError>;
}

/// Default EM-based mixture fitter.
#[derive(Debug, Clone, Copy)]
pub struct GaussianMixtureFitter {
    /// EM iteration budget per object.
    pub max_iter: usize,
    /// Relative log-likelihood convergence tolerance.
    pub tol: f64,
}

impl Default for GaussianMixtureFitter {
    fn default() -> Self {
        GaussianMixtureFitter {
            max_iter: 200,
            tol: 1e-6,
        }
    }
}

impl GaussianMixtureFitter {
    /// Build a fitter from the pipeline parameters (`max_iter`, `tol`).
    pub fn from_params(params: &crate::pdf::PdfParams) -> Self {
        GaussianMixtureFitter {
            max_iter: params.max_iter,
            tol: params.tol,
        }
    }
}

impl MixtureFitter for GaussianMixtureFitter {
    fn fit_pdf(
        &self,
        values: &[f64],
        grid: &GridSpec,
        components: usize,
        seed: u64,
    ) -> Result<MixturePdf, ZpdfError> {
        let t = values.len();
        if t == 0 {
            return Err(ZpdfError::GmmFitFailure("empty trial vector".into()));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ZpdfError::GmmFitFailure(
                "non-finite trial value in input".into(),
            ));
        }
        let k = components;

        let mean = values.iter().sum::<f64>() / t as f64;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / t as f64;
        let std = var.max(VARIANCE_FLOOR).sqrt();

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        // Quantile initialization plus a seeded sub-sigma jitter so equal
        // quantiles do not start two components at the exact same mean.
        let mut rng = StdRng::seed_from_u64(seed);
        let mut mu: Vec<f64> = (0..k)
            .map(|j| {
                let q = (j as f64 + 0.5) / k as f64;
                let idx = ((q * (t as f64 - 1.0)).round() as usize).min(t - 1);
                sorted[idx] + (rng.random::<f64>() - 0.5) * 1e-6 * std
            })
            .collect();
        let mut sigma = vec![std; k];
        let mut weight = vec![1.0 / k as f64; k];

        let mut resp = vec![0.0; k];
        let mut prev_ll = f64::NEG_INFINITY;
        let mut converged = false;

        for _ in 0..self.max_iter {
            let mut nk = vec![0.0; k];
            let mut sum = vec![0.0; k];
            let mut sumsq = vec![0.0; k];
            let mut ll = 0.0;

            for &x in values {
                let mut total = 0.0;
                for j in 0..k {
                    resp[j] = weight[j] * normal_pdf(x, mu[j], sigma[j]);
                    total += resp[j];
                }
                if !total.is_finite() || total <= 0.0 {
                    return Err(ZpdfError::GmmFitFailure(
                        "vanishing responsibilities during EM".into(),
                    ));
                }
                ll += total.ln();
                for j in 0..k {
                    let r = resp[j] / total;
                    nk[j] += r;
                    sum[j] += r * x;
                    sumsq[j] += r * x * x;
                }
            }

            for (w, m, s, &n, &sx, &sxx) in
                izip!(&mut weight, &mut mu, &mut sigma, &nk, &sum, &sumsq)
            {
                *w = n / t as f64;
                // A starved component keeps its previous parameters; its
                // weight alone records the starvation.
                if n > 1e-12 {
                    *m = sx / n;
                    let v = (sxx / n - *m * *m).max(VARIANCE_FLOOR);
                    *s = v.sqrt();
                }
            }

            if (ll - prev_ll).abs() < self.tol * (1.0 + ll.abs()) {
                converged = true;
                break;
            }
            prev_ll = ll;
        }

        if !converged {
            return Err(ZpdfError::GmmFitFailure(format!(
                "EM did not converge within {} iterations",
                self.max_iter
            )));
        }

        let wsum: f64 = weight.iter().sum();
        if !wsum.is_finite() || wsum <= 0.0 {
            return Err(ZpdfError::GmmFitFailure(
                "degenerate mixture weights".into(),
            ));
        }
        for w in weight.iter_mut() {
            *w /= wsum;
        }
        if mu.iter().chain(&sigma).any(|v| !v.is_finite()) {
            return Err(ZpdfError::GmmFitFailure(
                "non-finite mixture parameters".into(),
            ));
        }

        let gmin = grid.min.unwrap_or(sorted[0] - 3.0 * std);
        let gmax = grid.max.unwrap_or(sorted[t - 1] + 3.0 * std);
        let grid_pts = linspace(gmin, gmax, grid.size);
        let density = grid_pts
            .iter()
            .map(|&x| {
                (0..k)
                    .map(|j| weight[j] * normal_pdf(x, mu[j], sigma[j]))
                    .sum()
            })
            .collect();

        Ok(MixturePdf {
            grid: grid_pts,
            density,
            mu,
            sigma,
            weight,
        })
    }
}

/// Gaussian density at `x` for mean `mu` and standard deviation `sigma`.
#[inline]
fn normal_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    (-0.5 * z * z).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt())
}

/// `size` evenly spaced points from `min` to `max` inclusive.
fn linspace(min: f64, max: f64, size: usize) -> Vec<f64> {
    if size == 1 {
        return vec![min];
    }
    let step = (max - min) / (size - 1) as f64;
    (0..size).map(|i| min + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn default_grid(size: usize) -> GridSpec {
        GridSpec {
            size,
            min: None,
            max: None,
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let values = [0.42, 0.45, 0.44, 0.41, 0.47, 0.43, 0.46];
        let fitter = GaussianMixtureFitter::default();
        let pdf = fitter.fit_pdf(&values, &default_grid(50), 2, 7).unwrap();

        assert_eq!(pdf.mu.len(), 2);
        assert_eq!(pdf.sigma.len(), 2);
        assert_eq!(pdf.weight.len(), 2);
        assert_abs_diff_eq!(pdf.weight.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_grid_is_non_decreasing_and_sized() {
        let values = [0.1, 0.3, 0.2, 0.25, 0.15];
        let fitter = GaussianMixtureFitter::default();
        let pdf = fitter.fit_pdf(&values, &default_grid(32), 2, 0).unwrap();

        assert_eq!(pdf.grid.len(), 32);
        assert_eq!(pdf.density.len(), 32);
        assert!(pdf.grid.windows(2).all(|w| w[0] <= w[1]));
        assert!(pdf.density.iter().all(|d| d.is_finite() && *d >= 0.0));
    }

    #[test]
    fn test_fixed_bounds_are_honored() {
        let values = [1.0, 1.1, 0.9, 1.05];
        let grid = GridSpec {
            size: 11,
            min: Some(0.0),
            max: Some(2.0),
        };
        let fitter = GaussianMixtureFitter::default();
        let pdf = fitter.fit_pdf(&values, &grid, 1, 0).unwrap();

        assert_abs_diff_eq!(pdf.grid[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pdf.grid[10], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_recovers_two_separated_clusters() {
        let values = [0.09, 0.10, 0.11, 0.10, 0.89, 0.90, 0.91, 0.90];
        let fitter = GaussianMixtureFitter::default();
        let pdf = fitter.fit_pdf(&values, &default_grid(64), 2, 3).unwrap();

        let mut mus = pdf.mu.clone();
        mus.sort_by(|a, b| a.total_cmp(b));
        assert_abs_diff_eq!(mus[0], 0.10, epsilon = 0.05);
        assert_abs_diff_eq!(mus[1], 0.90, epsilon = 0.05);
        assert_abs_diff_eq!(pdf.weight.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_all_equal_values() {
        // All-equal rows must not produce NaNs: the variance floor turns the
        // fit into a near-delta density.
        let values = [1.7; 6];
        let fitter = GaussianMixtureFitter::default();
        let pdf = fitter.fit_pdf(&values, &default_grid(16), 2, 0).unwrap();

        assert!(pdf.sigma.iter().all(|s| s.is_finite() && *s > 0.0));
        assert!(pdf.density.iter().all(|d| d.is_finite()));
        assert_abs_diff_eq!(pdf.weight.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
        assert!(pdf.grid.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let values = [0.2, 0.8, 0.5, 0.4, 0.6, 0.3];
        let fitter = GaussianMixtureFitter::default();
        let a = fitter.fit_pdf(&values, &default_grid(20), 2, 99).unwrap();
        let b = fitter.fit_pdf(&values, &default_grid(20), 2, 99).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_input_fails() {
        let fitter = GaussianMixtureFitter::default();
        assert!(matches!(
            fitter.fit_pdf(&[], &default_grid(10), 2, 0),
            Err(ZpdfError::GmmFitFailure(_))
        ));
    }

    #[test]
    fn test_non_finite_input_fails() {
        let fitter = GaussianMixtureFitter::default();
        assert!(matches!(
            fitter.fit_pdf(&[0.1, f64::NAN], &default_grid(10), 2, 0),
            Err(ZpdfError::GmmFitFailure(_))
        ));
    }
}
