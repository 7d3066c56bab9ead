//! # PDF extraction parameters
//!
//! This module defines the [`PdfParams`] configuration struct and its builder,
//! which control the redshift grid, the Gaussian mixture fit, and the optional
//! output sink of the extraction pipeline.
//!
//! ## Purpose
//!
//! [`PdfParams`] centralizes all tunable parameters consumed by
//! [`extract_pdf`](crate::pdf::extract::extract_pdf):
//!
//! - the PDF grid (`grid_size`, optional `grid_min`/`grid_max` bounds),
//! - the mixture model (`gmm_components`, EM `max_iter`/`tol` budget),
//! - reproducibility (`seed` — each object's fit derives its RNG from it),
//! - the `skip_gmm` switch (populate trial values only, leave the PDF and
//!   mixture columns at their documented all-zero default),
//! - the optional Parquet `output` path.
//!
//! ## Example
//!
//! ```rust
//! use zpdf::PdfParams;
//!
//! let params = PdfParams::builder()
//!     .grid_size(200)
//!     .grid_min(0.0)
//!     .grid_max(6.0)
//!     .gmm_components(3)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//! assert_eq!(params.grid_size, 200);
//! ```
//!
//! ## See also
//!
//! * [`extract_pdf`](crate::pdf::extract::extract_pdf) – main pipeline entry point.
//! * [`RecordSchema`](crate::pdf::schema::RecordSchema) – fixed-width layout built from (T, G, K).
//! * [`GaussianMixtureFitter`](crate::pdf::gmm::GaussianMixtureFitter) – default mixture collaborator.
use std::cmp::Ordering::{Equal, Greater, Less};

use camino::Utf8PathBuf;

use crate::zpdf_errors::ZpdfError;

pub mod extract;
pub mod gmm;
pub mod schema;
pub mod table;

/// Configuration parameters for the PDF extraction pipeline.
///
/// Fields
/// -----------------
/// **Grid**
/// * `grid_size` – number of sample points G of the per-object redshift grid.
/// * `grid_min`, `grid_max` – optional fixed grid bounds; when absent the grid
///   spans each object's trial values widened by three sample standard
///   deviations.
///
/// **Mixture fit**
/// * `gmm_components` – number of Gaussian components K.
/// * `skip_gmm` – when `true`, the mixture collaborator is never invoked and
///   all PDF/mixture columns stay at the documented zero default.
/// * `seed` – base RNG seed; object `i` fits with a seed derived from
///   `(seed, i)` so sequential and parallel runs produce identical results.
/// * `max_iter` – EM iteration budget per object.
/// * `tol` – relative log-likelihood convergence tolerance.
///
/// **Sink**
/// * `output` – optional Parquet output path; the write is atomic and a
///   failure never alters the returned in-memory table.
#[derive(Debug, Clone)]
pub struct PdfParams {
    pub grid_size: usize,
    pub grid_min: Option<f64>,
    pub grid_max: Option<f64>,
    pub gmm_components: usize,
    pub skip_gmm: bool,
    pub seed: u64,
    pub max_iter: usize,
    pub tol: f64,
    pub output: Option<Utf8PathBuf>,
}

impl PdfParams {
    /// Construct a new [`PdfParams`] with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a [`PdfParamsBuilder`] to override defaults step by step.
    pub fn builder() -> PdfParamsBuilder {
        PdfParamsBuilder::new()
    }
}

impl Default for PdfParams {
    fn default() -> Self {
        PdfParams {
            grid_size: 100,
            grid_min: None,
            grid_max: None,
            gmm_components: 2,
            skip_gmm: false,
            seed: 0,
            max_iter: 200,
            tol: 1e-6,
            output: None,
        }
    }
}

/// Builder for [`PdfParams`], with validation.
#[derive(Debug, Clone)]
pub struct PdfParamsBuilder {
    params: PdfParams,
}

impl Default for PdfParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfParamsBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            params: PdfParams::default(),
        }
    }

    pub fn grid_size(mut self, v: usize) -> Self {
        self.params.grid_size = v;
        self
    }
    pub fn grid_min(mut self, v: f64) -> Self {
        self.params.grid_min = Some(v);
        self
    }
    pub fn grid_max(mut self, v: f64) -> Self {
        self.params.grid_max = Some(v);
        self
    }
    pub fn gmm_components(mut self, v: usize) -> Self {
        self.params.gmm_components = v;
        self
    }
    pub fn skip_gmm(mut self, v: bool) -> Self {
        self.params.skip_gmm = v;
        self
    }
    pub fn seed(mut self, v: u64) -> Self {
        self.params.seed = v;
        self
    }
    pub fn max_iter(mut self, v: usize) -> Self {
        self.params.max_iter = v;
        self
    }
    pub fn tol(mut self, v: f64) -> Self {
        self.params.tol = v;
        self
    }
    pub fn output(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.params.output = Some(v.into());
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff a <= b and comparable (i.e., not NaN).
    #[inline]
    fn le(a: f64, b: f64) -> bool {
        matches!(a.partial_cmp(&b), Some(Less) | Some(Equal))
    }

    /// Finalize the builder and produce a [`PdfParams`] instance.
    ///
    /// Validation rules
    /// -----------------
    /// * `grid_size >= 1` – the grid must contain at least one sample point.
    /// * `gmm_components >= 1` – at least one Gaussian component.
    /// * `max_iter >= 1` – the EM loop must be allowed at least one pass.
    /// * `tol > 0.0` – the convergence tolerance must be strictly positive.
    /// * `grid_min <= grid_max` when both bounds are given.
    ///
    /// Return
    /// ----------
    /// * `Ok(PdfParams)` when all values are valid.
    /// * `Err(ZpdfError::InvalidPdfParameter)` when any rule fails — the
    ///   pipeline then aborts before any work.
    pub fn build(self) -> Result<PdfParams, ZpdfError> {
        let p = &self.params;

        if p.grid_size == 0 {
            return Err(ZpdfError::InvalidPdfParameter(
                "grid_size must be >= 1".into(),
            ));
        }
        if p.gmm_components == 0 {
            return Err(ZpdfError::InvalidPdfParameter(
                "gmm_components must be >= 1".into(),
            ));
        }
        if p.max_iter == 0 {
            return Err(ZpdfError::InvalidPdfParameter(
                "max_iter must be >= 1".into(),
            ));
        }
        if !Self::gt0(p.tol) {
            return Err(ZpdfError::InvalidPdfParameter(
                "tol must be strictly positive".into(),
            ));
        }
        if let (Some(min), Some(max)) = (p.grid_min, p.grid_max) {
            if !Self::le(min, max) {
                return Err(ZpdfError::InvalidPdfParameter(format!(
                    "grid_min ({min}) must not exceed grid_max ({max})"
                )));
            }
        }

        Ok(self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build() {
        let params = PdfParams::builder().build().unwrap();
        assert_eq!(params.grid_size, 100);
        assert_eq!(params.gmm_components, 2);
        assert!(!params.skip_gmm);
        assert!(params.output.is_none());
    }

    #[test]
    fn test_rejects_degenerate_parameters() {
        assert!(matches!(
            PdfParams::builder().grid_size(0).build(),
            Err(ZpdfError::InvalidPdfParameter(_))
        ));
        assert!(matches!(
            PdfParams::builder().gmm_components(0).build(),
            Err(ZpdfError::InvalidPdfParameter(_))
        ));
        assert!(matches!(
            PdfParams::builder().tol(0.0).build(),
            Err(ZpdfError::InvalidPdfParameter(_))
        ));
        assert!(matches!(
            PdfParams::builder().tol(f64::NAN).build(),
            Err(ZpdfError::InvalidPdfParameter(_))
        ));
        assert!(matches!(
            PdfParams::builder().max_iter(0).build(),
            Err(ZpdfError::InvalidPdfParameter(_))
        ));
        assert!(matches!(
            PdfParams::builder().grid_min(2.0).grid_max(1.0).build(),
            Err(ZpdfError::InvalidPdfParameter(_))
        ));
    }

    #[test]
    fn test_accepts_equal_bounds() {
        // A single-point support is legal; the grid collapses onto it.
        let params = PdfParams::builder().grid_min(1.5).grid_max(1.5).build();
        assert!(params.is_ok());
    }
}
