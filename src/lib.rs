//! # zpdf: photometric-redshift PDF extraction
//!
//! This crate turns the individual trial predictions of an **ensemble regression
//! model** into per-object photometric-redshift probability density functions:
//!
//! 1. **Collect** the N×T matrix of per-estimator predictions from the model
//!    ([`collect_trial_predictions`](crate::models::collect_trial_predictions)).
//! 2. **Build** the fixed-width record layout from the run parameters
//!    ([`RecordSchema`](crate::pdf::schema::RecordSchema)).
//! 3. **Aggregate**: for each object, fit a Gaussian mixture to its trial values
//!    and evaluate the density on a redshift grid
//!    ([`extract_pdf`](crate::pdf::extract::extract_pdf)).
//! 4. **Assemble** the per-object records into a [`PdfTable`](crate::pdf::table::PdfTable)
//!    and optionally persist it as a Parquet file ([`io`](crate::io)).
//!
//! Models that do not expose ensemble members are **soft-skipped**: the pipeline
//! returns `Ok(None)` with no side effects rather than an error.
//!
//! ```rust,no_run
//! use zpdf::{extract_pdf, Dataset, GaussianMixtureFitter, PdfParams};
//! # fn demo(model: &impl zpdf::RegressionModel, dataset: &Dataset) -> Result<(), zpdf::ZpdfError> {
//! let params = PdfParams::builder()
//!     .grid_size(100)
//!     .gmm_components(2)
//!     .seed(42)
//!     .build()?;
//! let fitter = GaussianMixtureFitter::from_params(&params);
//!
//! match extract_pdf(model, dataset, None, &fitter, &params)? {
//!     Some(extraction) => println!("{} objects", extraction.table.len()),
//!     None => println!("model has no ensemble members, nothing produced"),
//! }
//! # Ok(()) }
//! ```

pub mod constants;
pub mod dataset;
pub mod io;
pub mod models;
pub mod pdf;
pub mod zpdf_errors;

pub use crate::constants::{PredictionVector, Redshift, RowId, TrialMatrix};
pub use crate::dataset::Dataset;
pub use crate::models::{
    collect_trial_predictions, EnsembleCapable, RegressionModel, TrialPredictions,
};
pub use crate::pdf::extract::{extract_pdf, extract_pdf_with_cancel, PdfExtraction};
pub use crate::pdf::gmm::{GaussianMixtureFitter, GridSpec, MixtureFitter, MixturePdf};
pub use crate::pdf::schema::RecordSchema;
pub use crate::pdf::table::{PdfRecord, PdfTable};
pub use crate::pdf::{PdfParams, PdfParamsBuilder};
pub use crate::zpdf_errors::ZpdfError;
