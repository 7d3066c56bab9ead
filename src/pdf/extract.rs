//! # Batch PDF extraction over a dataset
//!
//! Drive the full pipeline: collect the N×T trial matrix from the model,
//! build the fixed record layout, fit each object's mixture independently,
//! assemble the [`PdfTable`], and optionally persist it.
//!
//! ## Result model
//!
//! The pipeline reports everything as values inside [`PdfExtraction`]:
//!
//! * `table` – the assembled in-memory table, always present on success,
//! * `failed_rows` – objects whose mixture fit failed; those rows keep the
//!   documented all-zero PDF fields and never affect other rows,
//! * `sink_error` – a persistence failure, surfaced without discarding the
//!   table.
//!
//! A model without ensemble members short-circuits the whole call to
//! `Ok(None)`: no records, no output file, no side effects.
//!
//! ## Execution modes
//!
//! * Default: one sequential pass over the rows.
//! * `parallel` feature: rows are partitioned across the rayon pool and
//!   joined in dataset order. Each row derives its RNG seed from the run seed
//!   and its index, so both modes produce identical output.
//! * `progress` feature: the sequential pass renders an `indicatif` bar.
//! * [`extract_pdf_with_cancel`] polls a cooperative cancellation closure on
//!   a wall-clock interval **between** rows (never mid-fit) and returns the
//!   rows completed so far.
//!
//! ## Example
//!
//! ```rust,no_run
//! use zpdf::{extract_pdf, Dataset, GaussianMixtureFitter, PdfParams};
//! # fn demo(model: &impl zpdf::RegressionModel, dataset: &Dataset) -> Result<(), zpdf::ZpdfError> {
//! let params = PdfParams::builder().gmm_components(2).seed(1).build()?;
//! let fitter = GaussianMixtureFitter::from_params(&params);
//! if let Some(extraction) = extract_pdf(model, dataset, None, &fitter, &params)? {
//!     for (row, err) in &extraction.failed_rows {
//!         eprintln!("row {row}: {err}");
//!     }
//! }
//! # Ok(()) }
//! ```
use std::time::{Duration, Instant};

#[cfg(all(feature = "progress", not(feature = "parallel")))]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::dataset::Dataset;
use crate::models::{collect_trial_predictions, RegressionModel, TrialPredictions};
use crate::pdf::gmm::{GridSpec, MixtureFitter};
use crate::pdf::schema::RecordSchema;
use crate::pdf::table::{PdfRecord, PdfTable};
use crate::pdf::PdfParams;
use crate::zpdf_errors::ZpdfError;

/// Wall-clock interval between cooperative cancellation polls.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Seed-mixing constant for per-row RNG derivation (splitmix64 increment).
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Outcome of one extraction run.
///
/// Errors are carried as values: per-row fit failures and the optional sink
/// failure never invalidate the assembled table.
#[derive(Debug)]
pub struct PdfExtraction {
    /// The assembled in-memory table (one record per object, dataset order).
    pub table: PdfTable,
    /// Rows whose mixture fit failed, with the cause. Those rows keep the
    /// zero defaults in all PDF and mixture columns.
    pub failed_rows: Vec<(usize, ZpdfError)>,
    /// Persistence failure, if an output path was requested and the write
    /// failed. The table above is intact regardless.
    pub sink_error: Option<ZpdfError>,
}

/// Compute the per-object PDF table for a dataset.
///
/// Control flow: collect → build schema → aggregate per object → assemble →
/// optional persist → return.
///
/// Arguments
/// -----------------
/// * `model`: the regression model; its ensemble capability is queried at
///   call time.
/// * `dataset`: features, known redshifts, row identifiers, catalog path.
/// * `z_phot`: optional precomputed point predictions (length N); when absent
///   the model's own prediction is used.
/// * `fitter`: the mixture-fitting collaborator (ignored with `skip_gmm`).
/// * `params`: run parameters from [`PdfParams::builder`](crate::pdf::PdfParams::builder).
///
/// Return
/// ----------
/// * `Ok(None)` – the model has no ensemble members; nothing was produced.
/// * `Ok(Some(PdfExtraction))` – the table plus per-row and sink outcomes.
/// * `Err(ZpdfError)` – parameter or shape validation failed before any row
///   was processed.
///
/// See also
/// ------------
/// * [`extract_pdf_with_cancel`] – same pipeline with cooperative cancellation.
/// * [`PdfExtraction`] – errors-as-values result container.
pub fn extract_pdf<M, F>(
    model: &M,
    dataset: &Dataset,
    z_phot: Option<&[f64]>,
    fitter: &F,
    params: &PdfParams,
) -> Result<Option<PdfExtraction>, ZpdfError>
where
    M: RegressionModel + ?Sized,
    F: MixtureFitter,
{
    validate_widths(params)?;
    let Some(collected) = collect_trial_predictions(model, dataset.features(), z_phot)? else {
        return Ok(None);
    };
    let schema = RecordSchema::new(
        collected.trials.ncols(),
        params.grid_size,
        params.gmm_components,
    )?;

    let (records, failed_rows) = aggregate_records(&collected, dataset, &schema, fitter, params);
    finalize(schema, dataset, records, failed_rows, params).map(Some)
}

/// Reject zero grid or component widths before the model is queried.
///
/// The builder already enforces this; the fields are public, so the pipeline
/// re-checks to guarantee the abort happens before any work.
fn validate_widths(params: &PdfParams) -> Result<(), ZpdfError> {
    if params.grid_size == 0 {
        return Err(ZpdfError::InvalidPdfParameter(
            "grid_size must be >= 1".into(),
        ));
    }
    if params.gmm_components == 0 {
        return Err(ZpdfError::InvalidPdfParameter(
            "gmm_components must be >= 1".into(),
        ));
    }
    Ok(())
}

/// Compute the PDF table with cooperative cancellation.
///
/// `should_cancel` is polled before the first row and then on a wall-clock
/// interval (about every 20 ms) between rows — never mid-fit, so one slow
/// object delays cancellation by at most its own fit time. On cancellation
/// the rows completed so far are assembled and returned; the optional sink is
/// still honored for that partial table.
///
/// This path is always sequential: cancellation latency guarantees do not
/// compose with work-stealing parallelism.
pub fn extract_pdf_with_cancel<M, F, C>(
    model: &M,
    dataset: &Dataset,
    z_phot: Option<&[f64]>,
    fitter: &F,
    params: &PdfParams,
    mut should_cancel: C,
) -> Result<Option<PdfExtraction>, ZpdfError>
where
    M: RegressionModel + ?Sized,
    F: MixtureFitter,
    C: FnMut() -> bool,
{
    validate_widths(params)?;
    let Some(collected) = collect_trial_predictions(model, dataset.features(), z_phot)? else {
        return Ok(None);
    };
    let schema = RecordSchema::new(
        collected.trials.ncols(),
        params.grid_size,
        params.gmm_components,
    )?;

    let n = collected.trials.nrows();
    let mut records = Vec::with_capacity(n);
    let mut failed_rows = Vec::new();
    let mut last_poll: Option<Instant> = None;

    for i in 0..n {
        // Poll on the first row, then on elapsed wall-clock time.
        let due = match last_poll {
            None => true,
            Some(t) => t.elapsed() >= POLL_INTERVAL,
        };
        if due {
            if should_cancel() {
                log::info!("extraction cancelled after {} of {} rows", i, n);
                break;
            }
            last_poll = Some(Instant::now());
        }

        let (record, failure) = fit_row(i, &collected, dataset, &schema, fitter, params);
        if let Some(err) = failure {
            failed_rows.push((i, err));
        }
        records.push(record);
    }

    finalize(schema, dataset, records, failed_rows, params).map(Some)
}

/// Fit one object and build its record.
///
/// Rows are independent: this reads only shared immutable input and returns
/// the record for slot `i`, which makes the caller free to run it from a
/// parallel iterator.
fn fit_row<F>(
    i: usize,
    collected: &TrialPredictions,
    dataset: &Dataset,
    schema: &RecordSchema,
    fitter: &F,
    params: &PdfParams,
) -> (PdfRecord, Option<ZpdfError>)
where
    F: MixtureFitter,
{
    let row_id = dataset.row_ids()[i];
    let z_spec = dataset.target()[i];
    let z_phot = collected.z_phot[i];
    let trial_values: Vec<f64> = collected.trials.row(i).iter().copied().collect();

    if params.skip_gmm {
        return (
            PdfRecord::zeroed(schema, row_id, z_spec, z_phot, trial_values),
            None,
        );
    }

    let grid = GridSpec {
        size: params.grid_size,
        min: params.grid_min,
        max: params.grid_max,
    };
    let seed = row_seed(params.seed, i);

    match fitter.fit_pdf(&trial_values, &grid, params.gmm_components, seed) {
        Ok(fit) => (
            PdfRecord::with_fit(row_id, z_spec, z_phot, trial_values, fit),
            None,
        ),
        Err(err) => {
            // Per-row-skip policy: keep the zero defaults, never touch
            // other rows.
            log::warn!("mixture fit failed for row {i} (id {row_id}): {err}");
            (
                PdfRecord::zeroed(schema, row_id, z_spec, z_phot, trial_values),
                Some(err),
            )
        }
    }
}

/// Derive the RNG seed for row `i` from the run seed.
#[inline]
fn row_seed(seed: u64, i: usize) -> u64 {
    seed ^ (i as u64).wrapping_mul(SEED_MIX)
}

#[cfg(not(feature = "parallel"))]
fn aggregate_records<F>(
    collected: &TrialPredictions,
    dataset: &Dataset,
    schema: &RecordSchema,
    fitter: &F,
    params: &PdfParams,
) -> (Vec<PdfRecord>, Vec<(usize, ZpdfError)>)
where
    F: MixtureFitter,
{
    let n = collected.trials.nrows();

    #[cfg(feature = "progress")]
    let pb = {
        let pb = ProgressBar::new(n as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | {per_sec} | ETA {eta_precise}",
            )
            .expect("indicatif template"),
        );
        pb
    };

    let mut records = Vec::with_capacity(n);
    let mut failed_rows = Vec::new();

    for i in 0..n {
        let (record, failure) = fit_row(i, collected, dataset, schema, fitter, params);
        if let Some(err) = failure {
            failed_rows.push((i, err));
        }
        records.push(record);

        #[cfg(feature = "progress")]
        pb.inc(1);
    }

    #[cfg(feature = "progress")]
    pb.finish_and_clear();

    (records, failed_rows)
}

#[cfg(feature = "parallel")]
fn aggregate_records<F>(
    collected: &TrialPredictions,
    dataset: &Dataset,
    schema: &RecordSchema,
    fitter: &F,
    params: &PdfParams,
) -> (Vec<PdfRecord>, Vec<(usize, ZpdfError)>)
where
    F: MixtureFitter,
{
    let n = collected.trials.nrows();

    // Rows are fitted independently and joined back in dataset order;
    // per-row seeds keep the output identical to the sequential path.
    let outcomes: Vec<(PdfRecord, Option<ZpdfError>)> = (0..n)
        .into_par_iter()
        .map(|i| fit_row(i, collected, dataset, schema, fitter, params))
        .collect();

    let mut records = Vec::with_capacity(n);
    let mut failed_rows = Vec::new();
    for (i, (record, failure)) in outcomes.into_iter().enumerate() {
        if let Some(err) = failure {
            failed_rows.push((i, err));
        }
        records.push(record);
    }
    (records, failed_rows)
}

/// Assemble the table and honor the optional output sink.
///
/// A sink failure is downgraded to a value in [`PdfExtraction::sink_error`]
/// so the in-memory table always reaches the caller intact.
fn finalize(
    schema: RecordSchema,
    dataset: &Dataset,
    records: Vec<PdfRecord>,
    failed_rows: Vec<(usize, ZpdfError)>,
    params: &PdfParams,
) -> Result<PdfExtraction, ZpdfError> {
    let table = PdfTable::from_records(schema, dataset.catalog_file(), records)?;

    let sink_error = match &params.output {
        Some(path) => match crate::io::write_pdf_table(&table, path) {
            Ok(()) => None,
            Err(err) => {
                log::warn!("failed to persist PDF table to {path}: {err}");
                Some(err)
            }
        },
        None => None,
    };

    Ok(PdfExtraction {
        table,
        failed_rows,
        sink_error,
    })
}
