//! # Per-object records and the assembled output table
//!
//! [`PdfRecord`] is the fixed-width record of one object: identifiers, point
//! prediction, raw trial values, and the fitted PDF. Records are created and
//! populated exactly once by the aggregation step, then treated as immutable.
//!
//! [`PdfTable`] is the ordered collection of records for one run, together
//! with the [`RecordSchema`](crate::pdf::schema::RecordSchema) that fixes the
//! T/G/K widths and the catalog path that the persistence sink writes into
//! the file header. Assembly validates every record against the schema, so a
//! table can only exist with uniform widths.
use arrow_array::types::Float64Type;
use arrow_array::{ArrayRef, FixedSizeListArray, Float64Array, Int32Array, RecordBatch};
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;

use crate::constants::RowId;
use crate::pdf::gmm::MixturePdf;
use crate::pdf::schema::RecordSchema;
use crate::zpdf_errors::ZpdfError;

/// One object's fixed-width output record.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfRecord {
    /// Original catalog row identifier.
    pub row_id: RowId,
    /// Known (spectroscopic) redshift.
    pub z_spec: f64,
    /// Point prediction of the ensemble.
    pub z_phot: f64,
    /// Raw per-member predictions, length T.
    pub trial_values: Vec<f64>,
    /// PDF evaluation grid, length G (all zeros when fitting was skipped).
    pub pdf_grid: Vec<f64>,
    /// PDF density at each grid point, length G (all zeros when skipped).
    pub pdf_density: Vec<f64>,
    /// Mixture component means, length K (all zeros when skipped).
    pub gmm_mu: Vec<f64>,
    /// Mixture component standard deviations, length K (all zeros when skipped).
    pub gmm_sigma: Vec<f64>,
    /// Mixture component weights, length K (all zeros when skipped).
    pub gmm_weight: Vec<f64>,
}

impl PdfRecord {
    /// Record with the documented default for unfitted rows: every PDF and
    /// mixture field explicitly zero-filled to the schema widths.
    pub(crate) fn zeroed(
        schema: &RecordSchema,
        row_id: RowId,
        z_spec: f64,
        z_phot: f64,
        trial_values: Vec<f64>,
    ) -> Self {
        PdfRecord {
            row_id,
            z_spec,
            z_phot,
            trial_values,
            pdf_grid: vec![0.0; schema.grid_size()],
            pdf_density: vec![0.0; schema.grid_size()],
            gmm_mu: vec![0.0; schema.components()],
            gmm_sigma: vec![0.0; schema.components()],
            gmm_weight: vec![0.0; schema.components()],
        }
    }

    /// Record populated from a successful mixture fit.
    pub(crate) fn with_fit(
        row_id: RowId,
        z_spec: f64,
        z_phot: f64,
        trial_values: Vec<f64>,
        fit: MixturePdf,
    ) -> Self {
        PdfRecord {
            row_id,
            z_spec,
            z_phot,
            trial_values,
            pdf_grid: fit.grid,
            pdf_density: fit.density,
            gmm_mu: fit.mu,
            gmm_sigma: fit.sigma,
            gmm_weight: fit.weight,
        }
    }
}

/// Ordered sequence of [`PdfRecord`] with a single shared layout.
#[derive(Debug, Clone)]
pub struct PdfTable {
    schema: RecordSchema,
    catalog_file: Utf8PathBuf,
    records: Vec<PdfRecord>,
}

impl PdfTable {
    /// Assemble the table, checking every record against the schema widths.
    ///
    /// Arguments
    /// -----------------
    /// * `schema`: the fixed layout of this run.
    /// * `catalog_file`: originating catalog path, persisted in the file header.
    /// * `records`: per-object records in dataset order.
    ///
    /// Return
    /// ----------
    /// * The table, or [`ZpdfError::ShapeMismatch`] if any record width
    ///   disagrees with the schema.
    pub fn from_records(
        schema: RecordSchema,
        catalog_file: impl Into<Utf8PathBuf>,
        records: Vec<PdfRecord>,
    ) -> Result<Self, ZpdfError> {
        for record in &records {
            check_width("trial_values", schema.trials(), record.trial_values.len())?;
            check_width("pdf_grid", schema.grid_size(), record.pdf_grid.len())?;
            check_width("pdf_density", schema.grid_size(), record.pdf_density.len())?;
            check_width("gmm_mu", schema.components(), record.gmm_mu.len())?;
            check_width("gmm_sigma", schema.components(), record.gmm_sigma.len())?;
            check_width("gmm_weight", schema.components(), record.gmm_weight.len())?;
        }
        Ok(PdfTable {
            schema,
            catalog_file: catalog_file.into(),
            records,
        })
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn catalog_file(&self) -> &Utf8Path {
        &self.catalog_file
    }

    pub fn records(&self) -> &[PdfRecord] {
        &self.records
    }

    /// Number of objects in the table.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Convert the whole table to a single Arrow record batch using the
    /// run schema.
    pub fn to_record_batch(&self) -> Result<RecordBatch, ZpdfError> {
        let row_id = Int32Array::from(self.records.iter().map(|r| r.row_id).collect::<Vec<_>>());
        let z_spec = Float64Array::from(self.records.iter().map(|r| r.z_spec).collect::<Vec<_>>());
        let z_phot = Float64Array::from(self.records.iter().map(|r| r.z_phot).collect::<Vec<_>>());

        let columns: Vec<ArrayRef> = vec![
            Arc::new(row_id),
            Arc::new(z_spec),
            Arc::new(z_phot),
            self.list_column(|r| &r.trial_values, self.schema.trials()),
            self.list_column(|r| &r.pdf_grid, self.schema.grid_size()),
            self.list_column(|r| &r.pdf_density, self.schema.grid_size()),
            self.list_column(|r| &r.gmm_mu, self.schema.components()),
            self.list_column(|r| &r.gmm_sigma, self.schema.components()),
            self.list_column(|r| &r.gmm_weight, self.schema.components()),
        ];

        RecordBatch::try_new(self.schema.arrow_schema(), columns).map_err(ZpdfError::from)
    }

    fn list_column<'a, F>(&'a self, select: F, width: usize) -> ArrayRef
    where
        F: Fn(&'a PdfRecord) -> &'a Vec<f64>,
    {
        let array = FixedSizeListArray::from_iter_primitive::<Float64Type, _, _>(
            self.records
                .iter()
                .map(|r| Some(select(r).iter().copied().map(Some).collect::<Vec<_>>())),
            width as i32,
        );
        Arc::new(array)
    }
}

fn check_width(what: &'static str, expected: usize, got: usize) -> Result<(), ZpdfError> {
    if expected != got {
        return Err(ZpdfError::ShapeMismatch {
            what,
            expected,
            got,
        });
    }
    Ok(())
}
