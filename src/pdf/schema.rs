//! # Fixed-width record layout
//!
//! [`RecordSchema`] derives the output column layout from the three run
//! parameters: trial count T, grid size G, and mixture-component count K.
//! Construction is a pure, deterministic function of `(T, G, K)` with no side
//! effects; the vector columns whose width depends on run-time parameters are
//! modeled as Arrow `FixedSizeList` fields built once per invocation.
//!
//! Column names follow the original catalog convention (`z_phot_values`,
//! `z_phot_pdf_grid`, `z_phot_pdf`, `z_gmm_mu`, `z_gmm_sig`, `z_gmm_w`) so
//! persisted files stay compatible with downstream tooling.
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef};

use crate::zpdf_errors::ZpdfError;

/// Persisted column names.
pub mod columns {
    pub const ROW_ID: &str = "original_row_ID";
    pub const Z_SPEC: &str = "z_spec";
    pub const Z_PHOT: &str = "z_phot";
    pub const TRIAL_VALUES: &str = "z_phot_values";
    pub const PDF_GRID: &str = "z_phot_pdf_grid";
    pub const PDF_DENSITY: &str = "z_phot_pdf";
    pub const GMM_MU: &str = "z_gmm_mu";
    pub const GMM_SIGMA: &str = "z_gmm_sig";
    pub const GMM_WEIGHT: &str = "z_gmm_w";
}

/// Fixed output layout for one extraction run.
///
/// Every row of the resulting table carries the same widths: `trial_values`
/// has length T, `pdf_grid`/`pdf_density` length G, and the three mixture
/// columns length K. The Arrow schema is built once and shared.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    trials: usize,
    grid_size: usize,
    components: usize,
    arrow: SchemaRef,
}

impl RecordSchema {
    /// Build the layout from the run parameters.
    ///
    /// Arguments
    /// -----------------
    /// * `trials`: number of ensemble members T (must be >= 1).
    /// * `grid_size`: number of PDF grid points G (must be >= 1).
    /// * `components`: number of mixture components K (must be >= 1).
    ///
    /// Return
    /// ----------
    /// * The schema, or [`ZpdfError::InvalidPdfParameter`] for a zero width.
    pub fn new(trials: usize, grid_size: usize, components: usize) -> Result<Self, ZpdfError> {
        if trials == 0 {
            return Err(ZpdfError::InvalidPdfParameter(
                "trial count must be >= 1".into(),
            ));
        }
        if grid_size == 0 {
            return Err(ZpdfError::InvalidPdfParameter(
                "grid size must be >= 1".into(),
            ));
        }
        if components == 0 {
            return Err(ZpdfError::InvalidPdfParameter(
                "component count must be >= 1".into(),
            ));
        }

        let arrow = Arc::new(Schema::new(vec![
            Field::new(columns::ROW_ID, DataType::Int32, false),
            Field::new(columns::Z_SPEC, DataType::Float64, false),
            Field::new(columns::Z_PHOT, DataType::Float64, false),
            float_list(columns::TRIAL_VALUES, trials),
            float_list(columns::PDF_GRID, grid_size),
            float_list(columns::PDF_DENSITY, grid_size),
            float_list(columns::GMM_MU, components),
            float_list(columns::GMM_SIGMA, components),
            float_list(columns::GMM_WEIGHT, components),
        ]));

        Ok(RecordSchema {
            trials,
            grid_size,
            components,
            arrow,
        })
    }

    /// Number of ensemble members T.
    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Number of PDF grid points G.
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Number of mixture components K.
    pub fn components(&self) -> usize {
        self.components
    }

    /// The Arrow schema shared by every record batch of this run.
    pub fn arrow_schema(&self) -> SchemaRef {
        Arc::clone(&self.arrow)
    }
}

/// Fixed-size float64 list field of the given width.
///
/// The item field is nullable to match the arrays produced by
/// `FixedSizeListArray::from_iter_primitive`; the list itself never holds nulls.
fn float_list(name: &str, width: usize) -> Field {
    Field::new(
        name,
        DataType::FixedSizeList(
            Arc::new(Field::new("item", DataType::Float64, true)),
            width as i32,
        ),
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_widths() {
        let schema = RecordSchema::new(5, 10, 2).unwrap();
        assert_eq!(schema.trials(), 5);
        assert_eq!(schema.grid_size(), 10);
        assert_eq!(schema.components(), 2);

        let arrow = schema.arrow_schema();
        assert_eq!(arrow.fields().len(), 9);

        let field = arrow.field_with_name(columns::TRIAL_VALUES).unwrap();
        match field.data_type() {
            DataType::FixedSizeList(_, w) => assert_eq!(*w, 5),
            other => panic!("unexpected type: {other:?}"),
        }
        let field = arrow.field_with_name(columns::GMM_WEIGHT).unwrap();
        match field.data_type() {
            DataType::FixedSizeList(_, w) => assert_eq!(*w, 2),
            other => panic!("unexpected type: {other:?}"),
        }
    }

    #[test]
    fn test_schema_is_deterministic() {
        let a = RecordSchema::new(3, 7, 4).unwrap();
        let b = RecordSchema::new(3, 7, 4).unwrap();
        assert_eq!(a.arrow_schema(), b.arrow_schema());
    }

    #[test]
    fn test_schema_rejects_zero_widths() {
        assert!(matches!(
            RecordSchema::new(0, 10, 2),
            Err(ZpdfError::InvalidPdfParameter(_))
        ));
        assert!(matches!(
            RecordSchema::new(5, 0, 2),
            Err(ZpdfError::InvalidPdfParameter(_))
        ));
        assert!(matches!(
            RecordSchema::new(5, 10, 0),
            Err(ZpdfError::InvalidPdfParameter(_))
        ));
    }
}
