//! # Dataset container
//!
//! [`Dataset`] bundles everything the extraction pipeline needs to know about
//! the input catalog: the feature matrix handed to the model, the known
//! (spectroscopic) redshifts, the original catalog row identifiers, and the
//! path of the source catalog file. The catalog path travels with the table
//! all the way into the persisted output header (`cat_file` entry).
//!
//! The three per-object collections must agree on length; this is checked once
//! at construction so the rest of the pipeline can index them freely.
use camino::{Utf8Path, Utf8PathBuf};
use nalgebra::{DMatrix, DVector};

use crate::constants::RowId;
use crate::zpdf_errors::ZpdfError;

/// Input catalog: features, known redshifts, row identifiers, source path.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: DMatrix<f64>,
    target: DVector<f64>,
    row_ids: Vec<RowId>,
    catalog_file: Utf8PathBuf,
}

impl Dataset {
    /// Build a dataset, validating that features, target, and row identifiers
    /// all describe the same number of objects.
    ///
    /// Arguments
    /// -----------------
    /// * `features`: N×F feature matrix (one row per object).
    /// * `target`: length-N vector of known redshifts.
    /// * `row_ids`: length-N original catalog row identifiers.
    /// * `catalog_file`: path of the source catalog, recorded in persisted output.
    ///
    /// Return
    /// ----------
    /// * The validated [`Dataset`], or [`ZpdfError::InvalidDataset`] on a
    ///   length disagreement.
    pub fn new(
        features: DMatrix<f64>,
        target: DVector<f64>,
        row_ids: Vec<RowId>,
        catalog_file: impl Into<Utf8PathBuf>,
    ) -> Result<Self, ZpdfError> {
        let n = features.nrows();
        if target.len() != n {
            return Err(ZpdfError::InvalidDataset(format!(
                "target length {} does not match {} feature rows",
                target.len(),
                n
            )));
        }
        if row_ids.len() != n {
            return Err(ZpdfError::InvalidDataset(format!(
                "row_ids length {} does not match {} feature rows",
                row_ids.len(),
                n
            )));
        }
        Ok(Dataset {
            features,
            target,
            row_ids,
            catalog_file: catalog_file.into(),
        })
    }

    /// Number of objects in the catalog.
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn features(&self) -> &DMatrix<f64> {
        &self.features
    }

    /// Known (spectroscopic) redshifts, one per object.
    pub fn target(&self) -> &DVector<f64> {
        &self.target
    }

    /// Original catalog row identifiers, one per object.
    pub fn row_ids(&self) -> &[RowId] {
        &self.row_ids
    }

    pub fn catalog_file(&self) -> &Utf8Path {
        &self.catalog_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_length_checks() {
        let features = DMatrix::zeros(3, 2);
        let target = DVector::from_vec(vec![0.1, 0.2, 0.3]);

        let ds = Dataset::new(
            features.clone(),
            target.clone(),
            vec![10, 11, 12],
            "catalog.fits",
        )
        .unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.catalog_file(), "catalog.fits");

        let bad_target = DVector::from_vec(vec![0.1, 0.2]);
        assert!(matches!(
            Dataset::new(features.clone(), bad_target, vec![10, 11, 12], "c"),
            Err(ZpdfError::InvalidDataset(_))
        ));

        assert!(matches!(
            Dataset::new(features, target, vec![10, 11], "c"),
            Err(ZpdfError::InvalidDataset(_))
        ));
    }
}
