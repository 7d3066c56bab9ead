//! # Model capability surface and trial-prediction collection
//!
//! The pipeline treats the regression model as an external collaborator with
//! two levels of capability:
//!
//! * [`RegressionModel`] — any model that can produce a point prediction per
//!   object.
//! * [`EnsembleCapable`] — models that additionally expose the individual
//!   predictions of their T ensemble members.
//!
//! The ensemble capability is queried **explicitly** at call time via
//! [`RegressionModel::as_ensemble`]; a model without it is not an error, it is
//! an absence signal. [`collect_trial_predictions`] encodes that signal as
//! `Ok(None)`, and the caller must short-circuit with a null result and no
//! side effects.
use nalgebra::DMatrix;

use crate::constants::{PredictionVector, TrialMatrix};
use crate::zpdf_errors::ZpdfError;

/// A regression model able to produce one point prediction per object.
pub trait RegressionModel {
    /// Predict one value per feature row.
    fn predict(&self, features: &DMatrix<f64>) -> PredictionVector;

    /// Query the ensemble capability.
    ///
    /// Returns `Some` when the model can report per-estimator predictions,
    /// `None` otherwise. The default is `None`: plain models opt out by
    /// doing nothing.
    fn as_ensemble(&self) -> Option<&dyn EnsembleCapable> {
        None
    }
}

/// Capability interface for models with individually queryable ensemble members.
pub trait EnsembleCapable {
    /// Number of ensemble members T.
    fn n_estimators(&self) -> usize;

    /// N×T matrix of raw per-member predictions for the given feature rows.
    fn per_estimator_predict(&self, features: &DMatrix<f64>) -> TrialMatrix;
}

/// Output of the collection stage: the point prediction and the trial matrix.
#[derive(Debug, Clone)]
pub struct TrialPredictions {
    /// Length-N point prediction (supplied by the caller or computed from the model).
    pub z_phot: PredictionVector,
    /// N×T per-member prediction matrix.
    pub trials: TrialMatrix,
}

/// Collect the per-member trial predictions from an ensemble-capable model.
///
/// The model's capability is probed first; a model without ensemble members
/// yields `Ok(None)` (the soft-skip signal, **not** an error). Otherwise the
/// full N×T trial matrix is requested and the point prediction is either
/// taken from `z_phot` or computed by the model.
///
/// Arguments
/// -----------------
/// * `model`: The regression model (capability queried via [`RegressionModel::as_ensemble`]).
/// * `features`: N×F feature matrix.
/// * `z_phot`: Optional precomputed point predictions; must have length N when given.
///
/// Return
/// ----------
/// * `Ok(None)` – the model has no ensemble members (or reports zero of them).
/// * `Ok(Some(TrialPredictions))` – point prediction and N×T trial matrix.
/// * `Err(ZpdfError::ShapeMismatch)` – the model or the supplied `z_phot`
///   disagrees with the dataset on the number of objects or members.
pub fn collect_trial_predictions<M>(
    model: &M,
    features: &DMatrix<f64>,
    z_phot: Option<&[f64]>,
) -> Result<Option<TrialPredictions>, ZpdfError>
where
    M: RegressionModel + ?Sized,
{
    let Some(ensemble) = model.as_ensemble() else {
        return Ok(None);
    };
    if ensemble.n_estimators() == 0 {
        return Ok(None);
    }

    let n = features.nrows();
    let trials = ensemble.per_estimator_predict(features);
    if trials.nrows() != n {
        return Err(ZpdfError::ShapeMismatch {
            what: "trial matrix rows",
            expected: n,
            got: trials.nrows(),
        });
    }
    if trials.ncols() != ensemble.n_estimators() {
        return Err(ZpdfError::ShapeMismatch {
            what: "trial matrix columns",
            expected: ensemble.n_estimators(),
            got: trials.ncols(),
        });
    }

    let z_phot = match z_phot {
        Some(z) => {
            if z.len() != n {
                return Err(ZpdfError::ShapeMismatch {
                    what: "z_phot length",
                    expected: n,
                    got: z.len(),
                });
            }
            PredictionVector::from_column_slice(z)
        }
        None => {
            let predicted = model.predict(features);
            if predicted.len() != n {
                return Err(ZpdfError::ShapeMismatch {
                    what: "prediction length",
                    expected: n,
                    got: predicted.len(),
                });
            }
            predicted
        }
    };

    Ok(Some(TrialPredictions { z_phot, trials }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    struct Plain;

    impl RegressionModel for Plain {
        fn predict(&self, features: &DMatrix<f64>) -> PredictionVector {
            DVector::zeros(features.nrows())
        }
    }

    struct Forest {
        trials: TrialMatrix,
    }

    impl RegressionModel for Forest {
        fn predict(&self, features: &DMatrix<f64>) -> PredictionVector {
            DVector::from_element(features.nrows(), 0.5)
        }

        fn as_ensemble(&self) -> Option<&dyn EnsembleCapable> {
            Some(self)
        }
    }

    impl EnsembleCapable for Forest {
        fn n_estimators(&self) -> usize {
            self.trials.ncols()
        }

        fn per_estimator_predict(&self, _features: &DMatrix<f64>) -> TrialMatrix {
            self.trials.clone()
        }
    }

    #[test]
    fn test_plain_model_yields_absence() {
        let features = DMatrix::zeros(4, 2);
        let collected = collect_trial_predictions(&Plain, &features, None).unwrap();
        assert!(collected.is_none());
    }

    #[test]
    fn test_ensemble_collection() {
        let features = DMatrix::zeros(2, 3);
        let forest = Forest {
            trials: TrialMatrix::from_row_slice(2, 3, &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]),
        };

        let collected = collect_trial_predictions(&forest, &features, None)
            .unwrap()
            .unwrap();
        assert_eq!(collected.trials.nrows(), 2);
        assert_eq!(collected.trials.ncols(), 3);
        assert_eq!(collected.z_phot[0], 0.5);

        // Caller-supplied point prediction wins over the model's.
        let collected = collect_trial_predictions(&forest, &features, Some(&[1.0, 2.0]))
            .unwrap()
            .unwrap();
        assert_eq!(collected.z_phot[1], 2.0);
    }

    #[test]
    fn test_z_phot_length_mismatch() {
        let features = DMatrix::zeros(2, 3);
        let forest = Forest {
            trials: TrialMatrix::zeros(2, 3),
        };
        let err = collect_trial_predictions(&forest, &features, Some(&[1.0])).unwrap_err();
        assert_eq!(
            err,
            ZpdfError::ShapeMismatch {
                what: "z_phot length",
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_zero_member_ensemble_is_absence() {
        let features = DMatrix::zeros(2, 3);
        let forest = Forest {
            trials: TrialMatrix::zeros(2, 0),
        };
        assert!(collect_trial_predictions(&forest, &features, None)
            .unwrap()
            .is_none());
    }
}
