#![allow(dead_code)]

use nalgebra::{DMatrix, DVector};
use zpdf::{Dataset, EnsembleCapable, PredictionVector, RegressionModel, TrialMatrix};

/// Route `log` output into the test harness.
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Model stub exposing a fixed trial matrix as its ensemble members.
pub struct EnsembleStub {
    pub trials: TrialMatrix,
}

impl RegressionModel for EnsembleStub {
    fn predict(&self, _features: &DMatrix<f64>) -> PredictionVector {
        // Point prediction: mean over the ensemble members of each row.
        DVector::from_iterator(
            self.trials.nrows(),
            self.trials
                .row_iter()
                .map(|row| row.iter().sum::<f64>() / row.len() as f64),
        )
    }

    fn as_ensemble(&self) -> Option<&dyn EnsembleCapable> {
        Some(self)
    }
}

impl EnsembleCapable for EnsembleStub {
    fn n_estimators(&self) -> usize {
        self.trials.ncols()
    }

    fn per_estimator_predict(&self, _features: &DMatrix<f64>) -> TrialMatrix {
        self.trials.clone()
    }
}

/// Model stub without any ensemble capability.
pub struct PlainStub;

impl RegressionModel for PlainStub {
    fn predict(&self, features: &DMatrix<f64>) -> PredictionVector {
        DVector::zeros(features.nrows())
    }
}

/// Deterministic N×T trial matrix with distinct, well-spread values per row.
pub fn sample_trials(n: usize, t: usize) -> TrialMatrix {
    TrialMatrix::from_fn(n, t, |i, j| 0.3 + 0.1 * i as f64 + 0.01 * j as f64)
}

/// Dataset with `n` objects, z_spec = 0.1·(i+1), row ids starting at 100.
pub fn sample_dataset(n: usize) -> Dataset {
    Dataset::new(
        DMatrix::zeros(n, 2),
        DVector::from_iterator(n, (0..n).map(|i| 0.1 * (i + 1) as f64)),
        (0..n).map(|i| 100 + i as i32).collect(),
        "tests/data/catalog.fits",
    )
    .unwrap()
}
