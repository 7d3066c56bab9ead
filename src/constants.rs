//! # Common type definitions for zpdf
//!
//! Short aliases shared across the crate. They fix the numeric conventions of
//! the pipeline in one place: redshifts are `f64`, catalog row identifiers are
//! 32-bit signed integers (matching the persisted column type), and the trial
//! prediction matrix is a dense `nalgebra` matrix with one row per object and
//! one column per ensemble member.
use nalgebra::{DMatrix, DVector};

/// A redshift value (spectroscopic or photometric).
pub type Redshift = f64;

/// Original catalog row identifier, persisted as a 32-bit signed integer.
pub type RowId = i32;

/// N×T matrix of raw per-estimator predictions.
///
/// Rows index objects, columns index ensemble members. The matrix type makes
/// the "T constant across all rows" invariant structural.
pub type TrialMatrix = DMatrix<f64>;

/// Length-N vector of point predictions (one value per object).
pub type PredictionVector = DVector<f64>;
