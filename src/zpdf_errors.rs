use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZpdfError {
    #[error("Invalid PDF parameter: {0}")]
    InvalidPdfParameter(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Shape mismatch for {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Gaussian mixture fit failed: {0}")]
    GmmFitFailure(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow_schema::ArrowError),

    #[error("Invalid PDF table file: {0}")]
    InvalidTableFile(String),
}

impl PartialEq for ZpdfError {
    fn eq(&self, other: &Self) -> bool {
        use ZpdfError::*;
        match (self, other) {
            (InvalidPdfParameter(a), InvalidPdfParameter(b)) => a == b,
            (InvalidDataset(a), InvalidDataset(b)) => a == b,
            (
                ShapeMismatch {
                    what: w1,
                    expected: e1,
                    got: g1,
                },
                ShapeMismatch {
                    what: w2,
                    expected: e2,
                    got: g2,
                },
            ) => w1 == w2 && e1 == e2 && g1 == g2,
            (GmmFitFailure(a), GmmFitFailure(b)) => a == b,
            (InvalidTableFile(a), InvalidTableFile(b)) => a == b,

            // Wrapped foreign errors are not comparable: equal iff same variant.
            (IoError(_), IoError(_)) => true,
            (ParquetError(_), ParquetError(_)) => true,
            (ArrowError(_), ArrowError(_)) => true,

            _ => false,
        }
    }
}
