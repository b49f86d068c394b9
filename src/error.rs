//! Error types for the gesture pipeline.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid recording header in {path:?}")]
    InvalidHeader { path: PathBuf },

    #[error("Malformed row in {path:?} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Cannot write {value:?} into a recording cell")]
    InvalidField { value: String },

    #[error("Model file {path:?}: {source}")]
    ModelIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Model deserialization failed: {0}")]
    Deserialize(String),

    #[error("Model serialization failed: {0}")]
    Serialize(String),

    #[error("Training set produced no samples")]
    EmptyTrainingSet,

    #[error("Classifier needs at least two classes, found {found}")]
    InsufficientClasses { found: usize },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Expected a {expected} model, got {actual}")]
    ModelKindMismatch { expected: String, actual: String },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn model_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::ModelIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
