use std::path::PathBuf;

/// Precondition failures raised by the classification core.
///
/// All of these are fatal for a run: callers propagate them instead of
/// continuing with partial results.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("input is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("duplicate case_id {0:?} in input")]
    DuplicateRecordId(String),

    #[error("failed to read input table: {0}")]
    Csv(#[from] csv::Error),

    #[error("model artifact {path}: {reason}")]
    ModelArtifact { path: PathBuf, reason: String },

    #[error("vocabulary artifact {path}: {reason}")]
    VocabularyArtifact { path: PathBuf, reason: String },

    #[error("feature vector for row {row} has {got} columns, model expects at most {expected}")]
    DimensionMismatch {
        row: usize,
        got: usize,
        expected: usize,
    },

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;
