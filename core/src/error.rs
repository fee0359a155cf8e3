use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data source not found: {path}")]
    DataSourceNotFound { path: String },

    #[error("Malformed source line {line}: {reason}")]
    MalformedSource { line: usize, reason: String },

    #[error("Schema mismatch: expected [{expected}], found [{found}]")]
    SchemaMismatch { expected: String, found: String },

    #[error("Degenerate training set: {reason}")]
    DegenerateTrainingSet { reason: String },

    #[error("Model artifact '{key}' not found")]
    ModelArtifactMissing { key: String },

    #[error("Malformed request: {reason}")]
    MalformedRequest { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
