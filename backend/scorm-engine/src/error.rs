use thiserror::Error;

/// Rejection from `parse_positive`: the value parsed fine but is negative.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("value of '{field}' must not be negative: {value}")]
    Negative { field: String, value: f64 },
}

/// Failure of the storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("storage returned no document for {0}")]
    Missing(String),
}

/// Failure of a reduction run. Malformed input values never end up here; only
/// the storage collaborator can fail a batch.
#[derive(Debug, Error)]
pub enum ScormError {
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}
