use thiserror::Error;

/// Failure to produce the dataset.
///
/// Filtering and aggregation never fail; the only error is not having data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    /// The source could not be fetched, or its content could not be parsed.
    #[error("dataset unavailable from {origin}: {reason}")]
    DataUnavailable { origin: String, reason: String },
}

impl DataError {
    /// Wrap a loader failure, keeping the full context chain in `reason`.
    pub fn unavailable(origin: impl Into<String>, err: &anyhow::Error) -> Self {
        DataError::DataUnavailable {
            origin: origin.into(),
            reason: format!("{err:#}"),
        }
    }
}
