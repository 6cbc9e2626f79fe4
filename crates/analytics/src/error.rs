use thiserror::Error;

use crate::store::StoreError;

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Failure of an analytics request.
///
/// Requests are all-or-nothing: when one of these is returned no report bytes
/// were produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// The record store could not be read. Not retried.
    #[error("data unavailable: {0}")]
    DataUnavailable(#[from] StoreError),

    /// The requested report format is not supported.
    #[error("invalid format '{0}': use 'pdf' or 'csv'")]
    InvalidFormat(String),

    /// The document encoder failed while writing its output buffer.
    #[error("report rendering failed: {0}")]
    Render(String),
}

impl AnalyticsError {
    /// Whether the caller is at fault (maps to a 4xx at a transport boundary).
    pub fn is_client_error(&self) -> bool {
        matches!(self, AnalyticsError::InvalidFormat(_))
    }
}
