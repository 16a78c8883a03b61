use thiserror::Error;

/// Failure of a browsing operation.
///
/// Errors are values, not handles: they are cloned into [`crate::connection::ConnectionState`]
/// and handed to every caller that awaited the same dial.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrowseError {
    /// Bad input. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The shared connection isn't established.
    #[error("not connected to the broker cluster")]
    NotConnected,
    /// A broker call exceeded its bounded wait.
    #[error("timed out after {timeout_ms} ms while {operation}")]
    Timeout {
        operation: &'static str,
        timeout_ms: u128,
    },
    /// Failure reported by the broker, kept verbatim.
    #[error("broker error: {0}")]
    Upstream(String),
    #[error("operation was cancelled")]
    Cancelled,
}

impl BrowseError {
    pub fn timeout(operation: &'static str, timeout: std::time::Duration) -> Self {
        BrowseError::Timeout {
            operation,
            timeout_ms: timeout.as_millis(),
        }
    }

    pub fn upstream(error: impl std::fmt::Display) -> Self {
        BrowseError::Upstream(error.to_string())
    }

    /// Whether the facade should try to reconnect before giving up.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, BrowseError::NotConnected)
    }
}

impl From<rdkafka::error::KafkaError> for BrowseError {
    fn from(value: rdkafka::error::KafkaError) -> Self {
        BrowseError::Upstream(value.to_string())
    }
}

pub type BrowseResult<T> = Result<T, BrowseError>;
