use thiserror::Error;

/// Unified error type for the loader
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
    /// The bounding context was cancelled before the load finished
    #[error("context canceled: {reason}")]
    Cancelled { reason: String },

    /// The bounding context ran past its deadline
    #[error("context deadline exceeded (timeout: {timeout_ms}ms)")]
    DeadlineExceeded { timeout_ms: u64 },

    /// A concurrent unit panicked and was recovered by its waiter
    #[error("unit {unit} panicked: {message}")]
    UnitPanicked { unit: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LoaderError {
    /// Create a cancellation error
    pub fn cancelled<S: Into<String>>(reason: S) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Create a deadline error
    pub fn deadline_exceeded(timeout_ms: u64) -> Self {
        Self::DeadlineExceeded { timeout_ms }
    }

    /// Create a recovered-panic error for logging
    pub fn unit_panicked<U: Into<String>, M: Into<String>>(unit: U, message: M) -> Self {
        Self::UnitPanicked {
            unit: unit.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error naming the offending field
    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Cancelled { .. } => "cancelled",
            Self::DeadlineExceeded { .. } => "deadline",
            Self::UnitPanicked { .. } => "panic",
            Self::Configuration { .. } => "configuration",
            Self::Internal { .. } => "internal",
        }
    }

    /// Whether the error comes from the bounding context rather than the work itself
    pub fn is_context_error(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::DeadlineExceeded { .. })
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, LoaderError>;

impl From<anyhow::Error> for LoaderError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}
