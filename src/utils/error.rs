use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeatmapError {
    #[error("Upstream transport failed: {0}")]
    TransportError(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {status}")]
    UpstreamError { status: u16 },

    #[error("All {attempts} fetch attempts failed, last error: {last}")]
    ExhaustedRetriesError {
        attempts: u32,
        #[source]
        last: Box<HeatmapError>,
    },

    #[error("Record {id} has no usable coordinates")]
    MalformedRecordError { id: u64 },

    #[error("Aggregation worker failed: {message}")]
    WorkerFaultError { message: String },

    #[error("Invalid bounding box: {reason}")]
    InvalidBoundingBox { reason: String },

    #[error("Invalid grid {cols}x{rows}: both dimensions must be positive")]
    InvalidGrid { cols: u32, rows: u32 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, HeatmapError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Runtime,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HeatmapError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HeatmapError::TransportError(_)
            | HeatmapError::UpstreamError { .. }
            | HeatmapError::ExhaustedRetriesError { .. } => ErrorCategory::Network,
            HeatmapError::MalformedRecordError { .. }
            | HeatmapError::InvalidBoundingBox { .. }
            | HeatmapError::InvalidGrid { .. }
            | HeatmapError::SerializationError(_) => ErrorCategory::Data,
            HeatmapError::WorkerFaultError { .. } => ErrorCategory::Runtime,
            HeatmapError::ConfigError { .. }
            | HeatmapError::ConfigValidationError { .. }
            | HeatmapError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            HeatmapError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單次失敗會在本地重試
            HeatmapError::TransportError(_) | HeatmapError::UpstreamError { .. } => {
                ErrorSeverity::Medium
            }
            HeatmapError::MalformedRecordError { .. } => ErrorSeverity::Low,
            HeatmapError::WorkerFaultError { .. } => ErrorSeverity::Medium,
            HeatmapError::ExhaustedRetriesError { .. }
            | HeatmapError::InvalidBoundingBox { .. }
            | HeatmapError::InvalidGrid { .. }
            | HeatmapError::SerializationError(_)
            | HeatmapError::ConfigError { .. }
            | HeatmapError::ConfigValidationError { .. }
            | HeatmapError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            HeatmapError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// Whether a single fetch attempt that failed this way should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HeatmapError::TransportError(_) | HeatmapError::UpstreamError { .. }
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "The upstream service may be overloaded; retry later or use --mock"
            }
            ErrorCategory::Data => "Check the tile or viewport coordinates",
            ErrorCategory::Runtime => "Re-run the request; use --inline to skip the worker",
            ErrorCategory::Configuration => "Check the config file and command line flags",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            HeatmapError::ExhaustedRetriesError { attempts, .. } => format!(
                "Could not reach the point-data service after {} attempts",
                attempts
            ),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(HeatmapError::UpstreamError { status: 504 }.is_retryable());
        assert!(!HeatmapError::MalformedRecordError { id: 7 }.is_retryable());

        let exhausted = HeatmapError::ExhaustedRetriesError {
            attempts: 3,
            last: Box::new(HeatmapError::UpstreamError { status: 429 }),
        };
        assert!(!exhausted.is_retryable());
        assert_eq!(exhausted.category(), ErrorCategory::Network);
        assert_eq!(exhausted.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_exhausted_message_carries_last_cause() {
        let exhausted = HeatmapError::ExhaustedRetriesError {
            attempts: 3,
            last: Box::new(HeatmapError::UpstreamError { status: 503 }),
        };

        assert!(exhausted.to_string().contains("HTTP 503"));
        assert_eq!(
            exhausted.user_friendly_message(),
            "Could not reach the point-data service after 3 attempts"
        );
        let source = std::error::Error::source(&exhausted).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Upstream returned HTTP 503"));
    }
}
