use thiserror::Error;

#[derive(Error, Debug)]
pub enum GttError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Kite API error ({status}): {message}")]
    KiteError {
        status: u16,
        error_type: Option<String>,
        message: String,
    },

    #[error("Database error: {0}")]
    DatabaseError(#[from] libsql::Error),

    #[error("Stored data error: {message}")]
    StoreError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

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

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Kite connection not available")]
    BrokerUnavailable,
}

pub type Result<T> = std::result::Result<T, GttError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Broker,
    Storage,
    Configuration,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GttError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Kite `error_type` of a broker rejection, e.g. `TokenException`.
    pub fn kite_error_type(&self) -> Option<&str> {
        match self {
            Self::KiteError { error_type, .. } => error_type.as_deref(),
            _ => None,
        }
    }

    pub fn is_token_error(&self) -> bool {
        match self {
            Self::KiteError {
                status, error_type, ..
            } => *status == 403 || error_type.as_deref() == Some("TokenException"),
            _ => false,
        }
    }

    pub fn is_network_error(&self) -> bool {
        match self {
            Self::ApiError(e) => e.is_connect() || e.is_timeout(),
            Self::KiteError { error_type, .. } => {
                error_type.as_deref() == Some("NetworkException")
            }
            _ => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) => ErrorCategory::Network,
            Self::KiteError { .. } | Self::BrokerUnavailable => ErrorCategory::Broker,
            Self::DatabaseError(_)
            | Self::StoreError { .. }
            | Self::IoError(_)
            | Self::CsvError(_) => {
                ErrorCategory::Storage
            }
            Self::SerializationError(_) => ErrorCategory::Storage,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::ValidationError { .. } | Self::NotFound { .. } | Self::Conflict { .. } => {
                ErrorCategory::Input
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Broker if self.is_network_error() => ErrorSeverity::Medium,
            ErrorCategory::Broker | ErrorCategory::Storage => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        if self.is_token_error() {
            return "Access token rejected. Regenerate the access token and restart.";
        }
        if self.is_network_error() {
            return "Check your internet connection and retry.";
        }
        match self.category() {
            ErrorCategory::Network => "Check your internet connection and retry.",
            ErrorCategory::Broker => "Check the Kite API key and access token.",
            ErrorCategory::Storage => "Check that the database and data directory are writable.",
            ErrorCategory::Configuration => {
                "Review the configuration file and environment variables."
            }
            ErrorCategory::Input => "Correct the request and try again.",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::KiteError { .. } if self.is_token_error() => {
                format!("Access token error: {}", self)
            }
            Self::BrokerUnavailable => {
                "Kite connection not available. Please make sure you have a valid access token."
                    .to_string()
            }
            Self::ApiError(_) => format!("Network error: {}", self),
            Self::DatabaseError(_) => format!("Database error: {}", self),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_are_broker_errors_with_token_hint() {
        let err = GttError::KiteError {
            status: 403,
            error_type: Some("TokenException".to_string()),
            message: "Incorrect `api_key` or `access_token`.".to_string(),
        };
        assert!(err.is_token_error());
        assert_eq!(err.category(), ErrorCategory::Broker);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.recovery_suggestion().contains("access token"));
    }

    #[test]
    fn input_errors_are_low_severity() {
        let err = GttError::validation("bad trigger");
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.to_string(), "Validation error: bad trigger");
    }
}
