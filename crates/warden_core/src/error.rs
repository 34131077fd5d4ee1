//! Error types for WARDEN.

use thiserror::Error;

use crate::action::Action;

/// Result type used across the workspace
pub type WardenResult<T> = Result<T, WardenError>;

/// Error type shared by all WARDEN crates
#[derive(Debug, Error)]
pub enum WardenError {
    /// Malformed permission-table input or guard configuration.
    /// Detected eagerly, when a model's table is built.
    #[error("invalid permission configuration: {message}")]
    Configuration {
        /// What was wrong with the input
        message: String,
    },

    /// The current actor may not perform `action` on `field`
    #[error("access denied: cannot {action} '{field}' on {model}")]
    Forbidden {
        /// Model name
        model: String,
        /// Denied action
        action: Action,
        /// Denied field (`*` for row-level checks)
        field: String,
        /// Report the denial as a missing resource rather than a refusal
        hidden: bool,
    },

    /// The model rejected the underlying field operation after
    /// authorization succeeded
    #[error("field '{field}' on {model}: {reason}")]
    Field {
        /// Model name
        model: String,
        /// Field name
        field: String,
        /// Reason given by the model
        reason: String,
    },

    /// JSON input could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WardenError {
    /// Build a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Build a field error
    #[must_use]
    pub fn field(model: impl Into<String>, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Field {
            model: model.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is an access denial
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }

    /// HTTP status code a web layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Forbidden { hidden: true, .. } => 404,
            Self::Forbidden { .. } => 403,
            Self::Field { .. } => 400,
            Self::Configuration { .. } | Self::Json(_) => 500,
        }
    }

    /// Stable error code for clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Forbidden { hidden: true, .. } => "NOT_FOUND",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::Field { .. } => "FIELD_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }
}
