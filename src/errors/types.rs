//! # Error Types
//!
//! Error taxonomy for the provisioning workflow using `thiserror`.

use std::fmt;

use serde::Serialize;

/// Custom result type for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Main error type for the provisioner
#[derive(thiserror::Error, Debug)]
pub enum ProvisionError {
    /// A referenced resource does not exist (admin secret, target group, ...)
    #[error("Resource not found: {resource_type} '{name}'")]
    NotFound { resource_type: String, name: String },

    /// A resource with the same name exists but is incompatible
    #[error("Resource conflict on {resource_type}: {message}")]
    Conflict { message: String, resource_type: String },

    /// Storage request above the autoscale ceiling
    #[error("Storage capacity exceeded: requested {requested_gb} GiB, ceiling is {ceiling_gb} GiB")]
    CapacityExceeded { requested_gb: u32, ceiling_gb: u32 },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Failure reported by an external platform collaborator
    #[error("Platform error during {operation}: {message}")]
    Platform { operation: String, message: String },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ProvisionError {
    /// Create a not found error
    pub fn not_found<R: Into<String>, N: Into<String>>(resource_type: R, name: N) -> Self {
        Self::NotFound { resource_type: resource_type.into(), name: name.into() }
    }

    /// Create a conflict error
    pub fn conflict<M: Into<String>, R: Into<String>>(message: M, resource_type: R) -> Self {
        Self::Conflict { message: message.into(), resource_type: resource_type.into() }
    }

    /// Create a capacity error
    pub fn capacity_exceeded(requested_gb: u32, ceiling_gb: u32) -> Self {
        Self::CapacityExceeded { requested_gb, ceiling_gb }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a platform error
    pub fn platform<O: Into<String>, M: Into<String>>(operation: O, message: M) -> Self {
        Self::Platform { operation: operation.into(), message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Whether re-running the whole unit may succeed without operator action
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProvisionError::Platform { .. })
    }

    /// Whether an operator has to intervene before a re-run can converge
    pub fn requires_operator(&self) -> bool {
        matches!(self, ProvisionError::Conflict { .. } | ProvisionError::CapacityExceeded { .. })
    }

    /// Short machine-readable kind, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisionError::NotFound { .. } => "not_found",
            ProvisionError::Conflict { .. } => "conflict",
            ProvisionError::CapacityExceeded { .. } => "capacity_exceeded",
            ProvisionError::Validation { .. } => "validation",
            ProvisionError::Config { .. } => "config",
            ProvisionError::Serialization { .. } => "serialization",
            ProvisionError::Platform { .. } => "platform",
            ProvisionError::Internal { .. } => "internal",
        }
    }
}

/// Non-fatal findings collected during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProvisionWarning {
    /// No private-subnet CIDRs were supplied; only the perimeter rule applies
    PolicyGap { message: String },
}

impl fmt::Display for ProvisionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionWarning::PolicyGap { message } => write!(f, "policy gap: {}", message),
        }
    }
}

impl From<serde_json::Error> for ProvisionError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<config::ConfigError> for ProvisionError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for ProvisionError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        // Errors inside nested sections are not field errors of the top level
        let message = if message.is_empty() { errors.to_string() } else { message };

        Self::validation(format!("Validation failed: {}", message))
    }
}
