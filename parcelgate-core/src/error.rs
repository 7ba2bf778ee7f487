//! Unified error handling system
//!
//! Structured error types carrying a context with an error id, the originating
//! component and recovery suggestions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type ParcelResult<T> = Result<T, ParcelError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type shared by the parcelgate crates
#[derive(Error, Debug)]
pub enum ParcelError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// The persisted session could not be read, written or removed
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },
}

impl ParcelError {
    pub fn context(&self) -> &ErrorContext {
        match self {
            ParcelError::Config { context, .. }
            | ParcelError::Storage { context, .. }
            | ParcelError::Validation { context, .. } => context,
        }
    }

    /// Storage failures may clear up on their own (disk full, file locked);
    /// configuration problems need a person.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ParcelError::Storage { .. })
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        let context = self.context();
        match self {
            ParcelError::Storage { .. } => {
                warn!(
                    error_id = %context.error_id,
                    component = %context.component,
                    operation = ?context.operation,
                    error = %self,
                    "Storage error (may be recoverable)"
                );
            }
            ParcelError::Config { .. } | ParcelError::Validation { .. } => {
                error!(
                    error_id = %context.error_id,
                    error = %self,
                    suggestions = ?context.recovery_suggestions,
                    "Configuration or validation error"
                );
            }
        }
    }
}

#[macro_export]
macro_rules! storage_error {
    ($msg:expr, $operation:expr) => {
        $crate::ParcelError::Storage {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new("session_store").with_operation($operation),
        }
    };
    ($msg:expr, $operation:expr, $source:expr) => {
        $crate::ParcelError::Storage {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new("session_store")
                .with_operation($operation)
                .with_suggestion("Check that the session file location is writable"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::ParcelError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}
