use std::sync::Arc;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "config.batch_size")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "batcher_config", "batch_worker")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the request batcher.
///
/// The type is `Clone` because one batch-level failure is handed to every
/// caller in that batch.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The dispatcher failed for the whole batch. Every caller in the batch
    /// receives a clone of the same `Arc`.
    #[error("Dispatch failed: {0}")]
    Dispatch(Arc<anyhow::Error>),

    #[error("Dispatch returned {actual} results for a batch of {expected} requests")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Batcher is shut down")]
    ShutDown,

    #[error("Request was abandoned before a result was produced")]
    Abandoned,

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Wrap a dispatcher error so it can be shared across a batch.
    pub fn dispatch(err: anyhow::Error) -> Self {
        Error::Dispatch(Arc::new(err))
    }

    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The dispatcher's original error, if this is a dispatch failure.
    pub fn dispatch_source(&self) -> Option<&anyhow::Error> {
        match self {
            Error::Dispatch(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    /// True for failures that came from the batch as a whole
    /// (dispatcher error or result count mismatch).
    pub fn is_batch_failure(&self) -> bool {
        matches!(self, Error::Dispatch(_) | Error::CountMismatch { .. })
    }
}
