//! Error types for store operations.

use std::fmt;

/// Result type for store operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error raised by an injected backend client.
///
/// The `retryable` flag is the backend protocol's transient marker (throttling,
/// transient network failure). The retry loop trusts it verbatim: no status
/// code or message inspection happens anywhere in this workspace.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    /// Stable error code, when the backend provides one.
    pub code: Option<String>,
    /// Message reported by the backend.
    pub message: String,
    /// Backend-attached transient marker. Absent means permanent.
    pub retryable: bool,
}

impl BackendError {
    /// Creates a permanent backend error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a backend error flagged as transient.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            retryable: true,
        }
    }

    /// Attaches the backend's error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// The kind of store error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing arguments, raised before any backend call.
    InvalidParameter,
    /// The backend answered, but the requested payload does not exist.
    NotFound,
    /// Failure reported by the backend client.
    Backend,
    /// Decompression or shape conversion failed on an otherwise valid response.
    Decode,
    /// The fallback backend failed after the primary already had.
    Fallback,
}

/// Structured context identifying a failed operation.
///
/// Attached to every surfaced error for diagnosis; never consulted for
/// control flow and never part of the error's identity.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorContext {
    /// Component that raised the error (e.g. "document", "object").
    pub component: &'static str,
    /// Logical operation name (e.g. "query", "get_object").
    pub operation: &'static str,
    /// Snapshot of the call's input parameters.
    pub input: serde_json::Value,
}

/// Error type surfaced by every store operation.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    retryable: bool,
    context: Option<ErrorContext>,
    primary: Option<Box<Error>>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: false,
            context: None,
            primary: None,
            source: None,
        }
    }

    /// Creates a parameter-validation error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameter, message)
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    /// Wraps a backend client failure, carrying its retryable flag forward.
    pub fn backend(error: BackendError) -> Self {
        Self {
            kind: ErrorKind::Backend,
            message: error.message.clone(),
            retryable: error.retryable,
            context: None,
            primary: None,
            source: Some(Box::new(error)),
        }
    }

    /// Wraps a fallback failure, embedding the primary backend's error.
    pub fn fallback(fallback: Error, primary: Error) -> Self {
        Self {
            kind: ErrorKind::Fallback,
            message: fallback.message.clone(),
            retryable: false,
            context: fallback.context.clone(),
            primary: Some(Box::new(primary)),
            source: Some(Box::new(fallback)),
        }
    }

    /// Attaches operation context. The kind and message are untouched.
    pub fn with_context(
        mut self,
        component: &'static str,
        operation: &'static str,
        input: serde_json::Value,
    ) -> Self {
        self.context = Some(ErrorContext {
            component,
            operation,
            input,
        });
        self
    }

    /// Adds a source error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if the backend flagged this error as transient.
    ///
    /// This is the retryability classifier: a binary, non-heuristic decision
    /// based solely on the backend-attached flag.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Returns the attached operation context, if any.
    pub fn context(&self) -> Option<&ErrorContext> {
        self.context.as_ref()
    }

    /// Returns the primary backend's error on a fallback failure.
    pub fn primary_error(&self) -> Option<&Error> {
        self.primary.as_deref()
    }
}

impl From<BackendError> for Error {
    fn from(error: BackendError) -> Self {
        Self::backend(error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(ref ctx) = self.context {
            write!(f, " ({}/{})", ctx.component, ctx.operation)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_carries_flag() {
        let permanent = Error::backend(BackendError::new("access denied"));
        assert_eq!(permanent.kind(), ErrorKind::Backend);
        assert!(!permanent.is_retryable());

        let transient = Error::backend(BackendError::retryable("throttled"));
        assert!(transient.is_retryable());
    }

    #[test]
    fn context_does_not_change_identity() {
        let plain = Error::invalid_parameter("table name is required");
        let enriched = Error::invalid_parameter("table name is required").with_context(
            "document",
            "query",
            serde_json::json!({"table": ""}),
        );

        assert_eq!(plain.kind(), enriched.kind());
        assert_eq!(plain.message(), enriched.message());
        assert_eq!(enriched.context().map(|c| c.operation), Some("query"));
    }

    #[test]
    fn fallback_embeds_primary() {
        let primary = Error::backend(BackendError::retryable("proxy unavailable"));
        let fallback = Error::backend(BackendError::new("table missing"));
        let surfaced = Error::fallback(fallback, primary);

        assert_eq!(surfaced.kind(), ErrorKind::Fallback);
        assert_eq!(surfaced.message(), "table missing");
        let attached = surfaced.primary_error().map(Error::message);
        assert_eq!(attached, Some("proxy unavailable"));
    }
}
