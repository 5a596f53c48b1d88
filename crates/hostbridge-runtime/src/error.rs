//! Host error channel
//!
//! The host distinguishes two ways an operation can fail: a *fatal* error,
//! which aborts the current request, and an *exception*, which user code can
//! catch. Notices and warnings are not failures at all; they are reported
//! through the executor globals (see [`crate::executor`]) and execution goes on.

use std::fmt;

/// Result type for every host operation and callback
pub type HostResult<T> = Result<T, HostError>;

/// Severity levels of the host error reporting channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorLevel {
    /// Unrecoverable error (E_ERROR)
    Error,
    /// Run-time warning (E_WARNING)
    Warning,
    /// Run-time notice (E_NOTICE)
    Notice,
    /// Error raised while the engine itself was starting up (E_CORE_ERROR)
    CoreError,
    /// Deprecation notice (E_DEPRECATED)
    Deprecated,
}

impl ErrorLevel {
    /// Convert the level to the host bitmask value
    pub fn to_bitmask(self) -> u32 {
        match self {
            ErrorLevel::Error => 1,
            ErrorLevel::Warning => 2,
            ErrorLevel::Notice => 8,
            ErrorLevel::CoreError => 16,
            ErrorLevel::Deprecated => 8192,
        }
    }

    /// Human readable label used in reported messages
    pub fn label(self) -> &'static str {
        match self {
            ErrorLevel::Error => "Fatal error",
            ErrorLevel::Warning => "Warning",
            ErrorLevel::Notice => "Notice",
            ErrorLevel::CoreError => "Core error",
            ErrorLevel::Deprecated => "Deprecated",
        }
    }
}

impl fmt::Display for ErrorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A user-catchable exception travelling through the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostException {
    /// Exception class name (e.g. "RuntimeException")
    pub class: String,
    /// Exception message
    pub message: String,
    /// Exception code
    pub code: i64,
}

impl HostException {
    /// Create a new exception of the given class
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
            code: 0,
        }
    }

    /// Set the exception code
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }
}

impl fmt::Display for HostException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

/// Failure of a host operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// Request-aborting error (the host's E_ERROR channel)
    #[error("Fatal error: {0}")]
    Fatal(String),

    /// Exception thrown into user space
    #[error("Uncaught {0}")]
    Exception(HostException),
}

impl HostError {
    /// Build a fatal error
    pub fn fatal(message: impl Into<String>) -> Self {
        HostError::Fatal(message.into())
    }

    /// Build an exception of the given class
    pub fn exception(class: impl Into<String>, message: impl Into<String>) -> Self {
        HostError::Exception(HostException::new(class, message))
    }

    /// Check if this error aborts the request
    pub fn is_fatal(&self) -> bool {
        matches!(self, HostError::Fatal(_))
    }

    /// Get the exception, if this error is one
    pub fn as_exception(&self) -> Option<&HostException> {
        match self {
            HostError::Exception(exception) => Some(exception),
            HostError::Fatal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let fatal = HostError::fatal("Unable to instantiate Foo");
        assert_eq!(fatal.to_string(), "Fatal error: Unable to instantiate Foo");
        assert!(fatal.is_fatal());

        let exception = HostError::exception("RuntimeException", "boom");
        assert_eq!(exception.to_string(), "Uncaught RuntimeException: boom");
        assert!(!exception.is_fatal());
        assert_eq!(exception.as_exception().map(|e| e.code), Some(0));
    }

    #[test]
    fn test_error_level_bitmask() {
        assert_eq!(ErrorLevel::Error.to_bitmask(), 1);
        assert_eq!(ErrorLevel::Warning.to_bitmask(), 2);
        assert_eq!(ErrorLevel::Notice.to_bitmask(), 8);
    }
}
