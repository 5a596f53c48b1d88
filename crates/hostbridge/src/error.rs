//! Error types of native class code
//!
//! Native hooks return [`NativeResult`]. The bridge converts every
//! [`NativeError`] into the host's error channel at the dispatch boundary;
//! [`NativeError::NotImplemented`] is not an error at all but the signal to
//! fall back to the host's default behavior.

use hostbridge_runtime::{HostError, HostException};

/// Result type of native hooks and methods
pub type NativeResult<T> = Result<T, NativeError>;

/// Native class error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    /// The class does not provide this behavior
    #[error("Not implemented")]
    NotImplemented,

    /// Domain exception raised by native code
    #[error("{class}: {message}")]
    Exception {
        /// Host exception class
        class: String,
        /// Message
        message: String,
        /// Exception code
        code: i64,
    },

    /// Type mismatch during conversion
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Invalid argument
    #[error("Argument error: {0}")]
    ArgumentError(String),

    /// Error raised by a host operation the native code performed
    #[error(transparent)]
    Host(#[from] HostError),
}

impl NativeError {
    /// Raise an exception of the given host class
    pub fn exception(class: impl Into<String>, message: impl Into<String>) -> Self {
        NativeError::Exception {
            class: class.into(),
            message: message.into(),
            code: 0,
        }
    }

    /// Raise a plain `Exception`
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::exception("Exception", message)
    }

    /// Check for the fallback signal
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, NativeError::NotImplemented)
    }
}

impl From<NativeError> for HostError {
    /// Conversion at the dispatch boundary.
    ///
    /// `NotImplemented` should have been handled by a fallback before getting
    /// here; if it leaks out it becomes a fatal error.
    fn from(error: NativeError) -> Self {
        match error {
            NativeError::Exception {
                class,
                message,
                code,
            } => HostError::Exception(HostException::new(class, message).with_code(code)),
            NativeError::TypeMismatch { .. } => HostError::exception("TypeError", error.to_string()),
            NativeError::ArgumentError(message) => HostError::exception("ArgumentCountError", message),
            NativeError::Host(error) => error,
            NativeError::NotImplemented => HostError::fatal("Native hook is not implemented"),
        }
    }
}

impl From<String> for NativeError {
    fn from(s: String) -> Self {
        NativeError::runtime(s)
    }
}

impl From<&str> for NativeError {
    fn from(s: &str) -> Self {
        NativeError::runtime(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_conversion() {
        let err: HostError = NativeError::exception("OutOfRangeException", "index 9").into();
        let exception = err.as_exception().unwrap();
        assert_eq!(exception.class, "OutOfRangeException");
        assert_eq!(exception.message, "index 9");
    }

    #[test]
    fn test_type_mismatch_becomes_type_error() {
        let err: HostError = NativeError::TypeMismatch {
            expected: "int".to_string(),
            got: "array".to_string(),
        }
        .into();
        assert_eq!(
            err.as_exception().map(|e| e.class.as_str()),
            Some("TypeError")
        );
    }

    #[test]
    fn test_host_error_passes_through() {
        let fatal = HostError::fatal("boom");
        let err: HostError = NativeError::from(fatal.clone()).into();
        assert_eq!(err, fatal);
    }
}
