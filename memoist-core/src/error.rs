//! Error types for key derivation and memoized calls.

use thiserror::Error;

/// Errors raised while deriving a cache key. They surface synchronously,
/// before any computation runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("function identifier must not be empty")]
    EmptyFunctionId,

    #[error("unsupported argument type `{type_name}` at {path}")]
    UnsupportedArgumentType {
        path: String,
        type_name: &'static str,
    },

    #[error("duplicate key at {path}")]
    DuplicateKey { path: String },
}

/// Error returned by a memoized call.
///
/// `ComputationFailed` carries the wrapped callable's own error unchanged.
/// The same error (cloned) is handed to every caller that was waiting on the
/// failed computation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoError<E> {
    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    #[error("computation failed: {0}")]
    ComputationFailed(E),
}

impl<E> MemoError<E> {
    /// Returns the callable's error, if this is a computation failure.
    pub fn computation_error(&self) -> Option<&E> {
        match self {
            MemoError::ComputationFailed(e) => Some(e),
            MemoError::InvalidKey(_) => None,
        }
    }

    pub fn is_invalid_key(&self) -> bool {
        matches!(self, MemoError::InvalidKey(_))
    }
}

/// Re-export commonly used Result type
pub type Result<T> = std::result::Result<T, KeyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_error_messages() {
        let err = KeyError::UnsupportedArgumentType {
            path: "args[1]".to_string(),
            type_name: "set",
        };
        assert_eq!(err.to_string(), "unsupported argument type `set` at args[1]");
        assert_eq!(
            KeyError::DuplicateKey {
                path: "kwargs.x".to_string()
            }
            .to_string(),
            "duplicate key at kwargs.x"
        );
    }

    #[test]
    fn test_memo_error_wraps_key_error() {
        let err: MemoError<String> = KeyError::EmptyFunctionId.into();
        assert!(err.is_invalid_key());
        assert_eq!(err.to_string(), "function identifier must not be empty");
        assert!(err.computation_error().is_none());
    }

    #[test]
    fn test_computation_failed_keeps_error() {
        let err = MemoError::ComputationFailed("boom".to_string());
        assert_eq!(err.computation_error().map(String::as_str), Some("boom"));
        assert_eq!(err.to_string(), "computation failed: boom");
    }
}
