//! Error types for the configuration tree model

/// Errors raised by container transforms and path parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Path string could not be parsed into segments
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path string
        path: String,
        /// Why parsing failed
        reason: String,
    },

    /// Key present in both sides of a merge with `allow_override = false`
    #[error("duplicate key '{key}' and allow_override = false (not allowed)")]
    DuplicateKey {
        /// The duplicated key
        key: String,
    },

    /// Incompatible container kinds encountered during a merge or resolve
    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        /// Expected container kind
        expected: String,
        /// Actual container kind
        found: String,
    },
}

impl ConfigError {
    /// Create an invalid-path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a type-mismatch error
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
