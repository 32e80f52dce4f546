//! Error types for the graft runtime

use graft_config::ConfigError;

/// Errors raised while resolving attributes, binding singletons or
/// instantiating a configuration tree
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Attribute name not present in the registry (and no fallback matched)
    #[error("unable to resolve attribute '{name}' (not in registry)")]
    AttributeResolution {
        /// The unresolved name
        name: String,
    },

    /// Attribute name registered twice
    #[error("attribute '{name}' already registered (deregister it first)")]
    DuplicateAttribute {
        /// The already-present name
        name: String,
    },

    /// Singleton key bound twice without an intervening clear
    #[error("singleton key '{key}' already bound (clear the scope first)")]
    SingletonConflict {
        /// The already-bound key
        key: String,
    },

    /// A value that cannot be invoked was used as a call target
    #[error("{what} is not callable")]
    NotCallable {
        /// Description of the offending value
        what: String,
    },

    /// Malformed arguments for a constructor or built-in action
    #[error("invalid arguments for '{name}': {reason}")]
    InvalidArguments {
        /// The call target
        name: String,
        /// What was wrong
        reason: String,
    },

    /// A value of an unexpected kind was encountered
    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        /// Expected kind
        expected: String,
        /// Actual kind
        found: String,
    },

    /// Container-model error surfaced during instantiation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failure inside a user-supplied constructor
    #[error(transparent)]
    Constructor(#[from] anyhow::Error),
}

impl RuntimeError {
    /// Create an attribute-resolution error
    pub fn attribute_resolution(name: impl Into<String>) -> Self {
        Self::AttributeResolution { name: name.into() }
    }

    /// Create an invalid-arguments error
    pub fn invalid_arguments(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            name: name.into(),
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

    /// Wrap a user-constructor failure with the constructor's name
    pub fn constructor(name: &str, source: anyhow::Error) -> Self {
        Self::Constructor(source.context(format!("constructor '{name}' failed")))
    }
}
