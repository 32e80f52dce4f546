//! Error types for the parser pipeline

use graft_config::ConfigError;
use graft_runtime::RuntimeError;

/// Errors raised while parsing a configuration tree
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A reference resolves, directly or transitively, to itself
    #[error("reference cycle detected at '@{reference}'")]
    ReferenceCycle {
        /// The irreducible reference path
        reference: String,
    },

    /// A reference names a path absent from the tree
    #[error("missing reference target '@{reference}'")]
    MissingReference {
        /// The unresolvable reference path
        reference: String,
    },

    /// Unsupported `_eval_` value
    #[error("invalid evaluation mode '{mode}' (expected call, partial, import or lazy)")]
    InvalidEvaluationMode {
        /// The offending mode string
        mode: String,
    },

    /// Malformed arguments on an `_eval_`- or `_singleton_`-tagged mapping
    #[error("invalid evaluation arguments: {reason}")]
    EvaluationArgument {
        /// What was wrong
        reason: String,
    },

    /// The interpolation service failed
    #[error("interpolation failed: {reason}")]
    Interpolation {
        /// Service-provided reason
        reason: String,
    },

    /// Malformed macro-bearing tree
    #[error("macro error: {reason}")]
    Macro {
        /// What was wrong
        reason: String,
    },

    /// Container-model error surfaced during parsing
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Runtime error surfaced while instantiating a macro namespace
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ParseError {
    /// Create an evaluation-argument error
    pub fn evaluation_argument(reason: impl Into<String>) -> Self {
        Self::EvaluationArgument {
            reason: reason.into(),
        }
    }

    /// Create an interpolation error
    pub fn interpolation(reason: impl Into<String>) -> Self {
        Self::Interpolation {
            reason: reason.into(),
        }
    }

    /// Create a macro error
    pub fn macro_error(reason: impl Into<String>) -> Self {
        Self::Macro {
            reason: reason.into(),
        }
    }
}
