//! Error types for the launch pipeline

use graft_config::ConfigError;
use graft_parser::ParseError;
use graft_runtime::RuntimeError;

/// Errors raised while driving a configuration through the stage pipeline
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// Parser-pipeline failure
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Instantiation or execution failure
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Container-model failure (e.g. merging sweep overrides)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed `hparams` sub-config
    #[error("invalid hyperparameters: {reason}")]
    InvalidHparams {
        /// What was wrong
        reason: String,
    },

    /// Unrecognized `parser:` policy value
    #[error("invalid parser policy '{policy}' (expected 'none' or 'default')")]
    InvalidParserPolicy {
        /// The offending policy value
        policy: String,
    },

    /// The entry-point command does not lead to a value
    #[error("entry point '{command}' not found: {reason}")]
    EntryPoint {
        /// The dotted command path
        command: String,
        /// Why navigation failed
        reason: String,
    },

    /// The stage list ran out without a terminal stage
    #[error("launch pipeline has no terminal stage")]
    NoTerminalStage,
}

impl LaunchError {
    /// Create an invalid-hparams error
    pub fn invalid_hparams(reason: impl Into<String>) -> Self {
        Self::InvalidHparams {
            reason: reason.into(),
        }
    }

    /// Create an entry-point error
    pub fn entry_point(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EntryPoint {
            command: command.into(),
            reason: reason.into(),
        }
    }
}
