//! Parse stage
//!
//! Applies the configured parser chain to the branch's configuration. The
//! `parser:` policy key in the config can disable parsing for one launch
//! (`parser: "none"`); the key is removed before the chain runs. Policies
//! form a closed set; custom chains are supplied programmatically when the
//! pipeline is built.

use crate::error::LaunchError;
use crate::stage::{Next, Stage};
use graft_config::ConfigValue;
use graft_parser::ConfigParser;
use graft_runtime::Value;
use std::fmt;
use std::sync::Arc;

/// Key holding the per-launch parser policy
pub const PARSER_KEY: &str = "parser";

/// The parse stage
#[derive(Clone)]
pub struct ParseStage {
    parser: Option<Arc<dyn ConfigParser>>,
}

impl ParseStage {
    /// Parse with the given chain
    #[must_use]
    pub fn new(parser: Arc<dyn ConfigParser>) -> Self {
        Self {
            parser: Some(parser),
        }
    }

    /// Never parse: configs pass through unchanged
    #[must_use]
    pub fn passthrough() -> Self {
        Self { parser: None }
    }
}

impl fmt::Debug for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseStage")
            .field("parser", &self.parser)
            .finish()
    }
}

impl Stage for ParseStage {
    fn name(&self) -> &'static str {
        "parse"
    }

    fn launch(
        &self,
        config: &ConfigValue,
        command: &str,
        next: Next<'_>,
    ) -> Result<Value, LaunchError> {
        let mut config = config.clone();
        let mut policy_skip = false;

        if let ConfigValue::Map(map) = &mut config {
            if let Some(policy) = map.shift_remove(PARSER_KEY) {
                match policy.as_str() {
                    Some("none") => policy_skip = true,
                    Some("default") => {}
                    _ => {
                        return Err(LaunchError::InvalidParserPolicy {
                            policy: policy.to_string(),
                        });
                    }
                }
            }
        }

        match &self.parser {
            Some(parser) if !policy_skip => {
                tracing::debug!(parser = ?parser, "parsing config");
                let parsed = parser.parse(&config)?;
                next.launch(&parsed, command)
            }
            _ => {
                tracing::debug!("parse stage skipped by policy");
                next.launch(&config, command)
            }
        }
    }
}
