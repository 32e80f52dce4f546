//! Log stage
//!
//! Emits flattened `key: value` diagnostics for the (already parsed)
//! configuration, one line per leaf, at the level selected by the
//! recognized `logging.level` option. Unrecognized levels warn once and
//! fall back to `info`.

use crate::error::LaunchError;
use crate::stage::{Next, Stage};
use graft_config::{flatten, ConfigValue};
use graft_runtime::Value;
use std::str::FromStr;

/// Recognized diagnostic levels for the `logging.level` option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// `trace`
    Trace,
    /// `debug`
    Debug,
    /// `info` (default)
    #[default]
    Info,
    /// `warn`
    Warn,
    /// `error`
    Error,
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(()),
        }
    }
}

impl LogLevel {
    fn emit(self, path: &str, value: &ConfigValue) {
        match self {
            Self::Trace => tracing::trace!("- {path}: {value}"),
            Self::Debug => tracing::debug!("- {path}: {value}"),
            Self::Info => tracing::info!("- {path}: {value}"),
            Self::Warn => tracing::warn!("- {path}: {value}"),
            Self::Error => tracing::error!("- {path}: {value}"),
        }
    }
}

/// The log stage
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStage;

impl LogStage {
    fn level(config: &ConfigValue) -> LogLevel {
        let Some(option) = config.get("logging").and_then(|node| node.get("level")) else {
            return LogLevel::default();
        };
        match option.as_str().map(LogLevel::from_str) {
            Some(Ok(level)) => level,
            _ => {
                tracing::warn!(
                    "unrecognized logging.level {option}, falling back to info"
                );
                LogLevel::default()
            }
        }
    }
}

impl Stage for LogStage {
    fn name(&self) -> &'static str {
        "log"
    }

    fn launch(
        &self,
        config: &ConfigValue,
        command: &str,
        next: Next<'_>,
    ) -> Result<Value, LaunchError> {
        let level = Self::level(config);
        for (path, value) in flatten(config) {
            level.emit(&path, &value);
        }
        next.launch(config, command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{LaunchContext, Pipeline};
    use graft_runtime::{Instantiator, Registry};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Terminal;

    impl Stage for Terminal {
        fn name(&self) -> &'static str {
            "terminal"
        }

        fn launch(
            &self,
            config: &ConfigValue,
            _command: &str,
            _next: Next<'_>,
        ) -> Result<Value, LaunchError> {
            Ok(Value::from(config))
        }
    }

    fn tree(value: serde_json::Value) -> ConfigValue {
        ConfigValue::from(value)
    }

    #[test]
    fn level_option_recognized() {
        assert_eq!(
            LogStage::level(&tree(serde_json::json!({"logging": {"level": "debug"}}))),
            LogLevel::Debug
        );
        assert_eq!(
            LogStage::level(&tree(serde_json::json!({"logging": {"level": "warning"}}))),
            LogLevel::Warn
        );
    }

    #[test]
    fn missing_or_unknown_level_defaults_to_info() {
        assert_eq!(LogStage::level(&tree(serde_json::json!({}))), LogLevel::Info);
        assert_eq!(
            LogStage::level(&tree(serde_json::json!({"logging": {"level": "loud"}}))),
            LogLevel::Info
        );
        assert_eq!(
            LogStage::level(&tree(serde_json::json!({"logging": {"level": 3}}))),
            LogLevel::Info
        );
    }

    #[test]
    fn config_passes_through_unchanged() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let engine = Instantiator::new(Arc::new(Registry::with_builtins()));
        let pipeline = Pipeline::new(
            vec![Arc::new(LogStage), Arc::new(Terminal)],
            LaunchContext::new(engine),
        );
        let config = tree(serde_json::json!({
            "logging": {"level": "trace"},
            "model": {"dim": 8}
        }));
        let result = pipeline.launch(&config, "").unwrap();
        assert_eq!(result, Value::from(&config));
    }
}
