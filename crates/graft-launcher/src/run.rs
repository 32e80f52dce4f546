//! Terminal run stages
//!
//! [`RunStage`] instantiates the parsed configuration and executes the
//! named entry point: the command is a dotted path navigated through the
//! instantiated graph's mappings; a callable at the end of the path is
//! invoked with no arguments, and an empty command returns the graph
//! itself.
//!
//! [`DryRunStage`] is the inspection variant: it logs the parsed
//! configuration and returns it as data without instantiating anything.

use crate::error::LaunchError;
use crate::stage::{Next, Stage};
use graft_config::{flatten, ConfigValue};
use graft_runtime::{CallArgs, Scope, Value};

/// The terminal run stage
#[derive(Debug, Clone, Copy, Default)]
pub struct RunStage;

impl Stage for RunStage {
    fn name(&self) -> &'static str {
        "run"
    }

    fn launch(
        &self,
        config: &ConfigValue,
        command: &str,
        next: Next<'_>,
    ) -> Result<Value, LaunchError> {
        let context = next.context();
        let value = context.engine().instantiate(config, context.scope())?;
        execute(value, command, context.scope())
    }
}

/// Navigate `command` into `value` and invoke what it names
fn execute(value: Value, command: &str, scope: &Scope) -> Result<Value, LaunchError> {
    if command.is_empty() {
        return Ok(value);
    }
    let mut current = value;
    for part in command.split('.') {
        current = match current {
            Value::Map(map) => map.get(part).cloned().ok_or_else(|| {
                LaunchError::entry_point(command, format!("no entry '{part}'"))
            })?,
            other => {
                return Err(LaunchError::entry_point(
                    command,
                    format!("cannot navigate into {} at '{part}'", other.kind()),
                ));
            }
        };
    }
    match current {
        Value::Callable(callable) => {
            tracing::info!(command, "invoking entry point");
            Ok(callable.invoke(CallArgs::default(), scope)?)
        }
        other => Ok(other),
    }
}

/// Terminal stage that inspects instead of running
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunStage;

impl Stage for DryRunStage {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn launch(
        &self,
        config: &ConfigValue,
        command: &str,
        _next: Next<'_>,
    ) -> Result<Value, LaunchError> {
        for (path, value) in flatten(config) {
            tracing::info!("- {path}: {value}");
        }
        if !command.is_empty() {
            tracing::info!(command, "dry run, entry point not invoked");
        }
        Ok(Value::from(config))
    }
}
