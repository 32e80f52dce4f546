//! Stage trait and pipeline runner
//!
//! Launch stages form an explicit ordered list driven by a fixed runner:
//! each stage receives the configuration, the entry-point command and a
//! [`Next`] handle to the remaining stages. A terminal stage simply never
//! calls `next`. Transitions are strictly linear per invocation; a fan-out
//! stage (sweep) invokes `next` once per branch, sequentially.

use crate::error::LaunchError;
use graft_config::ConfigValue;
use graft_runtime::{Instantiator, Scope, Value};
use std::fmt;
use std::sync::Arc;

/// Shared launch resources: the instantiation engine and the run scope
#[derive(Debug, Clone)]
pub struct LaunchContext {
    engine: Instantiator,
    scope: Arc<Scope>,
}

impl LaunchContext {
    /// Context with a fresh scope
    #[must_use]
    pub fn new(engine: Instantiator) -> Self {
        Self::with_scope(engine, Arc::new(Scope::new()))
    }

    /// Context over an externally-owned scope
    #[must_use]
    pub fn with_scope(engine: Instantiator, scope: Arc<Scope>) -> Self {
        Self { engine, scope }
    }

    /// The instantiation engine
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &Instantiator {
        &self.engine
    }

    /// The run-scoped singleton / memoization state
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }
}

/// One launch stage
pub trait Stage: Send + Sync + fmt::Debug {
    /// Stage name for diagnostics
    fn name(&self) -> &'static str;

    /// Process `config`, handing control to `next` zero or more times.
    ///
    /// # Errors
    /// Stage-specific; failures propagate uncaught to the caller.
    fn launch(
        &self,
        config: &ConfigValue,
        command: &str,
        next: Next<'_>,
    ) -> Result<Value, LaunchError>;
}

/// Handle to the remaining stages of the pipeline
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    context: &'a LaunchContext,
}

impl<'a> Next<'a> {
    /// Invoke the next stage in the list.
    ///
    /// # Errors
    /// [`LaunchError::NoTerminalStage`] when the list is exhausted, or
    /// whatever the invoked stage raises.
    pub fn launch(&self, config: &ConfigValue, command: &str) -> Result<Value, LaunchError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                tracing::debug!(stage = stage.name(), "entering stage");
                stage.launch(
                    config,
                    command,
                    Next {
                        stages: rest,
                        context: self.context,
                    },
                )
            }
            None => Err(LaunchError::NoTerminalStage),
        }
    }

    /// The shared launch resources
    #[inline]
    #[must_use]
    pub fn context(&self) -> &LaunchContext {
        self.context
    }
}

/// The fixed pipeline runner: an ordered stage list plus shared context
#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    context: LaunchContext,
}

impl Pipeline {
    /// Pipeline over an explicit stage list
    #[must_use]
    pub fn new(stages: Vec<Arc<dyn Stage>>, context: LaunchContext) -> Self {
        Self { stages, context }
    }

    /// The standard pipeline: Sweep → Parse → Log → Run
    #[must_use]
    pub fn standard(
        engine: Instantiator,
        parser: Arc<dyn graft_parser::ConfigParser>,
    ) -> Self {
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(crate::sweep::SweepStage),
            Arc::new(crate::parse::ParseStage::new(parser)),
            Arc::new(crate::log::LogStage),
            Arc::new(crate::run::RunStage),
        ];
        Self::new(stages, LaunchContext::new(engine))
    }

    /// Stage names, in order
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Drive `config` through every stage.
    ///
    /// # Errors
    /// The first stage failure; no partial results.
    pub fn launch(&self, config: &ConfigValue, command: &str) -> Result<Value, LaunchError> {
        Next {
            stages: &self.stages,
            context: &self.context,
        }
        .launch(config, command)
    }
}
