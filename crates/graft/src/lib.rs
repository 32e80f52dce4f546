//! Graft
//!
//! Turns a declarative, nested configuration tree into a live object graph
//! and drives it through a staged execution pipeline across hyperparameter
//! variations.
//!
//! # Data flow
//!
//! ```text
//! raw tree → parser chain → parsed tree → launcher (sweep branches it)
//!              ↑ @refs, _eval_, _singleton_     → instantiate per branch → run
//! ```
//!
//! # Example
//!
//! ```rust
//! use graft::prelude::*;
//! use std::sync::Arc;
//!
//! let mut registry = Registry::with_builtins();
//! registry
//!     .register_fn("model", |call, _scope| {
//!         let dim = call.kwargs.get("dim").and_then(Value::as_int).unwrap_or(0);
//!         Ok(Value::Int(dim))
//!     })
//!     .unwrap();
//!
//! let config = ConfigValue::from(serde_json::json!({
//!     "dims": {"hidden": 128},
//!     "job": {"_attr_": "model", "dim": "@dims.hidden"}
//! }));
//! let result = graft::launch(&config, "job", Arc::new(registry)).unwrap();
//! assert_eq!(result, Value::Int(128));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub use graft_config::{
    depth_map, flatten, keys, merge, ConfigError, ConfigMap, ConfigPath, ConfigValue, Segment,
};
pub use graft_launcher::{
    DryRunStage, LaunchContext, LaunchError, LogLevel, LogStage, Next, ParseStage, Pipeline,
    RunStage, Stage, SweepStage, HPARAMS_KEY, PARSER_KEY,
};
pub use graft_parser::{
    ChainParser, ConfigParser, EvalMode, EvaluateParser, Interpolate, InterpolationParser,
    MacroParser, ParseError, ReferenceParser, ScopedParser, SingletonParser, REFERENCE_PREFIX,
};
pub use graft_runtime::{
    registry, BuildFromConfig, CallArgs, Callable, Instantiator, LazyArgument, Object, RawConfig,
    Registry, RuntimeError, Scope, Value,
};

use std::sync::Arc;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports for working with graft
pub mod prelude {
    //! One-stop imports: tree model, parser chain, runtime and pipeline
    pub use graft_config::{ConfigMap, ConfigValue};
    pub use graft_launcher::{LaunchError, Pipeline};
    pub use graft_parser::{ChainParser, ConfigParser, ParseError};
    pub use graft_runtime::{
        BuildFromConfig, CallArgs, Instantiator, Registry, RuntimeError, Scope, Value,
    };
}

/// Parse a configuration with the default chain
/// (references → evaluation → singletons; no interpolation service).
///
/// # Errors
/// Any [`ParseError`] the chain raises.
pub fn parse(config: &ConfigValue) -> Result<ConfigValue, ParseError> {
    ChainParser::standard(None).parse(config)
}

/// Instantiate a parsed configuration against `registry`, using `scope`
/// for singleton and memoization state.
///
/// # Errors
/// Any [`RuntimeError`] the engine raises.
pub fn instantiate(
    config: &ConfigValue,
    registry: Arc<Registry>,
    scope: &Scope,
) -> Result<Value, RuntimeError> {
    Instantiator::new(registry).instantiate(config, scope)
}

/// Drive `config` through the standard Sweep → Parse → Log → Run pipeline
/// and execute `command`.
///
/// # Errors
/// The first stage failure; no partial results.
pub fn launch(
    config: &ConfigValue,
    command: &str,
    registry: Arc<Registry>,
) -> Result<Value, LaunchError> {
    let pipeline = Pipeline::standard(
        Instantiator::new(registry),
        Arc::new(ChainParser::standard(None)),
    );
    pipeline.launch(config, command)
}
