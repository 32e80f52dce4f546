//! Graft Launcher
//!
//! Drives a configuration through the staged execution pipeline:
//! Sweep → Parse → Log → Run.
//!
//! # Core Concepts
//!
//! - [`Stage`] / [`Next`]: an explicit ordered stage list driven by a
//!   fixed runner, instead of runtime-nested wrapper objects
//! - [`SweepStage`]: Cartesian-product hyperparameter fan-out with
//!   branch-boundary scope clearing
//! - [`ParseStage`]: applies the parser chain, honoring the closed
//!   `parser:` policy key
//! - [`LogStage`]: flattened key/value diagnostics under `logging.level`
//! - [`RunStage`] / [`DryRunStage`]: terminal execution or inspection
//! - [`Pipeline`]: stage list + shared [`LaunchContext`]
//!
//! # Example
//!
//! ```rust
//! use graft_config::ConfigValue;
//! use graft_launcher::Pipeline;
//! use graft_parser::ChainParser;
//! use graft_runtime::{Instantiator, Registry, Value};
//! use std::sync::Arc;
//!
//! let mut registry = Registry::with_builtins();
//! registry
//!     .register_fn("answer", |_call, _scope| Ok(Value::Int(42)))
//!     .unwrap();
//! let pipeline = Pipeline::standard(
//!     Instantiator::new(Arc::new(registry)),
//!     Arc::new(ChainParser::standard(None)),
//! );
//!
//! let config = ConfigValue::from(serde_json::json!({
//!     "job": {"_attr_": "answer"}
//! }));
//! let result = pipeline.launch(&config, "job").unwrap();
//! assert_eq!(result, Value::Int(42));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
mod log;
mod parse;
mod run;
mod stage;
mod sweep;

pub use error::LaunchError;
pub use log::{LogLevel, LogStage};
pub use parse::{ParseStage, PARSER_KEY};
pub use run::{DryRunStage, RunStage};
pub use stage::{LaunchContext, Next, Pipeline, Stage};
pub use sweep::{SweepStage, HPARAMS_KEY};
