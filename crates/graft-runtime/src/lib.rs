//! Graft Runtime
//!
//! Turns parsed configuration trees into live object graphs.
//!
//! # Core Concepts
//!
//! - [`Value`]: runtime result: data, shared [`Object`]s, deferred
//!   [`Callable`]s and [`LazyArgument`] thunks
//! - [`Registry`]: closed name → constructor table populated at start-up,
//!   with the reserved evaluation actions under [`registry::actions`]
//! - [`BuildFromConfig`]: capability for types that construct themselves
//!   from raw config, checked before default construction
//! - [`Scope`]: run-scoped singleton + memoization state with an explicit
//!   `clear()` reset contract
//! - [`Instantiator`]: the recursive engine
//!
//! # Example
//!
//! ```rust
//! use graft_runtime::{Instantiator, Registry, Scope, Value};
//! use std::sync::Arc;
//!
//! let mut registry = Registry::with_builtins();
//! registry
//!     .register_fn("greeting", |call, _scope| {
//!         let name = call.kwargs.get("name").and_then(Value::as_str).unwrap_or("world");
//!         Ok(Value::Str(format!("hello {name}")))
//!     })
//!     .unwrap();
//!
//! let engine = Instantiator::new(Arc::new(registry));
//! let scope = Scope::new();
//! let config = graft_config::ConfigValue::from(serde_json::json!({
//!     "_attr_": "greeting",
//!     "name": "graft"
//! }));
//! let value = engine.instantiate(&config, &scope).unwrap();
//! assert_eq!(value, Value::Str("hello graft".into()));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
mod instantiate;
pub mod registry;
mod scope;
mod value;

pub use error::RuntimeError;
pub use instantiate::Instantiator;
pub use registry::{BuildFromConfig, Builtin, Constructor, Entry, RawConfig, Registry};
pub use scope::Scope;
pub use value::{CallArgs, CallFn, Callable, LazyArgument, Object, Value};
