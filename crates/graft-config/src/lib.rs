//! Graft Container Model
//!
//! The configuration tree every other graft crate operates on: a tagged
//! union of JSON-compatible scalars, ordered sequences and order-preserving
//! string-keyed mappings, plus the depth-first transforms (map / flatten /
//! merge) and the dotted/bracketed path syntax used by cross-references.
//!
//! # Core Concepts
//!
//! - [`ConfigValue`]: the tree node type, convertible to and from
//!   `serde_json::Value` and (de)serializable with any serde format
//! - [`keys`]: the reserved key names forming the wire contract
//!   (`_attr_`, `_args_`, `_eval_`, `_singleton_`, `_memoization_key_`)
//! - [`ConfigPath`]: `model.dim` / `list[2].x` paths into the tree
//! - [`depth_map`] / [`flatten`] / [`merge`]: structural transforms
//!
//! # Example
//!
//! ```rust
//! use graft_config::{merge, ConfigValue};
//!
//! let base = ConfigValue::from(serde_json::json!({"x": 1}));
//! let overrides = ConfigValue::from(serde_json::json!({"y": 2}));
//! let merged = merge(&base, &overrides, false).unwrap();
//! assert_eq!(merged, ConfigValue::from(serde_json::json!({"x": 1, "y": 2})));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod keys;
mod nest;
mod path;
mod value;

pub use error::ConfigError;
pub use nest::{depth_map, flatten, merge};
pub use path::{ConfigPath, Segment};
pub use value::{ConfigMap, ConfigValue};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
