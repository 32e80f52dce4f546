//! Graft Parser Pipeline
//!
//! Pure tree → tree transforms that turn a raw configuration into the
//! canonical form the instantiation engine consumes.
//!
//! # Core Concepts
//!
//! - [`ConfigParser`]: the transform trait
//! - [`ChainParser`]: ordered composition; [`ChainParser::standard`] is
//!   interpolation → references → evaluation → singletons
//! - [`ReferenceParser`]: `@path` substitution with cycle detection
//! - [`EvaluateParser`]: `_eval_` modes (call / partial / import / lazy)
//! - [`SingletonParser`]: `_singleton_` rewriting into scope calls
//! - [`ScopedParser`] / [`MacroParser`]: sub-tree scoping and macro
//!   namespaces
//! - [`Interpolate`]: the consumed `${expr}` substitution service
//!
//! # Example
//!
//! ```rust
//! use graft_config::ConfigValue;
//! use graft_parser::{ChainParser, ConfigParser};
//!
//! let chain = ChainParser::standard(None);
//! let config = ConfigValue::from(serde_json::json!({"x": 1, "y": "@x"}));
//! let parsed = chain.parse(&config).unwrap();
//! assert_eq!(parsed.get("y"), Some(&ConfigValue::Int(1)));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod chain;
pub mod error;
mod evaluate;
mod interpolate;
mod macros;
mod reference;
mod singleton;

pub use chain::{ChainParser, ConfigParser, ScopedParser};
pub use error::ParseError;
pub use evaluate::{EvalMode, EvaluateParser};
pub use interpolate::{Interpolate, InterpolationParser};
pub use macros::MacroParser;
pub use reference::{ReferenceParser, REFERENCE_PREFIX};
pub use singleton::SingletonParser;
