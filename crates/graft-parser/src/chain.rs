//! Parser trait and composition
//!
//! A parser is a pure tree → tree transform. [`ChainParser`] applies
//! parsers in order; the default order is interpolation → reference
//! resolution → evaluation rewriting → singleton rewriting:
//!
//! - templates must expand before being read as references;
//! - references must resolve before evaluation rewriting (an `_eval_` node
//!   may reference other parts of the tree);
//! - singleton rewriting runs last so it wraps the fully rewritten
//!   constructor.

use crate::error::ParseError;
use crate::evaluate::EvaluateParser;
use crate::interpolate::{Interpolate, InterpolationParser};
use crate::reference::ReferenceParser;
use crate::singleton::SingletonParser;
use graft_config::ConfigValue;
use std::fmt;
use std::sync::Arc;

/// A pure configuration-tree transform
pub trait ConfigParser: Send + Sync + fmt::Debug {
    /// Produce a new tree from `config`.
    ///
    /// # Errors
    /// Parser-specific; see the concrete parser.
    fn parse(&self, config: &ConfigValue) -> Result<ConfigValue, ParseError>;
}

/// Ordered composition of parsers: `chain(config) = Pn(...P1(config))`
#[derive(Debug, Clone, Default)]
pub struct ChainParser {
    parsers: Vec<Arc<dyn ConfigParser>>,
}

impl ChainParser {
    /// Compose the given parsers, applied front to back
    #[must_use]
    pub fn new(parsers: Vec<Arc<dyn ConfigParser>>) -> Self {
        Self { parsers }
    }

    /// The default chain.
    ///
    /// Interpolation is a consumed service; pass `None` to skip that stage.
    #[must_use]
    pub fn standard(interpolator: Option<Arc<dyn Interpolate>>) -> Self {
        let mut parsers: Vec<Arc<dyn ConfigParser>> = Vec::with_capacity(4);
        if let Some(service) = interpolator {
            parsers.push(Arc::new(InterpolationParser::new(service)));
        }
        parsers.push(Arc::new(ReferenceParser::new()));
        parsers.push(Arc::new(EvaluateParser));
        parsers.push(Arc::new(SingletonParser));
        Self { parsers }
    }

    /// Append a parser to the chain
    pub fn push(&mut self, parser: Arc<dyn ConfigParser>) {
        self.parsers.push(parser);
    }

    /// Number of composed parsers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    /// True when the chain is empty (the identity transform)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl ConfigParser for ChainParser {
    fn parse(&self, config: &ConfigValue) -> Result<ConfigValue, ParseError> {
        let mut parsed = config.clone();
        for parser in &self.parsers {
            parsed = parser.parse(&parsed)?;
        }
        Ok(parsed)
    }
}

/// Applies an inner parser to exactly one key's subtree.
///
/// The rest of the tree is untouched; a tree without the key (or a
/// non-mapping tree) passes through unchanged.
#[derive(Debug, Clone)]
pub struct ScopedParser {
    key: String,
    inner: Arc<dyn ConfigParser>,
}

impl ScopedParser {
    /// Scope `inner` to the subtree under `key`
    pub fn new(key: impl Into<String>, inner: Arc<dyn ConfigParser>) -> Self {
        Self {
            key: key.into(),
            inner,
        }
    }
}

impl ConfigParser for ScopedParser {
    fn parse(&self, config: &ConfigValue) -> Result<ConfigValue, ParseError> {
        let Some(map) = config.as_map() else {
            return Ok(config.clone());
        };
        let Some(subtree) = map.get(&self.key) else {
            tracing::debug!(key = %self.key, "scoped parser: key absent, passing through");
            return Ok(config.clone());
        };
        let parsed = self.inner.parse(subtree)?;
        let mut out = map.clone();
        out.insert(self.key.clone(), parsed);
        Ok(ConfigValue::Map(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree(value: serde_json::Value) -> ConfigValue {
        ConfigValue::from(value)
    }

    #[derive(Debug)]
    struct AddOne;

    impl ConfigParser for AddOne {
        fn parse(&self, config: &ConfigValue) -> Result<ConfigValue, ParseError> {
            graft_config::depth_map(
                &mut |value| {
                    Ok(match value {
                        ConfigValue::Int(i) => ConfigValue::Int(i + 1),
                        other => other,
                    })
                },
                config,
            )
        }
    }

    #[test]
    fn chain_applies_in_order() {
        let chain = ChainParser::new(vec![Arc::new(AddOne), Arc::new(AddOne)]);
        let parsed = chain.parse(&tree(serde_json::json!({"x": 1}))).unwrap();
        assert_eq!(parsed, tree(serde_json::json!({"x": 3})));
    }

    #[test]
    fn empty_chain_is_identity() {
        let chain = ChainParser::default();
        assert!(chain.is_empty());
        let config = tree(serde_json::json!({"x": [1, 2]}));
        assert_eq!(chain.parse(&config).unwrap(), config);
    }

    #[test]
    fn standard_chain_resolves_then_rewrites() {
        let chain = ChainParser::standard(None);
        assert_eq!(chain.len(), 3);
        let parsed = chain
            .parse(&tree(serde_json::json!({
                "name": "model",
                "task": {"_attr_": "load", "_eval_": "partial", "which": "@name"}
            })))
            .unwrap();
        // The reference resolved before the evaluation rewrite consumed it.
        let task = parsed.get("task").unwrap();
        assert_eq!(task.get("_attr_"), Some(&ConfigValue::from("graft.partial")));
        assert_eq!(task.get("which"), Some(&ConfigValue::from("model")));
    }

    #[test]
    fn scoped_parser_touches_only_its_key() {
        let scoped = ScopedParser::new("inner", Arc::new(AddOne));
        let parsed = scoped
            .parse(&tree(serde_json::json!({"inner": {"x": 1}, "outer": 1})))
            .unwrap();
        assert_eq!(
            parsed,
            tree(serde_json::json!({"inner": {"x": 2}, "outer": 1}))
        );
    }

    #[test]
    fn scoped_parser_passes_through_without_key() {
        let scoped = ScopedParser::new("inner", Arc::new(AddOne));
        let config = tree(serde_json::json!({"outer": 1}));
        assert_eq!(scoped.parse(&config).unwrap(), config);
    }
}
