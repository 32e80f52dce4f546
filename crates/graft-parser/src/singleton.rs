//! Singleton rewriting
//!
//! Rewrites every `_singleton_`-tagged mapping into a `graft.singleton`
//! action whose `constructor` is a `graft.partial` over the mapping's
//! attribute, arguments and keywords. At instantiation time the scope
//! builds the underlying object at most once per key, and every occurrence
//! of the key anywhere in the graph receives the identical instance.
//!
//! Runs last in the default chain so it wraps the fully evaluation-rewritten
//! constructor.

use crate::chain::ConfigParser;
use crate::error::ParseError;
use graft_config::{depth_map, keys, ConfigMap, ConfigValue};
use graft_runtime::registry::actions;

/// The singleton parser
#[derive(Debug, Clone, Copy, Default)]
pub struct SingletonParser;

impl SingletonParser {
    fn rewrite(map: &ConfigMap) -> Result<ConfigValue, ParseError> {
        let key_value = &map[keys::SINGLETON];
        let key = key_value.as_str().ok_or_else(|| {
            ParseError::evaluation_argument(format!(
                "'{}' must be a string, got {}",
                keys::SINGLETON,
                key_value.kind()
            ))
        })?;
        let attr = match map.get(keys::ATTR) {
            Some(ConfigValue::Str(name)) => name.clone(),
            Some(other) => {
                return Err(ParseError::evaluation_argument(format!(
                    "'{}' must be a string, got {}",
                    keys::ATTR,
                    other.kind()
                )));
            }
            None => {
                return Err(ParseError::evaluation_argument(format!(
                    "missing '{}' under '{}'",
                    keys::ATTR,
                    keys::SINGLETON
                )));
            }
        };
        let args = match map.get(keys::ARGS) {
            None => Vec::new(),
            Some(ConfigValue::Seq(items)) => items.clone(),
            Some(other) => {
                return Err(ParseError::evaluation_argument(format!(
                    "'{}' must be a sequence, got {}",
                    keys::ARGS,
                    other.kind()
                )));
            }
        };

        let mut import = ConfigMap::new();
        import.insert(keys::ATTR.into(), ConfigValue::from(actions::IMPORT));
        import.insert(
            keys::ARGS.into(),
            ConfigValue::Seq(vec![ConfigValue::from(attr.as_str())]),
        );

        let mut constructor = ConfigMap::new();
        constructor.insert(keys::ATTR.into(), ConfigValue::from(actions::PARTIAL));
        let mut positional = vec![ConfigValue::Map(import)];
        positional.extend(args);
        constructor.insert(keys::ARGS.into(), ConfigValue::Seq(positional));
        for (kwarg, value) in map {
            if !keys::is_reserved(kwarg) {
                constructor.insert(kwarg.clone(), value.clone());
            }
        }

        let mut out = ConfigMap::new();
        out.insert(keys::ATTR.into(), ConfigValue::from(actions::SINGLETON));
        out.insert("key".into(), ConfigValue::from(key));
        out.insert("constructor".into(), ConfigValue::Map(constructor));
        Ok(ConfigValue::Map(out))
    }
}

impl ConfigParser for SingletonParser {
    fn parse(&self, config: &ConfigValue) -> Result<ConfigValue, ParseError> {
        depth_map(
            &mut |value| match &value {
                ConfigValue::Map(map) if map.contains_key(keys::SINGLETON) => Self::rewrite(map),
                _ => Ok(value),
            },
            config,
        )
    }
}
