//! Macro namespace resolution
//!
//! A macro-bearing tree has exactly two top-level keys: `_macro_` (a
//! self-contained namespace, itself instantiable) and `_config_` (the main
//! tree). The namespace is instantiated with a parse-local scope,
//! references to its keys are resolved inside `_config_` with a key-subset
//! restriction, and the namespace is merged into the result under a
//! configurable override policy.

use crate::chain::ConfigParser;
use crate::error::ParseError;
use crate::reference::ReferenceParser;
use graft_config::{keys, merge, ConfigError, ConfigMap, ConfigValue};
use graft_runtime::{Instantiator, Scope};

/// The macro parser
#[derive(Debug, Clone)]
pub struct MacroParser {
    engine: Instantiator,
    allow_override: bool,
}

impl MacroParser {
    /// Macro parser instantiating namespaces through `engine`.
    ///
    /// Macros may override config keys by default.
    #[must_use]
    pub fn new(engine: Instantiator) -> Self {
        Self {
            engine,
            allow_override: true,
        }
    }

    /// Set whether macro keys may override keys already in the config
    #[must_use]
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    /// Instantiate the `_macro_` subtree into a data mapping
    fn resolve_namespace(&self, node: &ConfigValue) -> Result<ConfigMap, ParseError> {
        let scope = Scope::new();
        let value = self.engine.instantiate(node, &scope)?;
        match value.try_into_config()? {
            ConfigValue::Map(map) => Ok(map),
            other => Err(ParseError::Config(ConfigError::type_mismatch(
                "mapping",
                other.kind(),
            ))),
        }
    }
}

impl ConfigParser for MacroParser {
    fn parse(&self, config: &ConfigValue) -> Result<ConfigValue, ParseError> {
        let Some(map) = config.as_map() else {
            return Ok(config.clone());
        };
        if !map.contains_key(keys::MACRO) && !map.contains_key(keys::CONFIG) {
            tracing::debug!("no macro or config key found, passing through");
            return Ok(config.clone());
        }
        if let Some(unexpected) = map
            .keys()
            .find(|key| key.as_str() != keys::MACRO && key.as_str() != keys::CONFIG)
        {
            return Err(ParseError::macro_error(format!(
                "unexpected key '{unexpected}' (expected only '{}' and '{}')",
                keys::MACRO,
                keys::CONFIG
            )));
        }

        let Some(subconfig) = map.get(keys::CONFIG) else {
            tracing::warn!("macro without '{}' key produces an empty config", keys::CONFIG);
            return Ok(ConfigValue::Map(ConfigMap::new()));
        };

        let namespace = match map.get(keys::MACRO) {
            Some(node) => self.resolve_namespace(node)?,
            None => ConfigMap::new(),
        };

        // Resolve macro references inside the config subtree only: the
        // namespace keys become the resolution roots.
        let macro_keys: Vec<String> = namespace.keys().cloned().collect();
        let mut combined = ConfigMap::new();
        combined.insert(keys::CONFIG.to_string(), subconfig.clone());
        for (key, value) in &namespace {
            combined.insert(key.clone(), value.clone());
        }
        let resolver = ReferenceParser::new().restricted_to(macro_keys);
        let resolved = resolver.parse(&ConfigValue::Map(combined))?;
        let resolved_config = resolved
            .get(keys::CONFIG)
            .cloned()
            .unwrap_or(ConfigValue::Map(ConfigMap::new()));

        merge(
            &resolved_config,
            &ConfigValue::Map(namespace),
            self.allow_override,
        )
        .map_err(Into::into)
    }
}
