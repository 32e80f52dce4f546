//! Closed attribute registry
//!
//! Every name a configuration tree may construct must be registered here at
//! start-up: there is no ambient dotted-path import. [`Registry::resolve`]
//! looks a name up and fails with an attribute-resolution error otherwise.
//! An escape hatch for dynamic resolution exists but has to be opted into
//! explicitly ([`Registry::with_unsafe_fallback`]): resolved names are
//! trusted input.

use crate::error::RuntimeError;
use crate::instantiate::Instantiator;
use crate::scope::Scope;
use crate::value::{CallArgs, CallFn, Value};
use graft_config::ConfigMap;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Reserved action names the evaluation and singleton parsers rewrite into.
///
/// Part of the parsed-tree contract between `graft-parser` and this crate.
pub mod actions {
    /// Return the named attribute unevaluated, as a callable handle
    pub const IMPORT: &str = "graft.import";
    /// Bind arguments onto a callable without invoking it
    pub const PARTIAL: &str = "graft.partial";
    /// Defer an invocation until the enclosing callable runs
    pub const LAZY: &str = "graft.lazy";
    /// Get-or-create a keyed singleton through the scope
    pub const SINGLETON: &str = "graft.singleton";
    /// Keep a subtree as inert configuration data
    pub const CONFIG: &str = "graft.config";
}

/// A plain constructor: instantiated args/kwargs in, value out
pub type Constructor = Arc<CallFn>;

/// Dynamic fallback resolver, consulted only for unknown names
pub type FallbackResolver = dyn Fn(&str) -> Option<Entry> + Send + Sync;

/// Capability interface for types that build themselves from raw config.
///
/// Checked before default construction: an implementation receives the
/// mapping minus `_attr_` *uninstantiated*, together with the engine, so it
/// can decide which children to instantiate and which to keep as data.
pub trait BuildFromConfig: Send + Sync {
    /// Build a value from the raw mapping
    ///
    /// # Errors
    /// Implementation-defined.
    fn build_from_config(
        &self,
        config: &ConfigMap,
        engine: &Instantiator,
        scope: &Scope,
    ) -> Result<Value, RuntimeError>;
}

/// One registered attribute
#[derive(Clone)]
pub enum Entry {
    /// Plain constructor called with instantiated arguments
    Constructor(Constructor),
    /// Custom build-from-config capability
    FromConfig(Arc<dyn BuildFromConfig>),
    /// Reserved evaluation action interpreted by the engine
    Builtin(Builtin),
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructor(_) => f.write_str("Constructor"),
            Self::FromConfig(_) => f.write_str("FromConfig"),
            Self::Builtin(builtin) => write!(f, "Builtin({builtin:?})"),
        }
    }
}

/// Reserved evaluation actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `graft.import`
    Import,
    /// `graft.partial`
    Partial,
    /// `graft.lazy`
    Lazy,
    /// `graft.singleton`
    Singleton,
}

/// Name → entry table, write-once per name
pub struct Registry {
    entries: IndexMap<String, Entry>,
    fallback: Option<Arc<FallbackResolver>>,
}

impl Registry {
    /// Create an empty registry (no reserved actions)
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            fallback: None,
        }
    }

    /// Create a registry pre-populated with the reserved actions and the
    /// inert-data capability (`graft.config`)
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        // Infallible: the table is empty.
        let _ = registry.register(actions::IMPORT, Entry::Builtin(Builtin::Import));
        let _ = registry.register(actions::PARTIAL, Entry::Builtin(Builtin::Partial));
        let _ = registry.register(actions::LAZY, Entry::Builtin(Builtin::Lazy));
        let _ = registry.register(actions::SINGLETON, Entry::Builtin(Builtin::Singleton));
        let _ = registry.register(actions::CONFIG, Entry::FromConfig(Arc::new(RawConfig)));
        registry
    }

    /// Attach a dynamic fallback resolver.
    ///
    /// The fallback is consulted for names missing from the table. This
    /// reopens the closed world and the resolved names become trusted
    /// input, hence the explicit opt-in.
    #[must_use]
    pub fn with_unsafe_fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&str) -> Option<Entry> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// Register an entry under `name`.
    ///
    /// # Errors
    /// [`RuntimeError::DuplicateAttribute`] when `name` is already taken;
    /// deregister first to replace.
    pub fn register(&mut self, name: impl Into<String>, entry: Entry) -> Result<(), RuntimeError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(RuntimeError::DuplicateAttribute { name });
        }
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Register a plain constructor closure under `name`
    ///
    /// # Errors
    /// [`RuntimeError::DuplicateAttribute`] when `name` is already taken.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, ctor: F) -> Result<(), RuntimeError>
    where
        F: Fn(CallArgs, &Scope) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.register(name, Entry::Constructor(Arc::new(ctor)))
    }

    /// Register a build-from-config capability under `name`
    ///
    /// # Errors
    /// [`RuntimeError::DuplicateAttribute`] when `name` is already taken.
    pub fn register_from_config(
        &mut self,
        name: impl Into<String>,
        builder: Arc<dyn BuildFromConfig>,
    ) -> Result<(), RuntimeError> {
        self.register(name, Entry::FromConfig(builder))
    }

    /// Remove an entry, returning whether it existed
    pub fn deregister(&mut self, name: &str) -> bool {
        self.entries.shift_remove(name).is_some()
    }

    /// True when `name` is registered (fallback not consulted)
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Number of registered entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve `name` to its entry.
    ///
    /// # Errors
    /// [`RuntimeError::AttributeResolution`] when the name is unknown and no
    /// fallback matched.
    pub fn resolve(&self, name: &str) -> Result<Entry, RuntimeError> {
        if let Some(entry) = self.entries.get(name) {
            return Ok(entry.clone());
        }
        if let Some(fallback) = &self.fallback {
            if let Some(entry) = fallback(name) {
                tracing::debug!(name, "resolved attribute through fallback");
                return Ok(entry);
            }
        }
        Err(RuntimeError::attribute_resolution(name))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// The `graft.config` capability: keeps its subtree as inert data.
///
/// The value under the `config` key (or the whole mapping when absent) is
/// converted to data without recursive instantiation, so reserved keys
/// inside it stay plain keys.
#[derive(Debug, Clone, Copy)]
pub struct RawConfig;

impl BuildFromConfig for RawConfig {
    fn build_from_config(
        &self,
        config: &ConfigMap,
        _engine: &Instantiator,
        _scope: &Scope,
    ) -> Result<Value, RuntimeError> {
        match config.get("config") {
            Some(subtree) => Ok(Value::from(subtree)),
            None => Ok(Value::from(&graft_config::ConfigValue::Map(config.clone()))),
        }
    }
}
