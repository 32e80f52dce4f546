//! Recursive instantiation engine
//!
//! Converts a fully-parsed configuration tree into runtime values. The
//! engine is a pure function of the tree except for singleton and lazy
//! side effects, whose lifetime is the [`Scope`] passed in.
//!
//! Dispatch order for an `_attr_`-tagged mapping:
//! 1. resolve the name through the [`Registry`];
//! 2. a [`BuildFromConfig`] capability receives the raw mapping (minus
//!    `_attr_`) and decides itself what to instantiate;
//! 3. otherwise `_args_` and the remaining keys are instantiated
//!    recursively and the constructor is called.
//!
//! [`BuildFromConfig`]: crate::registry::BuildFromConfig

use crate::error::RuntimeError;
use crate::registry::{actions, Builtin, Entry, Registry};
use crate::scope::Scope;
use crate::value::{CallArgs, Callable, LazyArgument, Value};
use graft_config::{keys, ConfigMap, ConfigValue};
use indexmap::IndexMap;
use std::sync::Arc;

/// The recursive instantiation engine
#[derive(Debug, Clone)]
pub struct Instantiator {
    registry: Arc<Registry>,
}

impl Instantiator {
    /// Create an engine over a frozen registry
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// The backing registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Instantiate a parsed tree into a runtime value.
    ///
    /// # Errors
    /// Attribute resolution, argument validation and constructor failures
    /// propagate; no partial result is produced.
    pub fn instantiate(&self, node: &ConfigValue, scope: &Scope) -> Result<Value, RuntimeError> {
        match node {
            ConfigValue::Map(map) => {
                if let Some(attr) = map.get(keys::ATTR) {
                    let name = attr
                        .as_str()
                        .ok_or_else(|| RuntimeError::type_mismatch("string", attr.kind()))?;
                    self.construct(name, map, scope)
                } else {
                    let mut out = IndexMap::with_capacity(map.len());
                    for (key, child) in map {
                        out.insert(key.clone(), self.instantiate(child, scope)?);
                    }
                    Ok(Value::Map(out))
                }
            }
            ConfigValue::Seq(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.instantiate(item, scope)?);
                }
                Ok(Value::Seq(out))
            }
            scalar => Ok(Value::from(scalar)),
        }
    }

    fn construct(
        &self,
        name: &str,
        map: &ConfigMap,
        scope: &Scope,
    ) -> Result<Value, RuntimeError> {
        match self.registry.resolve(name)? {
            Entry::FromConfig(builder) => {
                let rest: ConfigMap = map
                    .iter()
                    .filter(|(key, _)| key.as_str() != keys::ATTR)
                    .map(|(key, child)| (key.clone(), child.clone()))
                    .collect();
                builder.build_from_config(&rest, self, scope)
            }
            Entry::Constructor(ctor) => {
                tracing::trace!(name, "calling constructor");
                let call = self.call_args(map, scope)?;
                ctor(call, scope)
            }
            Entry::Builtin(builtin) => {
                let call = self.call_args(map, scope)?;
                apply_builtin(&self.registry, builtin, call, scope)
            }
        }
    }

    /// Instantiate `_args_` and the non-reserved keys of a tagged mapping
    fn call_args(&self, map: &ConfigMap, scope: &Scope) -> Result<CallArgs, RuntimeError> {
        let args = match map.get(keys::ARGS) {
            None => Vec::new(),
            Some(ConfigValue::Seq(items)) => items
                .iter()
                .map(|item| self.instantiate(item, scope))
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(RuntimeError::type_mismatch("sequence", other.kind()));
            }
        };
        let mut kwargs = IndexMap::new();
        for (key, child) in map {
            if !keys::is_reserved(key) {
                kwargs.insert(key.clone(), self.instantiate(child, scope)?);
            }
        }
        Ok(CallArgs { args, kwargs })
    }
}

fn apply_builtin(
    registry: &Arc<Registry>,
    builtin: Builtin,
    call: CallArgs,
    scope: &Scope,
) -> Result<Value, RuntimeError> {
    match builtin {
        Builtin::Import => builtin_import(registry, call),
        Builtin::Partial => builtin_partial(call),
        Builtin::Lazy => builtin_lazy(call),
        Builtin::Singleton => builtin_singleton(call, scope),
    }
}

/// `graft.import`: one positional name, resolved to an unevaluated handle
fn builtin_import(registry: &Arc<Registry>, call: CallArgs) -> Result<Value, RuntimeError> {
    if call.args.len() != 1 || !call.kwargs.is_empty() {
        return Err(RuntimeError::invalid_arguments(
            actions::IMPORT,
            "expected exactly one positional attribute name",
        ));
    }
    let target = call.args[0]
        .as_str()
        .ok_or_else(|| RuntimeError::type_mismatch("string", call.args[0].kind()))?;
    import_callable(registry, target)
}

/// Resolve `target` into a callable handle without invoking it
fn import_callable(registry: &Arc<Registry>, target: &str) -> Result<Value, RuntimeError> {
    match registry.resolve(target)? {
        Entry::Constructor(ctor) => Ok(Value::Callable(Callable::from_arc(target, ctor))),
        Entry::Builtin(builtin) => Ok(builtin_as_callable(registry, builtin)),
        Entry::FromConfig(_) => Err(RuntimeError::NotCallable {
            what: format!("attribute '{target}' (build-from-config capability)"),
        }),
    }
}

/// Callable form of a reserved action, so actions themselves can be the
/// target of an import (e.g. a singleton wrapping an already-rewritten
/// partial node).
fn builtin_as_callable(registry: &Arc<Registry>, builtin: Builtin) -> Value {
    let callable = match builtin {
        Builtin::Import => {
            let registry = Arc::clone(registry);
            Callable::new(actions::IMPORT, move |call, _scope| {
                builtin_import(&registry, call)
            })
        }
        Builtin::Partial => {
            Callable::new(actions::PARTIAL, |call, _scope| builtin_partial(call))
        }
        Builtin::Lazy => Callable::new(actions::LAZY, |call, _scope| builtin_lazy(call)),
        Builtin::Singleton => {
            Callable::new(actions::SINGLETON, |call, scope| builtin_singleton(call, scope))
        }
    };
    Value::Callable(callable)
}

/// `graft.partial`: bind the remaining arguments onto the first one
fn builtin_partial(mut call: CallArgs) -> Result<Value, RuntimeError> {
    if call.args.is_empty() {
        return Err(RuntimeError::invalid_arguments(
            actions::PARTIAL,
            "expected a callable first argument",
        ));
    }
    let target = call.args.remove(0);
    match target {
        Value::Callable(callable) => Ok(Value::Callable(callable.bind(call))),
        other => Err(RuntimeError::NotCallable {
            what: format!("partial target of kind {}", other.kind()),
        }),
    }
}

/// `graft.lazy`: wrap a constructor into a call-time thunk
fn builtin_lazy(mut call: CallArgs) -> Result<Value, RuntimeError> {
    let constructor = call.expect_kwarg(actions::LAZY, "constructor")?;
    let memo_key = match call.take_kwarg("key") {
        None => None,
        Some(Value::Str(key)) => Some(key),
        Some(other) => {
            return Err(RuntimeError::type_mismatch("string", other.kind()));
        }
    };
    call.expect_consumed(actions::LAZY)?;
    match constructor {
        Value::Callable(callable) => {
            Ok(Value::Lazy(Arc::new(LazyArgument::new(callable, memo_key))))
        }
        other => Err(RuntimeError::NotCallable {
            what: format!("lazy constructor of kind {}", other.kind()),
        }),
    }
}

/// `graft.singleton`: get-or-create through the scope
fn builtin_singleton(mut call: CallArgs, scope: &Scope) -> Result<Value, RuntimeError> {
    let key = match call.expect_kwarg(actions::SINGLETON, "key")? {
        Value::Str(key) => key,
        other => {
            return Err(RuntimeError::type_mismatch("string", other.kind()));
        }
    };
    let constructor = call.expect_kwarg(actions::SINGLETON, "constructor")?;
    call.expect_consumed(actions::SINGLETON)?;
    match constructor {
        Value::Callable(callable) => {
            scope.get_or_create(&key, || callable.invoke(CallArgs::default(), scope))
        }
        other => Err(RuntimeError::NotCallable {
            what: format!("singleton constructor of kind {}", other.kind()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tree(value: serde_json::Value) -> ConfigValue {
        ConfigValue::from(value)
    }

    /// Registry with builtins plus a couple of plain constructors
    fn test_registry() -> (Registry, Arc<AtomicUsize>) {
        let mut registry = Registry::with_builtins();
        let unit_calls = Arc::new(AtomicUsize::new(0));

        registry
            .register_fn("join", |call, _scope| {
                let sep = call
                    .kwargs
                    .get("sep")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                let parts: Vec<&str> = call
                    .args
                    .iter()
                    .map(|value| value.as_str().unwrap_or("?"))
                    .collect();
                Ok(Value::Str(parts.join(sep)))
            })
            .unwrap();

        let calls = Arc::clone(&unit_calls);
        registry
            .register_fn("unit", move |_call, _scope| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Object(crate::value::Object::new(())))
            })
            .unwrap();

        (registry, unit_calls)
    }

    fn engine() -> (Instantiator, Arc<AtomicUsize>) {
        let (registry, unit_calls) = test_registry();
        (Instantiator::new(Arc::new(registry)), unit_calls)
    }

    #[test]
    fn scalars_pass_through() {
        let (engine, _) = engine();
        let scope = Scope::new();
        assert_eq!(
            engine.instantiate(&tree(serde_json::json!(3)), &scope).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            engine.instantiate(&ConfigValue::Null, &scope).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn untagged_mapping_becomes_keyword_collection() {
        let (engine, _) = engine();
        let scope = Scope::new();
        let value = engine
            .instantiate(&tree(serde_json::json!({"x": 1, "items": [true]})), &scope)
            .unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map.get("x"), Some(&Value::Int(1)));
        assert_eq!(map.get("items"), Some(&Value::Seq(vec![Value::Bool(true)])));
    }

    #[test]
    fn constructor_call_with_args_and_kwargs() {
        let (engine, _) = engine();
        let scope = Scope::new();
        let value = engine
            .instantiate(
                &tree(serde_json::json!({
                    "_attr_": "join",
                    "_args_": ["a", "b"],
                    "sep": "-"
                })),
                &scope,
            )
            .unwrap();
        assert_eq!(value, Value::Str("a-b".into()));
    }

    #[test]
    fn nested_arguments_instantiate_first() {
        let (engine, _) = engine();
        let scope = Scope::new();
        let value = engine
            .instantiate(
                &tree(serde_json::json!({
                    "_attr_": "join",
                    "_args_": [{"_attr_": "join", "_args_": ["x", "y"]}, "z"]
                })),
                &scope,
            )
            .unwrap();
        assert_eq!(value, Value::Str("xyz".into()));
    }

    #[test]
    fn unknown_attribute_fails() {
        let (engine, _) = engine();
        let scope = Scope::new();
        let result = engine.instantiate(&tree(serde_json::json!({"_attr_": "ghost"})), &scope);
        assert!(matches!(
            result,
            Err(RuntimeError::AttributeResolution { ref name }) if name == "ghost"
        ));
    }

    #[test]
    fn import_yields_unevaluated_handle() {
        let (engine, _) = engine();
        let scope = Scope::new();
        let value = engine
            .instantiate(
                &tree(serde_json::json!({"_attr_": "graft.import", "_args_": ["join"]})),
                &scope,
            )
            .unwrap();
        let callable = value.as_callable().expect("callable handle");
        assert_eq!(callable.name(), "join");
        let result = callable
            .invoke(
                CallArgs::positional(vec![Value::Str("h".into()), Value::Str("i".into())]),
                &scope,
            )
            .unwrap();
        assert_eq!(result, Value::Str("hi".into()));
    }

    #[test]
    fn import_of_an_action_is_callable() {
        let (engine, _) = engine();
        let scope = Scope::new();
        let value = engine
            .instantiate(
                &tree(serde_json::json!({
                    "_attr_": "graft.import",
                    "_args_": ["graft.partial"]
                })),
                &scope,
            )
            .unwrap();
        let partial_fn = value.as_callable().expect("action handle");
        let join = engine
            .instantiate(
                &tree(serde_json::json!({"_attr_": "graft.import", "_args_": ["join"]})),
                &scope,
            )
            .unwrap();
        let bound = partial_fn
            .invoke(
                CallArgs::positional(vec![join, Value::Str("a".into())]),
                &scope,
            )
            .unwrap();
        let result = bound
            .call(CallArgs::positional(vec![Value::Str("b".into())]), &scope)
            .unwrap();
        assert_eq!(result, Value::Str("ab".into()));
    }

    #[test]
    fn import_rejects_extra_arguments() {
        let (engine, _) = engine();
        let scope = Scope::new();
        let result = engine.instantiate(
            &tree(serde_json::json!({
                "_attr_": "graft.import",
                "_args_": ["join", "extra"]
            })),
            &scope,
        );
        assert!(matches!(result, Err(RuntimeError::InvalidArguments { .. })));
    }

    #[test]
    fn partial_defers_invocation() {
        let (engine, _) = engine();
        let scope = Scope::new();
        let value = engine
            .instantiate(
                &tree(serde_json::json!({
                    "_attr_": "graft.partial",
                    "_args_": [
                        {"_attr_": "graft.import", "_args_": ["join"]},
                        "hello"
                    ],
                    "sep": " "
                })),
                &scope,
            )
            .unwrap();
        let partial = value.as_callable().expect("deferred callable");
        let result = partial
            .invoke(CallArgs::positional(vec![Value::Str("world".into())]), &scope)
            .unwrap();
        assert_eq!(result, Value::Str("hello world".into()));
    }

    #[test]
    fn singleton_yields_identical_instance() {
        let (engine, unit_calls) = engine();
        let scope = Scope::new();
        let singleton_node = serde_json::json!({
            "_attr_": "graft.singleton",
            "key": "the_unit",
            "constructor": {
                "_attr_": "graft.partial",
                "_args_": [{"_attr_": "graft.import", "_args_": ["unit"]}]
            }
        });
        let value = engine
            .instantiate(
                &tree(serde_json::json!({"a": singleton_node, "b": singleton_node})),
                &scope,
            )
            .unwrap();
        let map = value.as_map().unwrap();
        let a = map.get("a").and_then(Value::as_object).unwrap();
        let b = map.get("b").and_then(Value::as_object).unwrap();
        assert!(a.ptr_eq(b));
        assert_eq!(unit_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lazy_with_shared_key_memoizes_across_call_sites() {
        let (engine, unit_calls) = engine();
        let scope = Scope::new();
        let lazy_node = serde_json::json!({
            "_attr_": "graft.lazy",
            "key": "shared",
            "constructor": {
                "_attr_": "graft.partial",
                "_args_": [{"_attr_": "graft.import", "_args_": ["unit"]}]
            }
        });
        let value = engine
            .instantiate(&tree(serde_json::json!({"a": lazy_node, "b": lazy_node})), &scope)
            .unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(unit_calls.load(Ordering::SeqCst), 0, "nothing evaluated yet");

        for key in ["a", "b"] {
            let Value::Lazy(lazy) = map.get(key).unwrap() else {
                panic!("expected lazy thunk under {key}");
            };
            lazy.resolve(&scope).unwrap();
        }
        assert_eq!(unit_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn raw_config_keeps_children_inert() {
        let (engine, _) = engine();
        let scope = Scope::new();
        let value = engine
            .instantiate(
                &tree(serde_json::json!({
                    "_attr_": "graft.config",
                    "config": {"inner": {"_attr_": "join", "_args_": ["a"]}}
                })),
                &scope,
            )
            .unwrap();
        // The `_attr_` mapping inside stays data, nothing was called.
        let inner = value.as_map().unwrap().get("inner").unwrap();
        assert_eq!(
            inner.as_map().unwrap().get("_attr_"),
            Some(&Value::Str("join".into()))
        );
    }

    #[test]
    fn args_must_be_a_sequence() {
        let (engine, _) = engine();
        let scope = Scope::new();
        let result = engine.instantiate(
            &tree(serde_json::json!({"_attr_": "join", "_args_": "oops"})),
            &scope,
        );
        assert!(matches!(result, Err(RuntimeError::TypeMismatch { .. })));
    }
}
