//! Evaluation-mode rewriting
//!
//! Rewrites every `_eval_`-tagged mapping into a canonical call into the
//! reserved runtime actions, so the instantiation engine never sees an
//! `_eval_` key:
//!
//! - `import` → `graft.import` (the attribute handle, unevaluated)
//! - `call` → plain constructor call (the default; the tag is dropped)
//! - `partial` → `graft.partial` over an imported handle
//! - `lazy` → `graft.lazy` around a `graft.partial` constructor, carrying
//!   the optional `_memoization_key_`
//!
//! A `_singleton_` tag on the same mapping is preserved on the rewritten
//! node for the singleton parser running afterwards.

use crate::chain::ConfigParser;
use crate::error::ParseError;
use graft_config::{depth_map, keys, ConfigMap, ConfigValue};
use graft_runtime::registry::actions;
use std::fmt;
use std::str::FromStr;

/// Policy for turning a constructor-tagged node into a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// Invoke the attribute immediately (default)
    Call,
    /// Bind arguments without invoking
    Partial,
    /// Return the attribute handle unevaluated
    Import,
    /// Defer invocation until the enclosing callable runs
    Lazy,
}

impl FromStr for EvalMode {
    type Err = ParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "call" => Ok(Self::Call),
            "partial" => Ok(Self::Partial),
            "import" => Ok(Self::Import),
            "lazy" => Ok(Self::Lazy),
            other => Err(ParseError::InvalidEvaluationMode {
                mode: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for EvalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Call => "call",
            Self::Partial => "partial",
            Self::Import => "import",
            Self::Lazy => "lazy",
        })
    }
}

/// What an `_eval_`-tagged mapping asks for
#[derive(Debug, Clone)]
struct EvaluationAction {
    mode: EvalMode,
    attr: Option<String>,
    args: Vec<ConfigValue>,
    kwargs: ConfigMap,
    memo_key: Option<String>,
    singleton: Option<ConfigValue>,
}

impl EvaluationAction {
    /// Extract the action from a mapping, `None` when untagged
    fn from_map(map: &ConfigMap) -> Result<Option<Self>, ParseError> {
        let Some(mode_value) = map.get(keys::EVAL) else {
            return Ok(None);
        };
        let mode_text = mode_value.as_str().ok_or_else(|| {
            ParseError::evaluation_argument(format!(
                "'{}' must be a string, got {}",
                keys::EVAL,
                mode_value.kind()
            ))
        })?;
        let mode: EvalMode = mode_text.parse()?;

        let attr = match map.get(keys::ATTR) {
            None => None,
            Some(ConfigValue::Str(name)) => Some(name.clone()),
            Some(other) => {
                return Err(ParseError::evaluation_argument(format!(
                    "'{}' must be a string, got {}",
                    keys::ATTR,
                    other.kind()
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
        let memo_key = match map.get(keys::MEMOIZATION_KEY) {
            None => None,
            Some(ConfigValue::Str(key)) => Some(key.clone()),
            Some(other) => {
                return Err(ParseError::evaluation_argument(format!(
                    "'{}' must be a string, got {}",
                    keys::MEMOIZATION_KEY,
                    other.kind()
                )));
            }
        };
        if memo_key.is_some() && mode != EvalMode::Lazy {
            return Err(ParseError::evaluation_argument(format!(
                "'{}' requires '{}: lazy', got '{mode}'",
                keys::MEMOIZATION_KEY,
                keys::EVAL
            )));
        }

        let kwargs: ConfigMap = map
            .iter()
            .filter(|(key, _)| !keys::is_reserved(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let singleton = map.get(keys::SINGLETON).cloned();

        Ok(Some(Self {
            mode,
            attr,
            args,
            kwargs,
            memo_key,
            singleton,
        }))
    }

    fn require_attr(&self) -> Result<&str, ParseError> {
        self.attr.as_deref().ok_or_else(|| {
            ParseError::evaluation_argument(format!(
                "missing '{}' under '{}: {}'",
                keys::ATTR,
                keys::EVAL,
                self.mode
            ))
        })
    }

    /// Produce the canonical mapping for this action
    fn rewrite(self) -> Result<ConfigValue, ParseError> {
        let mut out = ConfigMap::new();
        match self.mode {
            EvalMode::Import => {
                let name = self.require_attr()?;
                if !self.args.is_empty() || !self.kwargs.is_empty() {
                    let keyword_names: Vec<&str> =
                        self.kwargs.keys().map(String::as_str).collect();
                    return Err(ParseError::evaluation_argument(format!(
                        "import takes no arguments, got positional {:?} and keywords {:?}",
                        self.args, keyword_names
                    )));
                }
                out.insert(keys::ATTR.into(), ConfigValue::from(actions::IMPORT));
                out.insert(
                    keys::ARGS.into(),
                    ConfigValue::Seq(vec![ConfigValue::from(name)]),
                );
            }
            EvalMode::Call => {
                if let Some(name) = &self.attr {
                    out.insert(keys::ATTR.into(), ConfigValue::from(name.as_str()));
                }
                if !self.args.is_empty() {
                    out.insert(keys::ARGS.into(), ConfigValue::Seq(self.args));
                }
                for (key, value) in self.kwargs {
                    out.insert(key, value);
                }
            }
            EvalMode::Partial => {
                let name = self.require_attr()?;
                out.insert(keys::ATTR.into(), ConfigValue::from(actions::PARTIAL));
                let mut positional = vec![import_node(name)];
                positional.extend(self.args);
                out.insert(keys::ARGS.into(), ConfigValue::Seq(positional));
                for (key, value) in self.kwargs {
                    out.insert(key, value);
                }
            }
            EvalMode::Lazy => {
                let name = self.require_attr()?;
                let mut constructor = ConfigMap::new();
                constructor.insert(keys::ATTR.into(), ConfigValue::from(actions::PARTIAL));
                let mut positional = vec![import_node(name)];
                positional.extend(self.args);
                constructor.insert(keys::ARGS.into(), ConfigValue::Seq(positional));
                for (key, value) in self.kwargs {
                    constructor.insert(key, value);
                }

                out.insert(keys::ATTR.into(), ConfigValue::from(actions::LAZY));
                out.insert("constructor".into(), ConfigValue::Map(constructor));
                if let Some(key) = self.memo_key {
                    out.insert("key".into(), ConfigValue::from(key));
                }
            }
        }
        if let Some(singleton) = self.singleton {
            out.insert(keys::SINGLETON.into(), singleton);
        }
        Ok(ConfigValue::Map(out))
    }
}

/// `{_attr_: graft.import, _args_: [name]}`
fn import_node(name: &str) -> ConfigValue {
    let mut map = ConfigMap::new();
    map.insert(keys::ATTR.into(), ConfigValue::from(actions::IMPORT));
    map.insert(
        keys::ARGS.into(),
        ConfigValue::Seq(vec![ConfigValue::from(name)]),
    );
    ConfigValue::Map(map)
}

/// The evaluation-mode parser
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluateParser;

impl ConfigParser for EvaluateParser {
    fn parse(&self, config: &ConfigValue) -> Result<ConfigValue, ParseError> {
        depth_map(
            &mut |value| match &value {
                ConfigValue::Map(map) => match EvaluationAction::from_map(map)? {
                    Some(action) => action.rewrite(),
                    None => Ok(value),
                },
                _ => Ok(value),
            },
            config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_runtime::{Instantiator, Registry, Scope, Value};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn tree(value: serde_json::Value) -> ConfigValue {
        ConfigValue::from(value)
    }

    fn parse(value: serde_json::Value) -> Result<ConfigValue, ParseError> {
        EvaluateParser.parse(&tree(value))
    }

    #[test]
    fn call_mode_drops_the_tag() {
        let parsed = parse(serde_json::json!({
            "_attr_": "str",
            "_eval_": "call",
            "_args_": ["hello"]
        }))
        .unwrap();
        assert_eq!(
            parsed,
            tree(serde_json::json!({"_attr_": "str", "_args_": ["hello"]}))
        );
    }

    #[test]
    fn import_mode_rewrites_to_action() {
        let parsed = parse(serde_json::json!({"_attr_": "str", "_eval_": "import"})).unwrap();
        assert_eq!(
            parsed,
            tree(serde_json::json!({"_attr_": "graft.import", "_args_": ["str"]}))
        );
    }

    #[test]
    fn import_mode_rejects_arguments() {
        let result = parse(serde_json::json!({
            "_attr_": "str",
            "_eval_": "import",
            "_args_": [1],
            "x": 2
        }));
        let err = result.unwrap_err();
        assert!(matches!(err, ParseError::EvaluationArgument { .. }));
        // The offending values are named.
        let message = err.to_string();
        assert!(message.contains("Int(1)"), "got: {message}");
        assert!(message.contains("\"x\""), "got: {message}");
    }

    #[test]
    fn partial_mode_wraps_an_import() {
        let parsed = parse(serde_json::json!({
            "_attr_": "str",
            "_eval_": "partial",
            "_args_": ["hello"],
            "flag": true
        }))
        .unwrap();
        assert_eq!(
            parsed,
            tree(serde_json::json!({
                "_attr_": "graft.partial",
                "_args_": [
                    {"_attr_": "graft.import", "_args_": ["str"]},
                    "hello"
                ],
                "flag": true
            }))
        );
    }

    #[test]
    fn lazy_mode_builds_a_thunk_constructor() {
        let parsed = parse(serde_json::json!({
            "_attr_": "load",
            "_eval_": "lazy",
            "_memoization_key_": "env"
        }))
        .unwrap();
        assert_eq!(
            parsed,
            tree(serde_json::json!({
                "_attr_": "graft.lazy",
                "constructor": {
                    "_attr_": "graft.partial",
                    "_args_": [{"_attr_": "graft.import", "_args_": ["load"]}]
                },
                "key": "env"
            }))
        );
    }

    #[test]
    fn unknown_mode_rejected() {
        let result = parse(serde_json::json!({"_attr_": "str", "_eval_": "defer"}));
        assert!(matches!(
            result,
            Err(ParseError::InvalidEvaluationMode { ref mode }) if mode == "defer"
        ));
    }

    #[test]
    fn missing_attr_under_non_default_mode_rejected() {
        for mode in ["partial", "import", "lazy"] {
            let result = parse(serde_json::json!({"_eval_": mode}));
            assert!(
                matches!(result, Err(ParseError::EvaluationArgument { .. })),
                "mode {mode} should require _attr_"
            );
        }
    }

    #[test]
    fn memoization_key_requires_lazy() {
        let result = parse(serde_json::json!({
            "_attr_": "f",
            "_eval_": "partial",
            "_memoization_key_": "k"
        }));
        assert!(matches!(result, Err(ParseError::EvaluationArgument { .. })));
    }

    #[test]
    fn singleton_tag_is_preserved() {
        let parsed = parse(serde_json::json!({
            "_attr_": "f",
            "_eval_": "partial",
            "_singleton_": "shared"
        }))
        .unwrap();
        assert_eq!(
            parsed.get("_singleton_"),
            Some(&ConfigValue::from("shared"))
        );
    }

    #[test]
    fn nested_lazy_argument_inside_partial() {
        // The inner lazy node rewrites first (depth-first), the outer
        // partial keeps it as an ordinary keyword argument.
        let parsed = parse(serde_json::json!({
            "_attr_": "run_job",
            "_eval_": "partial",
            "env_var": {"_attr_": "load_env", "_eval_": "lazy"}
        }))
        .unwrap();
        let env_var = parsed.get("env_var").unwrap();
        assert_eq!(
            env_var.get("_attr_"),
            Some(&ConfigValue::from("graft.lazy"))
        );
    }

    #[test]
    fn partial_rewrite_instantiates_to_deferred_callable() {
        let mut registry = Registry::with_builtins();
        registry
            .register_fn("shout", |call, _scope| {
                let text = call.args[0].as_str().unwrap_or_default();
                Ok(Value::Str(text.to_uppercase()))
            })
            .unwrap();
        let engine = Instantiator::new(Arc::new(registry));
        let scope = Scope::new();

        let parsed = parse(serde_json::json!({
            "_attr_": "shout",
            "_eval_": "partial",
            "_args_": ["quiet"]
        }))
        .unwrap();
        let value = engine.instantiate(&parsed, &scope).unwrap();
        let deferred = value.as_callable().expect("deferred callable");
        assert_eq!(
            deferred
                .invoke(graft_runtime::CallArgs::default(), &scope)
                .unwrap(),
            Value::Str("QUIET".into())
        );
    }
}
