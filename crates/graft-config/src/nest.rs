//! Depth-first tree transforms
//!
//! The structural helpers every parser stage is built on: a children-first
//! rewrite ([`depth_map`]), a path/leaf table ([`flatten`]) and a recursive
//! mapping merge ([`merge`]).

use crate::error::ConfigError;
use crate::value::ConfigValue;

/// Depth-first fallible rewrite: children are mapped before their parent.
///
/// Sequences and mappings are rebuilt from mapped children and then passed
/// to `map_fn` themselves, so a rewrite rule sees fully-rewritten subtrees.
///
/// # Errors
/// Propagates the first error returned by `map_fn`.
pub fn depth_map<E, F>(map_fn: &mut F, value: &ConfigValue) -> Result<ConfigValue, E>
where
    F: FnMut(ConfigValue) -> Result<ConfigValue, E>,
{
    match value {
        ConfigValue::Map(map) => {
            let mut mapped = crate::value::ConfigMap::with_capacity(map.len());
            for (key, child) in map {
                mapped.insert(key.clone(), depth_map(map_fn, child)?);
            }
            map_fn(ConfigValue::Map(mapped))
        }
        ConfigValue::Seq(items) => {
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                mapped.push(depth_map(map_fn, item)?);
            }
            map_fn(ConfigValue::Seq(mapped))
        }
        scalar => map_fn(scalar.clone()),
    }
}

/// Flatten a tree into `(path, leaf)` pairs.
///
/// Mapping keys join with `.`, sequence positions render as `[i]`. Scalars
/// are leaves; empty containers are reported as their own leaf so they stay
/// visible in diagnostics.
#[must_use]
pub fn flatten(value: &ConfigValue) -> Vec<(String, ConfigValue)> {
    let mut entries = Vec::new();
    flatten_into(value, String::new(), &mut entries);
    entries
}

fn flatten_into(value: &ConfigValue, prefix: String, entries: &mut Vec<(String, ConfigValue)>) {
    match value {
        ConfigValue::Map(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(child, path, entries);
            }
        }
        ConfigValue::Seq(items) if !items.is_empty() => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(item, format!("{prefix}[{index}]"), entries);
            }
        }
        leaf => entries.push((prefix, leaf.clone())),
    }
}

/// Merge `overrides` into `base`, recursively on mappings.
///
/// A key present on both sides requires `allow_override`; mapping values
/// merge recursively, anything else is replaced by the override side.
/// Merging a mapping with a non-mapping is a kind conflict.
///
/// # Errors
/// - [`ConfigError::DuplicateKey`] on a shared key with `allow_override = false`
/// - [`ConfigError::TypeMismatch`] on incompatible container kinds
pub fn merge(
    base: &ConfigValue,
    overrides: &ConfigValue,
    allow_override: bool,
) -> Result<ConfigValue, ConfigError> {
    match (base, overrides) {
        (ConfigValue::Map(base_map), ConfigValue::Map(override_map)) => {
            let mut merged = base_map.clone();
            for (key, override_value) in override_map {
                match merged.get(key).cloned() {
                    Some(existing) => {
                        if !allow_override {
                            return Err(ConfigError::DuplicateKey { key: key.clone() });
                        }
                        merged.insert(key.clone(), merge(&existing, override_value, allow_override)?);
                    }
                    None => {
                        merged.insert(key.clone(), override_value.clone());
                    }
                }
            }
            Ok(ConfigValue::Map(merged))
        }
        (ConfigValue::Map(_), other) => Err(ConfigError::type_mismatch("mapping", other.kind())),
        (_, overrides) => Ok(overrides.clone()),
    }
}
