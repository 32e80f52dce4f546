//! Reserved mapping keys
//!
//! These key names are the wire contract shared with external config files:
//! compatibility requires exact matches.

use crate::value::ConfigMap;

/// Dotted-path or registry name of the constructible
pub const ATTR: &str = "_attr_";

/// Ordered positional arguments
pub const ARGS: &str = "_args_";

/// Evaluation mode tag (call / partial / import / lazy)
pub const EVAL: &str = "_eval_";

/// Singleton identity key
pub const SINGLETON: &str = "_singleton_";

/// Lazy-evaluation cache key
pub const MEMOIZATION_KEY: &str = "_memoization_key_";

/// Macro namespace (macro parser only, top level)
pub const MACRO: &str = "_macro_";

/// Main tree under a macro-bearing config (macro parser only, top level)
pub const CONFIG: &str = "_config_";

/// Keys that mark a mapping as constructor-tagged
pub const RESERVED: [&str; 5] = [ATTR, ARGS, EVAL, SINGLETON, MEMOIZATION_KEY];

/// True when `key` is one of the constructor-level reserved keys
#[inline]
#[must_use]
pub fn is_reserved(key: &str) -> bool {
    RESERVED.contains(&key)
}

/// True when the mapping carries any reserved key
///
/// Tagged mappings are opaque to reference-path traversal: their internals
/// are constructor input, not a resolvable namespace.
#[must_use]
pub fn is_tagged(map: &ConfigMap) -> bool {
    RESERVED.iter().any(|key| map.contains_key(*key))
}
