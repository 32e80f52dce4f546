//! Cross-reference resolution
//!
//! Replaces every reference scalar (`"@model.dim"`, `"@list[2].x"`) with the
//! value at that path in the same top-level tree. References may point at
//! other references; resolution iterates whole-tree rewrite passes until a
//! verified fixed point. A pass that makes no progress while references
//! remain is the authoritative failure signal: each leftover reference is
//! then classified as missing (target path absent) or cyclic (target
//! present but irreducible).
//!
//! Path lookup never descends into a constructor-tagged mapping: a path may
//! end *at* a tagged mapping, but its internals are constructor input, not
//! a resolvable namespace.

use crate::chain::ConfigParser;
use crate::error::ParseError;
use graft_config::{depth_map, keys, ConfigPath, ConfigValue, Segment};

/// Prefix marking a string scalar as a reference
pub const REFERENCE_PREFIX: &str = "@";

/// The reference-resolution parser
///
/// Policies:
/// - `allow_missing`: leave references to absent targets in place instead
///   of failing (default: fail);
/// - `restricted_to`: only consider references whose first path segment is
///   in the given key set (used to resolve a macro namespace in isolation).
#[derive(Debug, Clone, Default)]
pub struct ReferenceParser {
    allow_missing: bool,
    keys: Option<Vec<String>>,
}

impl ReferenceParser {
    /// Resolver with default policies: all references, missing targets fail
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass references to absent targets through unchanged
    #[must_use]
    pub fn allow_missing(mut self, allow: bool) -> Self {
        self.allow_missing = allow;
        self
    }

    /// Only resolve references rooted at one of `keys`
    #[must_use]
    pub fn restricted_to(mut self, keys: Vec<String>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// The reference path of `value`, when it is an in-scope reference
    fn reference_of(&self, value: &ConfigValue) -> Result<Option<ConfigPath>, ParseError> {
        let Some(text) = value.as_str() else {
            return Ok(None);
        };
        let Some(raw_path) = text.strip_prefix(REFERENCE_PREFIX) else {
            return Ok(None);
        };
        let path: ConfigPath = raw_path.parse()?;
        if let Some(allowed) = &self.keys {
            let in_scope = path
                .root_key()
                .is_some_and(|root| allowed.iter().any(|key| key == root));
            if !in_scope {
                return Ok(None);
            }
        }
        Ok(Some(path))
    }

    fn count_references(&self, config: &ConfigValue) -> Result<usize, ParseError> {
        let mut count = 0usize;
        depth_map(
            &mut |value| {
                if self.reference_of(&value)?.is_some() {
                    count += 1;
                }
                Ok::<_, ParseError>(value)
            },
            config,
        )?;
        Ok(count)
    }

    /// One whole-tree rewrite pass against a snapshot of the tree
    fn resolve_pass(&self, config: &ConfigValue) -> Result<ConfigValue, ParseError> {
        depth_map(
            &mut |value| {
                if let Some(path) = self.reference_of(&value)? {
                    if let Some(target) = lookup(config, &path) {
                        return Ok(target.clone());
                    }
                }
                Ok(value)
            },
            config,
        )
    }

    /// No pass made progress: report why the leftovers are irreducible
    fn classify_stall(&self, config: &ConfigValue) -> Result<ConfigValue, ParseError> {
        let mut verdict: Result<(), ParseError> = Ok(());
        depth_map(
            &mut |value| {
                if verdict.is_ok() {
                    if let Some(path) = self.reference_of(&value)? {
                        if lookup(config, &path).is_none() {
                            if !self.allow_missing {
                                verdict = Err(ParseError::MissingReference {
                                    reference: path.to_string(),
                                });
                            }
                        } else {
                            verdict = Err(ParseError::ReferenceCycle {
                                reference: path.to_string(),
                            });
                        }
                    }
                }
                Ok::<_, ParseError>(value)
            },
            config,
        )?;
        verdict?;
        Ok(config.clone())
    }
}

impl ConfigParser for ReferenceParser {
    fn parse(&self, config: &ConfigValue) -> Result<ConfigValue, ParseError> {
        let initial = self.count_references(config)?;
        if initial == 0 {
            return Ok(config.clone());
        }

        let mut current = config.clone();
        // Fixed point with a pass-count backstop: stall detection is the
        // authoritative signal, the bound only guards against pathological
        // oscillation.
        let max_passes = initial.saturating_mul(2) + 1;
        for pass in 0..max_passes {
            let next = self.resolve_pass(&current)?;
            let changed = next != current;
            current = next;
            let remaining = self.count_references(&current)?;
            tracing::trace!(pass, remaining, changed, "reference resolution pass");
            if remaining == 0 {
                return Ok(current);
            }
            if !changed {
                return self.classify_stall(&current);
            }
        }
        self.classify_stall(&current)
    }
}

/// Walk `path` through `root`, refusing to enter tagged mappings
fn lookup<'a>(root: &'a ConfigValue, path: &ConfigPath) -> Option<&'a ConfigValue> {
    let mut current = root;
    for segment in path.segments() {
        match (current, segment) {
            (ConfigValue::Map(map), Segment::Key(key)) => {
                if keys::is_tagged(map) {
                    return None;
                }
                current = map.get(key)?;
            }
            (ConfigValue::Seq(items), Segment::Index(index)) => {
                current = items.get(*index)?;
            }
            _ => return None,
        }
    }
    Some(current)
}
