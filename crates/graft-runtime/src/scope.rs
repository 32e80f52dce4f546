//! Run-scoped identity state
//!
//! [`Scope`] carries the two write-once tables that outlive a single
//! instantiation: the singleton registry and the lazy memoization cache.
//! It is threaded explicitly through instantiate and launch; there is no
//! module-level global. The launcher clears it at every sweep-branch
//! boundary so branches never observe each other's cached identities.

use crate::error::RuntimeError;
use crate::value::Value;
use indexmap::IndexMap;
use parking_lot::Mutex;

/// Singleton registry plus lazy memoization cache, one per run
#[derive(Debug, Default)]
pub struct Scope {
    singletons: Mutex<IndexMap<String, Value>>,
    memoized: Mutex<IndexMap<String, Value>>,
}

impl Scope {
    /// Create an empty scope
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the singleton bound to `key`, creating and binding it with
    /// `init` on first use.
    ///
    /// `init` runs without any lock held, so a constructor may itself
    /// create other singletons.
    ///
    /// # Errors
    /// Whatever `init` raises; [`RuntimeError::SingletonConflict`] when
    /// `init` bound the same key reentrantly.
    pub fn get_or_create<F>(&self, key: &str, init: F) -> Result<Value, RuntimeError>
    where
        F: FnOnce() -> Result<Value, RuntimeError>,
    {
        if let Some(existing) = self.singletons.lock().get(key) {
            return Ok(existing.clone());
        }
        let value = init()?;
        tracing::debug!(key, "binding singleton");
        self.bind(key, value.clone())?;
        Ok(value)
    }

    /// Bind `key` to `value`.
    ///
    /// # Errors
    /// [`RuntimeError::SingletonConflict`] when `key` is already bound;
    /// rebinding requires an explicit [`Scope::clear`].
    pub fn bind(&self, key: &str, value: Value) -> Result<(), RuntimeError> {
        let mut singletons = self.singletons.lock();
        if singletons.contains_key(key) {
            return Err(RuntimeError::SingletonConflict { key: key.to_string() });
        }
        singletons.insert(key.to_string(), value);
        Ok(())
    }

    /// The singleton bound to `key`, if any
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.singletons.lock().get(key).cloned()
    }

    /// Return the memoized value for `key`, computing it with `init` on
    /// first use.
    ///
    /// `init` runs without any lock held. If it memoized the same key
    /// reentrantly the already-stored value wins and the fresh result is
    /// dropped, keeping "at most one stored value per key".
    ///
    /// # Errors
    /// Whatever `init` raises.
    pub fn memoize<F>(&self, key: &str, init: F) -> Result<Value, RuntimeError>
    where
        F: FnOnce() -> Result<Value, RuntimeError>,
    {
        if let Some(existing) = self.memoized.lock().get(key) {
            return Ok(existing.clone());
        }
        let value = init()?;
        let mut memoized = self.memoized.lock();
        Ok(memoized
            .entry(key.to_string())
            .or_insert(value)
            .clone())
    }

    /// Number of bound singletons
    #[must_use]
    pub fn singleton_count(&self) -> usize {
        self.singletons.lock().len()
    }

    /// Number of memoized lazy results
    #[must_use]
    pub fn memoized_count(&self) -> usize {
        self.memoized.lock().len()
    }

    /// True when neither table holds anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.singleton_count() == 0 && self.memoized_count() == 0
    }

    /// Drop every binding and memoized result.
    ///
    /// The documented reset contract: called between sweep branches so the
    /// next branch starts from clean identity state.
    pub fn clear(&self) {
        let singletons = self.singleton_count();
        let memoized = self.memoized_count();
        if singletons > 0 || memoized > 0 {
            tracing::debug!(singletons, memoized, "clearing scope");
        }
        self.singletons.lock().clear();
        self.memoized.lock().clear();
    }
}
