//! Runtime values
//!
//! [`Value`] is what the instantiation engine produces: configuration data
//! plus three live kinds: [`Object`] (a shared opaque instance with pointer
//! identity), [`Callable`] (a deferred invocation with bound arguments) and
//! [`LazyArgument`] (a thunk resolved at call time, optionally memoized
//! through the [`Scope`]).

use crate::error::RuntimeError;
use crate::scope::Scope;
use graft_config::{ConfigMap, ConfigValue};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Call target signature shared by constructors and callables
pub type CallFn = dyn Fn(CallArgs, &Scope) -> Result<Value, RuntimeError> + Send + Sync;

/// A value produced by instantiation
#[derive(Debug, Clone)]
pub enum Value {
    /// Null scalar
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Integer scalar
    Int(i64),
    /// Floating-point scalar
    Float(f64),
    /// String scalar
    Str(String),
    /// Ordered sequence
    Seq(Vec<Value>),
    /// Keyword collection, insertion order preserved
    Map(IndexMap<String, Value>),
    /// Opaque constructed instance, shared by reference
    Object(Object),
    /// Deferred invocation
    Callable(Callable),
    /// Lazy argument thunk
    Lazy(Arc<LazyArgument>),
}

impl Value {
    /// Human-readable kind name, used in error messages
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Seq(_) => "sequence",
            Self::Map(_) => "mapping",
            Self::Object(_) => "object",
            Self::Callable(_) => "callable",
            Self::Lazy(_) => "lazy",
        }
    }

    /// Borrow as boolean scalar
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as integer scalar
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Borrow as string scalar
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as sequence
    #[inline]
    #[must_use]
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as keyword collection
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow as opaque instance
    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Borrow as callable
    #[inline]
    #[must_use]
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Self::Callable(callable) => Some(callable),
            _ => None,
        }
    }

    /// Invoke this value as a callable
    ///
    /// # Errors
    /// [`RuntimeError::NotCallable`] unless this is a [`Value::Callable`];
    /// otherwise whatever the invocation itself raises.
    pub fn call(&self, call: CallArgs, scope: &Scope) -> Result<Value, RuntimeError> {
        match self {
            Self::Callable(callable) => callable.invoke(call, scope),
            other => Err(RuntimeError::NotCallable {
                what: format!("value of kind {}", other.kind()),
            }),
        }
    }

    /// Convert back into configuration data.
    ///
    /// Only data kinds convert; live kinds (object / callable / lazy) are a
    /// kind conflict. Used where instantiated values flow back into a tree,
    /// e.g. hyperparameter candidates merged into sweep branches.
    ///
    /// # Errors
    /// [`RuntimeError::TypeMismatch`] for live kinds.
    pub fn try_into_config(&self) -> Result<ConfigValue, RuntimeError> {
        match self {
            Self::Null => Ok(ConfigValue::Null),
            Self::Bool(b) => Ok(ConfigValue::Bool(*b)),
            Self::Int(i) => Ok(ConfigValue::Int(*i)),
            Self::Float(x) => Ok(ConfigValue::Float(*x)),
            Self::Str(s) => Ok(ConfigValue::Str(s.clone())),
            Self::Seq(items) => Ok(ConfigValue::Seq(
                items
                    .iter()
                    .map(Value::try_into_config)
                    .collect::<Result<_, _>>()?,
            )),
            Self::Map(map) => {
                let mut out = ConfigMap::with_capacity(map.len());
                for (key, value) in map {
                    out.insert(key.clone(), value.try_into_config()?);
                }
                Ok(ConfigValue::Map(out))
            }
            live => Err(RuntimeError::type_mismatch("configuration data", live.kind())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Seq(a), Self::Seq(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Callable(a), Self::Callable(b)) => a.ptr_eq(b),
            (Self::Lazy(a), Self::Lazy(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&ConfigValue> for Value {
    fn from(value: &ConfigValue) -> Self {
        match value {
            ConfigValue::Null => Self::Null,
            ConfigValue::Bool(b) => Self::Bool(*b),
            ConfigValue::Int(i) => Self::Int(*i),
            ConfigValue::Float(x) => Self::Float(*x),
            ConfigValue::Str(s) => Self::Str(s.clone()),
            ConfigValue::Seq(items) => Self::Seq(items.iter().map(Self::from).collect()),
            ConfigValue::Map(map) => Self::Map(
                map.iter()
                    .map(|(key, child)| (key.clone(), Self::from(child)))
                    .collect(),
            ),
        }
    }
}

/// An opaque constructed instance
///
/// Identity is `Arc` pointer identity: two values backed by the same
/// allocation are the same instance. This is the observable behind the
/// singleton contract.
#[derive(Clone)]
pub struct Object {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Object {
    /// Wrap a concrete instance
    #[must_use]
    pub fn new<T: Any + Send + Sync>(instance: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(instance),
        }
    }

    /// Wrap an already-shared instance
    #[must_use]
    pub fn from_arc<T: Any + Send + Sync>(instance: Arc<T>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: instance,
        }
    }

    /// Concrete type name of the wrapped instance
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the wrapped instance as `T`
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    /// True when both objects share one allocation
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object<{}>", self.type_name)
    }
}

/// A deferred invocation: a named target plus bound arguments
///
/// Invoking merges bound and call-site arguments (bound positionals first,
/// call-site keywords override bound keywords) and resolves lazy arguments
/// before calling the target.
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    func: Arc<CallFn>,
    bound: CallArgs,
}

impl Callable {
    /// Create a callable from a closure
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(CallArgs, &Scope) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        Self::from_arc(name, Arc::new(func))
    }

    /// Create a callable from a shared call target
    pub fn from_arc(name: impl Into<String>, func: Arc<CallFn>) -> Self {
        Self {
            name: Arc::from(name.into()),
            func,
            bound: CallArgs::default(),
        }
    }

    /// Diagnostic name of the call target
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind additional arguments, returning a new callable.
    ///
    /// Later bindings stack: positionals append, keywords override.
    #[must_use]
    pub fn bind(&self, extra: CallArgs) -> Self {
        let mut bound = self.bound.clone();
        bound.extend(extra);
        Self {
            name: Arc::clone(&self.name),
            func: Arc::clone(&self.func),
            bound,
        }
    }

    /// Invoke the target with bound plus call-site arguments.
    ///
    /// # Errors
    /// Whatever the target raises, or a lazy argument's resolution error.
    pub fn invoke(&self, call: CallArgs, scope: &Scope) -> Result<Value, RuntimeError> {
        let mut merged = self.bound.clone();
        merged.extend(call);
        let resolved = merged.resolve_lazy(scope)?;
        (self.func)(resolved, scope)
    }

    /// True when both callables share target and bound arguments
    #[must_use]
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.func, &other.func) && self.bound == other.bound
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}

/// A lazy argument: a constructor invoked only when the enclosing callable
/// actually runs
///
/// With a memoization key the result is cached in the [`Scope`] and shared
/// across independent call sites; without one, each thunk evaluates once.
pub struct LazyArgument {
    constructor: Callable,
    memo_key: Option<String>,
    cell: OnceCell<Value>,
}

impl LazyArgument {
    /// Create a thunk around `constructor`
    #[must_use]
    pub fn new(constructor: Callable, memo_key: Option<String>) -> Self {
        Self {
            constructor,
            memo_key,
            cell: OnceCell::new(),
        }
    }

    /// The memoization key, if any
    #[inline]
    #[must_use]
    pub fn memo_key(&self) -> Option<&str> {
        self.memo_key.as_deref()
    }

    /// Resolve the thunk, invoking the constructor at most once.
    ///
    /// # Errors
    /// Whatever the underlying constructor raises.
    pub fn resolve(&self, scope: &Scope) -> Result<Value, RuntimeError> {
        match &self.memo_key {
            Some(key) => {
                scope.memoize(key, || self.constructor.invoke(CallArgs::default(), scope))
            }
            None => self
                .cell
                .get_or_try_init(|| self.constructor.invoke(CallArgs::default(), scope))
                .cloned(),
        }
    }
}

impl fmt::Debug for LazyArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyArgument")
            .field("constructor", &self.constructor)
            .field("memo_key", &self.memo_key)
            .field("resolved", &self.cell.get().is_some())
            .finish()
    }
}

/// Positional and keyword arguments for one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    /// Positional arguments, in order
    pub args: Vec<Value>,
    /// Keyword arguments, insertion order preserved
    pub kwargs: IndexMap<String, Value>,
}

impl CallArgs {
    /// Empty argument list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional-only argument list
    #[must_use]
    pub fn positional(args: Vec<Value>) -> Self {
        Self {
            args,
            kwargs: IndexMap::new(),
        }
    }

    /// True when there are no arguments at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }

    /// Append `extra`: positionals after existing, keywords override
    pub fn extend(&mut self, extra: CallArgs) {
        self.args.extend(extra.args);
        for (key, value) in extra.kwargs {
            self.kwargs.insert(key, value);
        }
    }

    /// Remove and return a keyword argument, preserving the others' order
    pub fn take_kwarg(&mut self, key: &str) -> Option<Value> {
        self.kwargs.shift_remove(key)
    }

    /// Remove a required keyword argument
    ///
    /// # Errors
    /// [`RuntimeError::InvalidArguments`] when absent.
    pub fn expect_kwarg(&mut self, owner: &str, key: &str) -> Result<Value, RuntimeError> {
        self.take_kwarg(key)
            .ok_or_else(|| RuntimeError::invalid_arguments(owner, format!("missing '{key}'")))
    }

    /// Assert that nothing is left after the expected arguments were taken
    ///
    /// # Errors
    /// [`RuntimeError::InvalidArguments`] naming the leftovers.
    pub fn expect_consumed(&self, owner: &str) -> Result<(), RuntimeError> {
        if self.is_empty() {
            return Ok(());
        }
        let leftover_keys: Vec<&str> = self.kwargs.keys().map(String::as_str).collect();
        Err(RuntimeError::invalid_arguments(
            owner,
            format!(
                "unexpected arguments: {} positional, keywords {:?}",
                self.args.len(),
                leftover_keys
            ),
        ))
    }

    /// Resolve every lazy value, recursively through data containers
    fn resolve_lazy(self, scope: &Scope) -> Result<Self, RuntimeError> {
        let args = self
            .args
            .into_iter()
            .map(|value| resolve_lazy_value(value, scope))
            .collect::<Result<_, _>>()?;
        let mut kwargs = IndexMap::with_capacity(self.kwargs.len());
        for (key, value) in self.kwargs {
            kwargs.insert(key, resolve_lazy_value(value, scope)?);
        }
        Ok(Self { args, kwargs })
    }
}

fn resolve_lazy_value(value: Value, scope: &Scope) -> Result<Value, RuntimeError> {
    match value {
        Value::Lazy(lazy) => lazy.resolve(scope),
        Value::Seq(items) => Ok(Value::Seq(
            items
                .into_iter()
                .map(|item| resolve_lazy_value(item, scope))
                .collect::<Result<_, _>>()?,
        )),
        Value::Map(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (key, child) in map {
                out.insert(key, resolve_lazy_value(child, scope)?);
            }
            Ok(Value::Map(out))
        }
        other => Ok(other),
    }
}
