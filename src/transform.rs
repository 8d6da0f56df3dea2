//! Transforms: named functions reachable through pipe syntax.
//!
//! ```text
//! normandy.userId|stableSample(0.1)
//! ```
//!
//! hands `normandy.userId` and `[0.1]` to whatever the caller registered
//! under `stableSample`. Registries are plain values passed to each
//! evaluation; there is no global table.

pub mod builtins;

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;

use crate::{evaluator::EvalError, value::Value};

/// A function applied with `subject|name(args...)`.
///
/// Transforms may suspend (for example to look something up); the
/// evaluator awaits them in place.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn apply(&self, subject: Value, args: Vec<Value>) -> Result<Value, EvalError>;
}

/// Adapts a synchronous closure into a [`Transform`].
pub struct FnTransform<F>(pub F);

#[async_trait]
impl<F> Transform for FnTransform<F>
where
    F: Fn(Value, Vec<Value>) -> Result<Value, EvalError> + Send + Sync,
{
    async fn apply(&self, subject: Value, args: Vec<Value>) -> Result<Value, EvalError> {
        (self.0)(subject, args)
    }
}

/// Name to transform table handed to each evaluation.
///
/// # Examples
///
/// ```
/// use targex::{Transforms, Value};
///
/// let mut transforms = Transforms::standard();
/// transforms.register_fn("double", |subject, _args| match subject {
///     Value::Integer(n) => Ok(Value::Integer(n * 2)),
///     other => Ok(other),
/// });
///
/// assert!(transforms.contains("double"));
/// assert!(transforms.contains("stableSample"));
/// ```
#[derive(Clone, Default)]
pub struct Transforms {
    table: HashMap<String, Arc<dyn Transform>>,
}

impl Transforms {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in transforms.
    pub fn standard() -> Self {
        let mut transforms = Self::new();
        builtins::register(&mut transforms);
        transforms
    }

    /// Adds or replaces the transform called `name`.
    pub fn register(&mut self, name: impl Into<String>, transform: impl Transform + 'static) -> &mut Self {
        self.table.insert(name.into(), Arc::new(transform));
        self
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Value, Vec<Value>) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.register(name, FnTransform(f))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Transform>> {
        self.table.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Transforms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transforms")
            .field("names", &self.names())
            .finish()
    }
}
