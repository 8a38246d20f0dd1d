//! Column handler registry.
//!
//! Maps column names to the handler that normalizes their values. The
//! registry is filled once before a run and only read while streaming.
//!
//! Three ways to bind a function, all storing the same association:
//!
//! ```rust,ignore
//! use matzbiim::{handler, HandlerRegistry, HandlerResult};
//!
//! fn registration_status(value: &str) -> HandlerResult { Ok(value.to_string()) }
//! fn date(value: &str) -> HandlerResult { Ok(value.to_string()) }
//!
//! let mut registry = HandlerRegistry::new();
//! registry
//!     // bound under its own name, "registration_status"
//!     .register(handler!(registration_status))
//!     // bound under an explicit name
//!     .register_for("date_of_birth", date)
//!     // stacked: one function, many columns
//!     .register_for("purge_date", date)
//!     .register_for_each(["inactive_date", "registration_date"], date);
//! ```
//!
//! Registering a column twice replaces the earlier handler: the last
//! registration wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::HandlerResult;

type HandlerFn = dyn Fn(&str) -> HandlerResult + Send + Sync;

/// A named column transformation.
///
/// Cloning is cheap; clones share the same function.
#[derive(Clone)]
pub struct Handler {
    name: Arc<str>,
    func: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    /// Identifier of the wrapped function. [`HandlerRegistry::register`]
    /// binds the handler under this name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, value: &str) -> HandlerResult {
        (self.func)(value)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("name", &self.name).finish()
    }
}

/// Wrap a function in a [`Handler`] named after the function itself.
///
/// ```rust,ignore
/// registry.register(handler!(registration_status));
/// ```
#[macro_export]
macro_rules! handler {
    ($func:ident) => {
        $crate::transform::registry::Handler::new(stringify!($func), $func)
    };
}

/// Last path segment of a function's type name, e.g. `date` for
/// `matzbiim::layout::nys::date`. Closures come out as `{{closure}}`.
fn function_name<F>() -> String {
    let full = std::any::type_name::<F>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}

/// Column name to handler mapping.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler under its own name.
    pub fn register(&mut self, handler: Handler) -> &mut Self {
        let column = handler.name().to_string();
        self.bind(column, handler)
    }

    /// Bind a function to an explicit column name.
    ///
    /// Can be repeated with the same function to bind it to several columns.
    pub fn register_for<F>(&mut self, column: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&str) -> HandlerResult + Send + Sync + 'static,
    {
        let handler = Handler::new(function_name::<F>(), func);
        self.bind(column, handler)
    }

    /// Bind one function to every column in `columns`.
    pub fn register_for_each<I, S, F>(&mut self, columns: I, func: F) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str) -> HandlerResult + Send + Sync + 'static,
    {
        let handler = Handler::new(function_name::<F>(), func);
        for column in columns {
            self.bind(column, handler.clone());
        }
        self
    }

    /// Bind an existing handler to a column. Replaces any earlier binding.
    pub fn bind(&mut self, column: impl Into<String>, handler: Handler) -> &mut Self {
        self.handlers.insert(column.into(), handler);
        self
    }

    /// Handler for a column, if any. Exact name match only.
    pub fn resolve(&self, column: &str) -> Option<&Handler> {
        self.handlers.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.handlers.contains_key(column)
    }

    /// `(column, handler name)` pairs, sorted by column.
    pub fn bindings(&self) -> Vec<(&str, &str)> {
        let mut bindings: Vec<(&str, &str)> = self
            .handlers
            .iter()
            .map(|(column, handler)| (column.as_str(), handler.name()))
            .collect();
        bindings.sort_unstable();
        bindings
    }

    /// Registered column names, sorted.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        columns.sort_unstable();
        columns
    }

    /// Number of bound columns.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
