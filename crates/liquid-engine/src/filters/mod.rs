//! Filter registry and built-in filters.
//!
//! A filter is a transformation over an input value plus positional
//! arguments. Built-ins are plain function pointers; user-registered
//! filters are boxed closures behind the same calling convention, so
//! the renderer dispatches both identically.

mod arrays;
mod math;
mod misc;
mod strings;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::FilterError;
use crate::value::Number;
use crate::value::Value;

pub type BuiltinFn = fn(&Value, &[Value]) -> Result<Value, FilterError>;
pub type CustomFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, FilterError> + Send + Sync>;

#[derive(Clone)]
pub enum Filter {
    Builtin(BuiltinFn),
    Custom(CustomFn),
}

impl Filter {
    pub fn apply(&self, input: &Value, args: &[Value]) -> Result<Value, FilterError> {
        match self {
            Filter::Builtin(f) => f(input, args),
            Filter::Custom(f) => f(input, args),
        }
    }
}

#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: FxHashMap<String, Filter>,
}

impl FilterRegistry {
    /// A registry with every built-in filter installed.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        strings::register(&mut registry);
        arrays::register(&mut registry);
        math::register(&mut registry);
        misc::register(&mut registry);
        registry
    }

    pub(crate) fn insert_builtin(&mut self, name: &str, f: BuiltinFn) {
        self.filters.insert(name.to_string(), Filter::Builtin(f));
    }

    /// Register a custom filter, replacing any existing filter of the
    /// same name.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, FilterError> + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Filter::Custom(Arc::new(f)));
    }

    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Filter> {
        self.filters.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }
}

/// Coerce the filter input to its output-stream string form; string
/// filters are loosely typed and accept anything.
pub(crate) fn string_input(input: &Value) -> String {
    input.to_output_string()
}

/// Coerce the filter input to a number or fail with the filter's name.
pub(crate) fn number_input(filter: &str, input: &Value) -> Result<Number, FilterError> {
    input.to_number().ok_or_else(|| {
        FilterError::invalid_input(
            filter,
            format!("expected a number, got {}", input.type_name()),
        )
    })
}

pub(crate) fn number_arg(filter: &str, args: &[Value], index: usize) -> Result<Number, FilterError> {
    let arg = args.get(index).ok_or_else(|| {
        FilterError::invalid_argument(filter, format!("missing argument {}", index + 1))
    })?;
    arg.to_number().ok_or_else(|| {
        FilterError::invalid_argument(
            filter,
            format!("expected a number, got {}", arg.type_name()),
        )
    })
}

pub(crate) fn int_arg(filter: &str, args: &[Value], index: usize) -> Result<i64, FilterError> {
    match number_arg(filter, args, index)? {
        Number::Int(i) => Ok(i),
        #[allow(clippy::cast_possible_truncation)]
        Number::Float(f) => Ok(f.trunc() as i64),
    }
}

pub(crate) fn string_arg(filter: &str, args: &[Value], index: usize) -> Result<String, FilterError> {
    args.get(index).map(string_input).ok_or_else(|| {
        FilterError::invalid_argument(filter, format!("missing argument {}", index + 1))
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn builtins_are_resolvable() {
        let registry = FilterRegistry::with_builtins();
        for name in [
            "upcase", "downcase", "capitalize", "strip", "strip_html", "strip_newlines",
            "escape", "escape_once", "truncate", "truncatewords", "replace", "replace_first",
            "remove", "remove_first", "prepend", "append", "slice", "url_encode", "url_decode",
            "newline_to_br", "first", "last", "join", "size", "sort", "reverse", "uniq", "map",
            "where", "plus", "minus", "times", "divided_by", "modulo", "round", "ceil", "floor",
            "abs", "default", "date",
        ] {
            assert!(registry.contains(name), "builtin '{name}' missing");
        }
    }

    #[test]
    fn custom_filters_shadow_builtins() {
        let mut registry = FilterRegistry::with_builtins();
        registry.register("upcase", |_, _| Ok(Value::from("shadowed")));
        let result = registry
            .resolve("upcase")
            .unwrap()
            .apply(&Value::from("x"), &[])
            .unwrap();
        assert_eq!(result, Value::from("shadowed"));
    }

    #[test]
    fn unknown_filter_is_not_resolvable() {
        let registry = FilterRegistry::with_builtins();
        assert!(registry.resolve("no_such_filter").is_none());
    }
}
