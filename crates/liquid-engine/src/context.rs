use liquid_templates::PathSegment;
use rustc_hash::FxHashMap;

use crate::value::Value;

/// The variable environment for one render call.
///
/// The caller's context is borrowed immutably and is never written to;
/// `assign`/`capture` and loop variables live in a stack of
/// render-local frames that shadow it. Dropping the scope discards all
/// render-local state, so nothing leaks between render calls.
pub struct Scope<'a> {
    root: &'a Value,
    frames: Vec<FxHashMap<String, Value>>,
}

impl<'a> Scope<'a> {
    #[must_use]
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            // Base frame for top-level assigns
            frames: vec![FxHashMap::default()],
        }
    }

    /// Enter a child scope (loop body, captured block).
    pub fn push_frame(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    /// Leave the innermost child scope, discarding its bindings.
    pub fn pop_frame(&mut self) {
        // The base frame stays
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Bind `name` in the innermost frame, shadowing outer frames and
    /// the caller context without writing back into either.
    pub fn assign(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Look up a top-level name: innermost frame first, then the
    /// caller's context.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Value> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Some(value.clone());
            }
        }
        match self.root {
            Value::Object(map) => map.get(name).cloned(),
            _ => None,
        }
    }

    /// Resolve a dot/bracket path. Missing intermediate keys resolve to
    /// `None`; strictness policy is applied by the renderer.
    #[must_use]
    pub fn resolve_path(&self, segments: &[PathSegment]) -> Option<Value> {
        let mut segments = segments.iter();

        let head = match segments.next()? {
            PathSegment::Key(name) => self.lookup(name)?,
            PathSegment::Index(_) => return None,
        };

        segments.try_fold(head, |current, segment| navigate(&current, segment))
    }
}

fn navigate(current: &Value, segment: &PathSegment) -> Option<Value> {
    match segment {
        PathSegment::Key(key) => match current {
            Value::Object(map) => map
                .get(key)
                .cloned()
                .or_else(|| synthetic_property(current, key)),
            Value::Array(_) | Value::String(_) => synthetic_property(current, key),
            _ => None,
        },
        PathSegment::Index(index) => match current {
            Value::Array(items) => {
                let index = normalize_index(*index, items.len())?;
                items.get(index).cloned()
            }
            _ => None,
        },
    }
}

/// Liquid's implied properties: `size` on strings/arrays/objects,
/// `first`/`last` on arrays.
fn synthetic_property(value: &Value, key: &str) -> Option<Value> {
    match key {
        "size" => value
            .size()
            .map(|n| Value::Int(i64::try_from(n).unwrap_or(i64::MAX))),
        "first" => match value {
            Value::Array(items) => items.first().cloned(),
            _ => None,
        },
        "last" => match value {
            Value::Array(items) => items.last().cloned(),
            _ => None,
        },
        _ => None,
    }
}

/// Negative indexes count from the end, Ruby-style.
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        usize::try_from(index).ok()
    } else {
        let from_end = usize::try_from(-index).ok()?;
        len.checked_sub(from_end)
    }
}
