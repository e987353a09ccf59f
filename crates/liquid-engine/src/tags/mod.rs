//! Tag handlers and their registry.
//!
//! A handler receives the tag node exactly as parsed, with its
//! arguments still in raw word form, and interprets them at render
//! time. Custom handlers registered under a builtin's name shadow it.

mod assign;
mod control;
mod iteration;

use std::sync::Arc;

use liquid_templates::TagNode;
use rustc_hash::FxHashMap;

use crate::context::Scope;
use crate::error::RenderError;
use crate::error::TagError;
use crate::renderer::Renderer;

pub trait TagHandler: Send + Sync {
    fn render(
        &self,
        tag: &TagNode,
        renderer: &Renderer<'_>,
        scope: &mut Scope<'_>,
        out: &mut String,
    ) -> Result<(), RenderError>;
}

#[derive(Clone)]
pub struct TagRegistry {
    handlers: FxHashMap<String, Arc<dyn TagHandler>>,
}

impl TagRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("if", control::IfTag);
        registry.register("unless", control::UnlessTag);
        registry.register("case", control::CaseTag);
        registry.register("for", iteration::ForTag);
        registry.register("assign", assign::AssignTag);
        registry.register("capture", assign::CaptureTag);
        registry
    }

    pub fn register<H: TagHandler + 'static>(&mut self, name: &str, handler: H) {
        self.handlers.insert(name.to_string(), Arc::new(handler));
    }

    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Arc<dyn TagHandler>> {
        self.handlers.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn malformed(tag: &TagNode, reason: impl Into<String>) -> RenderError {
    RenderError::Tag(TagError::malformed(&tag.name, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = TagRegistry::with_builtins();
        for name in ["if", "unless", "case", "for", "assign", "capture"] {
            assert!(registry.contains(name), "missing builtin tag {name}");
        }
        assert!(!registry.contains("include"));
    }

    #[test]
    fn custom_handlers_shadow_builtins() {
        struct Noop;
        impl TagHandler for Noop {
            fn render(
                &self,
                _tag: &TagNode,
                _renderer: &Renderer<'_>,
                _scope: &mut Scope<'_>,
                _out: &mut String,
            ) -> Result<(), RenderError> {
                Ok(())
            }
        }

        let mut registry = TagRegistry::with_builtins();
        registry.register("if", Noop);
        assert!(registry.resolve("if").is_some());
    }
}
