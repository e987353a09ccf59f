//! `assign` and `capture`.

use liquid_templates::parse_pipeline;
use liquid_templates::split_unquoted;
use liquid_templates::TagNode;

use super::malformed;
use super::TagHandler;
use crate::context::Scope;
use crate::error::RenderError;
use crate::renderer::Renderer;
use crate::value::Value;

pub(super) struct AssignTag;

impl TagHandler for AssignTag {
    fn render(
        &self,
        tag: &TagNode,
        renderer: &Renderer<'_>,
        scope: &mut Scope<'_>,
        _out: &mut String,
    ) -> Result<(), RenderError> {
        let raw = tag.raw_args();
        let Some(eq) = split_unquoted(&raw, '=').get(1).map(|(_, offset)| offset - 1) else {
            return Err(malformed(tag, "expected `name = expression`"));
        };

        let name = raw[..eq].trim();
        if !is_identifier(name) {
            return Err(malformed(tag, format!("invalid variable name {name:?}")));
        }

        let rhs = raw[eq + 1..].trim();
        if rhs.is_empty() {
            return Err(malformed(tag, "missing expression after `=`"));
        }
        let (expression, filters) = parse_pipeline(rhs, 0)?;
        let value = renderer.eval(&expression, scope)?;
        let value = renderer.apply_filters(value, &filters, scope)?;

        scope.assign(name.to_string(), value);
        Ok(())
    }
}

/// `capture` renders its body into a string and binds it, so any
/// template fragment can be stored and reused.
pub(super) struct CaptureTag;

impl TagHandler for CaptureTag {
    fn render(
        &self,
        tag: &TagNode,
        renderer: &Renderer<'_>,
        scope: &mut Scope<'_>,
        _out: &mut String,
    ) -> Result<(), RenderError> {
        let [name] = tag.bits.as_slice() else {
            return Err(malformed(tag, "expected exactly one variable name"));
        };
        if !is_identifier(name) {
            return Err(malformed(tag, format!("invalid variable name {name:?}")));
        }

        let mut captured = String::new();
        renderer.render_nodes(&tag.body, scope, &mut captured)?;
        scope.assign(name.clone(), Value::String(captured));
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}
