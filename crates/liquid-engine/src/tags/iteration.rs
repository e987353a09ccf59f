//! `for`.

use liquid_templates::parse_expression;
use liquid_templates::TagNode;

use super::malformed;
use super::TagHandler;
use crate::context::Scope;
use crate::error::RenderError;
use crate::renderer::Renderer;
use crate::value::Number;
use crate::value::Value;
use crate::value::ValueMap;

pub(super) struct ForTag;

impl TagHandler for ForTag {
    fn render(
        &self,
        tag: &TagNode,
        renderer: &Renderer<'_>,
        scope: &mut Scope<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let loop_spec = LoopSpec::parse(tag, renderer, scope)?;
        let items = loop_spec.items(renderer, scope)?;

        if items.is_empty() {
            if let Some(branch) = tag.branches.first() {
                return renderer.render_nodes(&branch.body, scope, out);
            }
            return Ok(());
        }

        let length = items.len();
        scope.push_frame();
        let result: Result<(), RenderError> = (|| {
            for (index, item) in items.into_iter().enumerate() {
                scope.assign(loop_spec.var.clone(), item);
                scope.assign("forloop".to_string(), forloop_object(index, length));
                renderer.render_nodes(&tag.body, scope, out)?;
            }
            Ok(())
        })();
        scope.pop_frame();
        result
    }
}

struct LoopSpec {
    var: String,
    collection: String,
    reversed: bool,
    limit: Option<usize>,
    offset: usize,
}

impl LoopSpec {
    /// `<var> in <collection> [reversed] [limit: n] [offset: n]`, with
    /// the modifiers accepted in any order.
    fn parse(
        tag: &TagNode,
        renderer: &Renderer<'_>,
        scope: &mut Scope<'_>,
    ) -> Result<Self, RenderError> {
        let mut words = tag.bits.iter().map(String::as_str);

        let var = words
            .next()
            .ok_or_else(|| malformed(tag, "missing loop variable"))?
            .to_string();
        if words.next() != Some("in") {
            return Err(malformed(tag, "expected `in` after the loop variable"));
        }
        let collection = words
            .next()
            .ok_or_else(|| malformed(tag, "missing collection expression"))?
            .to_string();

        let mut spec = Self {
            var,
            collection,
            reversed: false,
            limit: None,
            offset: 0,
        };
        while let Some(word) = words.next() {
            match word {
                "reversed" => spec.reversed = true,
                _ if word.starts_with("limit:") => {
                    let n = modifier_value(tag, "limit", word, words.next(), renderer, scope)?;
                    spec.limit = Some(n);
                }
                _ if word.starts_with("offset:") => {
                    spec.offset =
                        modifier_value(tag, "offset", word, words.next(), renderer, scope)?;
                }
                other => {
                    return Err(malformed(tag, format!("unexpected argument {other:?}")));
                }
            }
        }
        Ok(spec)
    }

    fn items(
        &self,
        renderer: &Renderer<'_>,
        scope: &mut Scope<'_>,
    ) -> Result<Vec<Value>, RenderError> {
        let collection = renderer.eval(&parse_expression(&self.collection)?, scope)?;
        let mut items: Vec<Value> = match collection {
            Value::Array(items) => items,
            // Maps iterate as [key, value] pairs.
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| Value::Array(vec![Value::String(k), v]))
                .collect(),
            _ => Vec::new(),
        };

        if self.offset > 0 {
            items = items.split_off(self.offset.min(items.len()));
        }
        if let Some(limit) = self.limit {
            items.truncate(limit);
        }
        if self.reversed {
            items.reverse();
        }
        Ok(items)
    }
}

/// A `limit:` or `offset:` value may sit in the same word as the
/// keyword or in the next one, and may itself be a variable.
fn modifier_value(
    tag: &TagNode,
    name: &str,
    word: &str,
    next: Option<&str>,
    renderer: &Renderer<'_>,
    scope: &mut Scope<'_>,
) -> Result<usize, RenderError> {
    let raw = match word.split_once(':') {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => next.ok_or_else(|| malformed(tag, format!("{name}: requires a value")))?,
    };
    let value = renderer.eval(&parse_expression(raw)?, scope)?;
    let n = match value.to_number() {
        Some(Number::Int(i)) if i >= 0 => i,
        _ => {
            return Err(malformed(
                tag,
                format!("{name}: expects a non-negative integer"),
            ));
        }
    };
    Ok(usize::try_from(n).unwrap_or(usize::MAX))
}

fn forloop_object(index: usize, length: usize) -> Value {
    let as_int = |n: usize| Value::Int(i64::try_from(n).unwrap_or(i64::MAX));
    let mut map = ValueMap::new();
    map.insert("index".to_string(), as_int(index + 1));
    map.insert("index0".to_string(), as_int(index));
    map.insert("rindex".to_string(), as_int(length - index));
    map.insert("rindex0".to_string(), as_int(length - index - 1));
    map.insert("first".to_string(), Value::Bool(index == 0));
    map.insert("last".to_string(), Value::Bool(index + 1 == length));
    map.insert("length".to_string(), as_int(length));
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn forloop_object_tracks_position() {
        let Value::Object(first) = forloop_object(0, 3) else {
            panic!()
        };
        assert_eq!(first["index"], Value::Int(1));
        assert_eq!(first["rindex"], Value::Int(3));
        assert_eq!(first["first"], Value::Bool(true));
        assert_eq!(first["last"], Value::Bool(false));

        let Value::Object(last) = forloop_object(2, 3) else {
            panic!()
        };
        assert_eq!(last["index0"], Value::Int(2));
        assert_eq!(last["rindex0"], Value::Int(0));
        assert_eq!(last["last"], Value::Bool(true));
    }
}
