//! `if`, `unless` and `case`.

use liquid_templates::parse_expression;
use liquid_templates::split_unquoted;
use liquid_templates::TagNode;

use super::malformed;
use super::TagHandler;
use crate::context::Scope;
use crate::error::RenderError;
use crate::renderer::Renderer;
use crate::value::Value;

pub(super) struct IfTag;

impl TagHandler for IfTag {
    fn render(
        &self,
        tag: &TagNode,
        renderer: &Renderer<'_>,
        scope: &mut Scope<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        if eval_condition(tag, &tag.bits, renderer, scope)? {
            return renderer.render_nodes(&tag.body, scope, out);
        }
        for branch in &tag.branches {
            let taken = match branch.name.as_str() {
                "elsif" => eval_condition(tag, &branch.bits, renderer, scope)?,
                _ => true,
            };
            if taken {
                return renderer.render_nodes(&branch.body, scope, out);
            }
        }
        Ok(())
    }
}

pub(super) struct UnlessTag;

impl TagHandler for UnlessTag {
    fn render(
        &self,
        tag: &TagNode,
        renderer: &Renderer<'_>,
        scope: &mut Scope<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        if !eval_condition(tag, &tag.bits, renderer, scope)? {
            return renderer.render_nodes(&tag.body, scope, out);
        }
        if let Some(branch) = tag.branches.first() {
            return renderer.render_nodes(&branch.body, scope, out);
        }
        Ok(())
    }
}

/// `case` compares its subject against each `when` with loose equality
/// and renders the first matching branch, or `else` if none match.
/// A `when` may list several values separated by commas.
pub(super) struct CaseTag;

impl TagHandler for CaseTag {
    fn render(
        &self,
        tag: &TagNode,
        renderer: &Renderer<'_>,
        scope: &mut Scope<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let raw = tag.raw_args();
        if raw.is_empty() {
            return Err(malformed(tag, "missing subject expression"));
        }
        let subject = renderer.eval(&parse_expression(&raw)?, scope)?;

        for branch in &tag.branches {
            match branch.name.as_str() {
                "when" => {
                    let candidates = branch.raw_args();
                    if candidates.is_empty() {
                        return Err(malformed(tag, "when requires at least one value"));
                    }
                    for (segment, _) in split_unquoted(&candidates, ',') {
                        let segment = segment.trim();
                        if segment.is_empty() {
                            continue;
                        }
                        let candidate = renderer.eval(&parse_expression(segment)?, scope)?;
                        if subject.loose_eq(&candidate) {
                            return renderer.render_nodes(&branch.body, scope, out);
                        }
                    }
                }
                _ => return renderer.render_nodes(&branch.body, scope, out),
            }
        }
        Ok(())
    }
}

/// Evaluate a condition word list: comparison clauses joined by `and`
/// and `or`, combined left to right without precedence.
pub(super) fn eval_condition(
    tag: &TagNode,
    bits: &[String],
    renderer: &Renderer<'_>,
    scope: &mut Scope<'_>,
) -> Result<bool, RenderError> {
    let mut words = bits.iter().map(String::as_str).peekable();

    let mut result = eval_clause(tag, &mut words, renderer, scope)?;
    while let Some(connective) = words.next() {
        let rhs = eval_clause(tag, &mut words, renderer, scope)?;
        match connective {
            "and" => result = result && rhs,
            "or" => result = result || rhs,
            other => {
                return Err(malformed(
                    tag,
                    format!("expected `and` or `or`, found {other:?}"),
                ));
            }
        }
    }
    Ok(result)
}

fn eval_clause<'a, I>(
    tag: &TagNode,
    words: &mut std::iter::Peekable<I>,
    renderer: &Renderer<'_>,
    scope: &mut Scope<'_>,
) -> Result<bool, RenderError>
where
    I: Iterator<Item = &'a str>,
{
    let lhs_raw = words
        .next()
        .ok_or_else(|| malformed(tag, "missing condition"))?;
    let lhs = renderer.eval(&parse_expression(lhs_raw)?, scope)?;

    let Some(op) = words.peek().copied().filter(|w| is_operator(w)) else {
        return Ok(lhs.is_truthy());
    };
    words.next();

    let rhs_raw = words
        .next()
        .ok_or_else(|| malformed(tag, format!("missing operand after {op:?}")))?;
    let rhs = renderer.eval(&parse_expression(rhs_raw)?, scope)?;

    Ok(compare(&lhs, op, &rhs))
}

fn is_operator(word: &str) -> bool {
    matches!(word, "==" | "!=" | "<" | "<=" | ">" | ">=" | "contains")
}

/// Ordering comparisons between incomparable values are false, never
/// an error.
fn compare(lhs: &Value, op: &str, rhs: &Value) -> bool {
    use std::cmp::Ordering;

    match op {
        "==" => lhs.loose_eq(rhs),
        "!=" => !lhs.loose_eq(rhs),
        "<" => lhs.compare(rhs) == Some(Ordering::Less),
        "<=" => matches!(lhs.compare(rhs), Some(Ordering::Less | Ordering::Equal)),
        ">" => lhs.compare(rhs) == Some(Ordering::Greater),
        ">=" => matches!(lhs.compare(rhs), Some(Ordering::Greater | Ordering::Equal)),
        "contains" => contains(lhs, rhs),
        _ => false,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => s.contains(&needle.to_output_string()),
        Value::Array(items) => items.iter().any(|item| item.loose_eq(needle)),
        Value::Object(map) => map.contains_key(&needle.to_output_string()),
        _ => false,
    }
}
