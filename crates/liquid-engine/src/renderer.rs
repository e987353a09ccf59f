//! Tree-walking renderer.

use liquid_templates::Expression;
use liquid_templates::FilterCall;
use liquid_templates::Literal;
use liquid_templates::Node;
use liquid_templates::PathSegment;

use crate::context::Scope;
use crate::engine::EngineOptions;
use crate::error::ContextError;
use crate::error::FilterError;
use crate::error::RenderError;
use crate::error::TagError;
use crate::filters::FilterRegistry;
use crate::tags::TagRegistry;
use crate::value::Value;

/// Walks a parsed node tree against a [`Scope`], appending rendered
/// text to an output buffer. Holds no mutable state of its own, so a
/// single renderer serves nested bodies reentrantly.
pub struct Renderer<'a> {
    filters: &'a FilterRegistry,
    tags: &'a TagRegistry,
    options: &'a EngineOptions,
}

impl<'a> Renderer<'a> {
    #[must_use]
    pub fn new(
        filters: &'a FilterRegistry,
        tags: &'a TagRegistry,
        options: &'a EngineOptions,
    ) -> Self {
        Self {
            filters,
            tags,
            options,
        }
    }

    pub fn render_nodes(
        &self,
        nodes: &[Node],
        scope: &mut Scope<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Text { content, .. } => out.push_str(content),
                Node::Comment { .. } => {}
                Node::Output {
                    expression,
                    filters,
                    ..
                } => {
                    let value = self.eval(expression, scope)?;
                    let value = self.apply_filters(value, filters, scope)?;
                    out.push_str(&value.to_output_string());
                }
                Node::Tag(tag) => {
                    let Some(handler) = self.tags.resolve(&tag.name) else {
                        return Err(TagError::Unknown {
                            name: tag.name.clone(),
                        }
                        .into());
                    };
                    handler.render(tag, self, scope, out)?;
                }
            }
        }
        Ok(())
    }

    /// Resolve an expression to a value. Undefined variables become
    /// nil unless strict variable mode is on.
    pub fn eval(&self, expression: &Expression, scope: &Scope<'_>) -> Result<Value, RenderError> {
        match expression {
            Expression::Literal(literal) => Ok(literal_value(literal)),
            Expression::Variable(path) => match scope.resolve_path(path) {
                Some(value) => Ok(value),
                None if self.options.strict_variables => Err(ContextError::Undefined {
                    path: display_path(path),
                }
                .into()),
                None => Ok(Value::Nil),
            },
        }
    }

    /// Thread a value through a filter chain, left to right. Unknown
    /// filters are errors unless lenient filter mode is on, in which
    /// case they pass the value through untouched.
    pub fn apply_filters(
        &self,
        mut value: Value,
        filters: &[FilterCall],
        scope: &Scope<'_>,
    ) -> Result<Value, RenderError> {
        for call in filters {
            let Some(filter) = self.filters.resolve(&call.name) else {
                if self.options.lenient_filters {
                    continue;
                }
                return Err(FilterError::Unknown {
                    name: call.name.clone(),
                }
                .into());
            };
            let args = call
                .args
                .iter()
                .map(|arg| self.eval(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            value = filter.apply(&value, &args)?;
        }
        Ok(value)
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Nil => Value::Nil,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::Str(s) => Value::String(s.clone()),
    }
}

fn display_path(path: &[PathSegment]) -> String {
    let mut rendered = String::new();
    for segment in path {
        match segment {
            PathSegment::Key(key) => {
                if !rendered.is_empty() {
                    rendered.push('.');
                }
                rendered.push_str(key);
            }
            PathSegment::Index(index) => {
                rendered.push('[');
                rendered.push_str(&index.to_string());
                rendered.push(']');
            }
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use liquid_templates::parse;
    use liquid_templates::TagSpecs;
    use pretty_assertions::assert_eq;

    use super::*;

    fn render(source: &str, data: serde_json::Value) -> Result<String, RenderError> {
        render_with(source, data, &EngineOptions::default())
    }

    fn render_with(
        source: &str,
        data: serde_json::Value,
        options: &EngineOptions,
    ) -> Result<String, RenderError> {
        let specs = TagSpecs::builtin();
        let nodes = parse(source, &specs).expect("template parses");
        let filters = FilterRegistry::with_builtins();
        let tags = TagRegistry::with_builtins();
        let renderer = Renderer::new(&filters, &tags, options);

        let root = Value::from(data);
        let mut scope = Scope::new(&root);
        let mut out = String::new();
        renderer.render_nodes(&nodes, &mut scope, &mut out)?;
        Ok(out)
    }

    #[test]
    fn text_and_output() {
        let out = render(
            "Hello, {{ name }}!",
            serde_json::json!({ "name": "World" }),
        )
        .unwrap();
        assert_eq!(out, "Hello, World!");
    }

    #[test]
    fn filter_chains_apply_left_to_right() {
        let out = render(
            "{{ name | upcase | append: '!' }}",
            serde_json::json!({ "name": "ada" }),
        )
        .unwrap();
        assert_eq!(out, "ADA!");
    }

    #[test]
    fn undefined_variables_render_empty_by_default() {
        let out = render("[{{ missing }}]", serde_json::json!({})).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn strict_variables_error_on_undefined() {
        let options = EngineOptions {
            strict_variables: true,
            ..EngineOptions::default()
        };
        let err = render_with("{{ user.name }}", serde_json::json!({}), &options).unwrap_err();
        assert!(matches!(err, RenderError::Context(ContextError::Undefined { ref path }) if path == "user.name"));
    }

    #[test]
    fn unknown_filters_error_unless_lenient() {
        let data = serde_json::json!({ "x": "hi" });
        let err = render("{{ x | nope }}", data.clone()).unwrap_err();
        assert!(matches!(err, RenderError::Filter(FilterError::Unknown { .. })));

        let options = EngineOptions {
            lenient_filters: true,
            ..EngineOptions::default()
        };
        let out = render_with("{{ x | nope | upcase }}", data, &options).unwrap();
        assert_eq!(out, "HI");
    }

    #[test]
    fn unknown_tags_error_at_render_time() {
        let err = render("{% include 'snippet' %}", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, RenderError::Tag(TagError::Unknown { ref name }) if name == "include"));
    }

    #[test]
    fn if_elsif_else() {
        let template = "{% if n > 2 %}big{% elsif n > 0 %}small{% else %}none{% endif %}";
        assert_eq!(render(template, serde_json::json!({ "n": 5 })).unwrap(), "big");
        assert_eq!(
            render(template, serde_json::json!({ "n": 1 })).unwrap(),
            "small"
        );
        assert_eq!(
            render(template, serde_json::json!({ "n": 0 })).unwrap(),
            "none"
        );
    }

    #[test]
    fn truthiness_only_rejects_nil_and_false() {
        let template = "{% if x %}y{% else %}n{% endif %}";
        assert_eq!(render(template, serde_json::json!({ "x": 0 })).unwrap(), "y");
        assert_eq!(render(template, serde_json::json!({ "x": "" })).unwrap(), "y");
        assert_eq!(render(template, serde_json::json!({ "x": [] })).unwrap(), "y");
        assert_eq!(
            render(template, serde_json::json!({ "x": false })).unwrap(),
            "n"
        );
        assert_eq!(render(template, serde_json::json!({})).unwrap(), "n");
    }

    #[test]
    fn unless_inverts() {
        let template = "{% unless done %}pending{% else %}done{% endunless %}";
        assert_eq!(render(template, serde_json::json!({})).unwrap(), "pending");
        assert_eq!(
            render(template, serde_json::json!({ "done": true })).unwrap(),
            "done"
        );
    }

    #[test]
    fn case_matches_first_when() {
        let template =
            "{% case state %}{% when 'on', 'up' %}+{% when 'off' %}-{% else %}?{% endcase %}";
        assert_eq!(
            render(template, serde_json::json!({ "state": "up" })).unwrap(),
            "+"
        );
        assert_eq!(
            render(template, serde_json::json!({ "state": "off" })).unwrap(),
            "-"
        );
        assert_eq!(
            render(template, serde_json::json!({ "state": "?" })).unwrap(),
            "?"
        );
    }

    #[test]
    fn for_loop_with_forloop_object() {
        let template = "{% for x in xs %}{{ forloop.index }}:{{ x }} {% endfor %}";
        let out = render(template, serde_json::json!({ "xs": ["a", "b"] })).unwrap();
        assert_eq!(out, "1:a 2:b ");
    }

    #[test]
    fn for_loop_modifiers() {
        let data = serde_json::json!({ "xs": [1, 2, 3, 4, 5] });
        assert_eq!(
            render("{% for x in xs limit: 2 %}{{ x }}{% endfor %}", data.clone()).unwrap(),
            "12"
        );
        assert_eq!(
            render(
                "{% for x in xs offset: 3 %}{{ x }}{% endfor %}",
                data.clone()
            )
            .unwrap(),
            "45"
        );
        assert_eq!(
            render("{% for x in xs reversed limit: 2 %}{{ x }}{% endfor %}", data).unwrap(),
            "21"
        );
    }

    #[test]
    fn for_else_on_empty_collection() {
        let template = "{% for x in xs %}{{ x }}{% else %}empty{% endfor %}";
        assert_eq!(
            render(template, serde_json::json!({ "xs": [] })).unwrap(),
            "empty"
        );
        assert_eq!(render(template, serde_json::json!({})).unwrap(), "empty");
    }

    #[test]
    fn loop_variables_do_not_leak() {
        let template = "{% for x in xs %}{{ x }}{% endfor %}[{{ x }}]";
        let out = render(template, serde_json::json!({ "xs": [1] })).unwrap();
        assert_eq!(out, "1[]");
    }

    #[test]
    fn nested_loops_keep_outer_binding() {
        let template = "{% for x in xs %}{% for x in ys %}{{ x }}{% endfor %}{{ x }}{% endfor %}";
        let out = render(
            template,
            serde_json::json!({ "xs": ["a"], "ys": ["1", "2"] }),
        )
        .unwrap();
        assert_eq!(out, "12a");
    }

    #[test]
    fn assign_and_capture() {
        let out = render(
            "{% assign who = name | upcase %}{% capture line %}hi {{ who }}{% endcapture %}{{ line }}",
            serde_json::json!({ "name": "ada" }),
        )
        .unwrap();
        assert_eq!(out, "hi ADA");
    }

    #[test]
    fn comments_render_nothing() {
        let out = render(
            "a{% comment %}{{ not | valid | }}{% endcomment %}b",
            serde_json::json!({}),
        )
        .unwrap();
        assert_eq!(out, "ab");
    }

    #[test]
    fn maps_iterate_as_key_value_pairs() {
        let out = render(
            "{% for pair in m %}{{ pair[0] }}={{ pair[1] }};{% endfor %}",
            serde_json::json!({ "m": { "a": 1, "b": 2 } }),
        )
        .unwrap();
        assert_eq!(out, "a=1;b=2;");
    }
}
