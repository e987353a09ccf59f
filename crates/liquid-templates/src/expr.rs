use serde::Serialize;

use crate::error::ParseError;
use crate::quotes::find_unquoted;
use crate::quotes::split_unquoted;
use crate::spans::Span;

/// A variable-path reference or a literal, resolved against the render
/// context at render time, never at parse time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Expression {
    Literal(Literal),
    Variable(Vec<PathSegment>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Literal {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// One step of a dot/bracket path: `a.b[0]["c d"]` is
/// `[Key("a"), Key("b"), Index(0), Key("c d")]`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum PathSegment {
    Key(String),
    Index(i64),
}

/// One stage of a filter pipeline: `truncate: 5, "..."`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Expression>,
    pub span: Span,
}

/// Parse the content of an output construct (or an `assign` right-hand
/// side): a head expression followed by zero or more `| name: args`
/// stages. `base` is the byte offset of `content` in the template
/// source, used for filter spans.
pub fn parse_pipeline(
    content: &str,
    base: u32,
) -> Result<(Expression, Vec<FilterCall>), ParseError> {
    let mut segments = split_unquoted(content, '|').into_iter();

    let (head, head_offset) = segments.next().unwrap_or(("", 0));
    let head = head.trim();
    if head.is_empty() {
        return Err(ParseError::EmptyExpression {
            position: base as usize + head_offset,
        });
    }
    let expression = parse_expression(head)?;

    let mut filters = Vec::new();
    for (segment, offset) in segments {
        filters.push(parse_filter(segment, base + offset_u32(offset))?);
    }

    Ok((expression, filters))
}

/// Parse a single filter segment (the text between two unquoted pipes),
/// e.g. `default: 'nothing'` or `upcase`.
fn parse_filter(raw: &str, base: u32) -> Result<FilterCall, ParseError> {
    let leading = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    let position = (base as usize) + leading;

    if trimmed.is_empty() {
        return Err(ParseError::InvalidFilterSyntax {
            position,
            reason: "empty filter segment".to_string(),
        });
    }

    let (name, args_raw) = match find_unquoted(trimmed, ':') {
        Some(colon) => (trimmed[..colon].trim(), Some(&trimmed[colon + 1..])),
        None => (trimmed, None),
    };

    if name.is_empty() {
        return Err(ParseError::InvalidFilterSyntax {
            position,
            reason: "missing filter name before ':'".to_string(),
        });
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ParseError::InvalidFilterSyntax {
            position,
            reason: format!("'{name}' is not a valid filter name"),
        });
    }

    let mut args = Vec::new();
    if let Some(args_raw) = args_raw {
        for (arg, arg_offset) in split_unquoted(args_raw, ',') {
            let arg = arg.trim();
            if arg.is_empty() {
                return Err(ParseError::InvalidFilterSyntax {
                    position: position + arg_offset,
                    reason: format!("empty argument to filter '{name}'"),
                });
            }
            args.push(parse_expression(arg)?);
        }
    }

    let span = Span::new(offset_u32(position), offset_u32(trimmed.len()));
    Ok(FilterCall {
        name: name.to_string(),
        args,
        span,
    })
}

/// Parse a single expression: a quoted string, a number, one of the
/// literal keywords, or a variable path.
///
/// Keywords are only recognized in whole-expression position; `true.x`
/// or a path containing `nil` as a key stays an ordinary variable path.
pub fn parse_expression(raw: &str) -> Result<Expression, ParseError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(ParseError::MalformedExpression {
            content: raw.to_string(),
            reason: "empty expression".to_string(),
        });
    }

    if let Some(quote) = leading_quote(trimmed) {
        return parse_string_literal(trimmed, quote);
    }

    match trimmed {
        "true" => return Ok(Expression::Literal(Literal::Bool(true))),
        "false" => return Ok(Expression::Literal(Literal::Bool(false))),
        "nil" | "null" => return Ok(Expression::Literal(Literal::Nil)),
        _ => {}
    }

    if looks_numeric(trimmed) {
        return parse_number(trimmed);
    }

    Ok(Expression::Variable(parse_path(trimmed)?))
}

fn leading_quote(s: &str) -> Option<char> {
    match s.chars().next() {
        Some(c @ ('\'' | '"')) => Some(c),
        _ => None,
    }
}

fn parse_string_literal(s: &str, quote: char) -> Result<Expression, ParseError> {
    let malformed = |reason: &str| ParseError::MalformedExpression {
        content: s.to_string(),
        reason: reason.to_string(),
    };

    if s.len() < 2 || !s.ends_with(quote) {
        return Err(malformed("unterminated string literal"));
    }

    let inner = &s[quote.len_utf8()..s.len() - quote.len_utf8()];
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(escaped) => value.push(escaped),
                None => return Err(malformed("dangling escape at end of string literal")),
            }
        } else if ch == quote {
            return Err(malformed("unescaped quote inside string literal"));
        } else {
            value.push(ch);
        }
    }

    Ok(Expression::Literal(Literal::Str(value)))
}

fn looks_numeric(s: &str) -> bool {
    let rest = s.strip_prefix(['-', '+']).unwrap_or(s);
    rest.starts_with(|c: char| c.is_ascii_digit())
}

fn parse_number(s: &str) -> Result<Expression, ParseError> {
    if let Ok(int) = s.parse::<i64>() {
        return Ok(Expression::Literal(Literal::Int(int)));
    }
    if let Ok(float) = s.parse::<f64>() {
        return Ok(Expression::Literal(Literal::Float(float)));
    }
    Err(ParseError::MalformedExpression {
        content: s.to_string(),
        reason: "invalid numeric literal".to_string(),
    })
}

fn parse_path(s: &str) -> Result<Vec<PathSegment>, ParseError> {
    let malformed = |reason: String| ParseError::MalformedExpression {
        content: s.to_string(),
        reason,
    };

    let mut segments = Vec::new();
    let mut pos = 0;

    let head_end = s[pos..]
        .find(['.', '['])
        .map_or(s.len(), |offset| pos + offset);
    let head = &s[pos..head_end];
    if head.is_empty() {
        return Err(malformed("missing variable name".to_string()));
    }
    if head.chars().any(char::is_whitespace) {
        return Err(malformed(format!("'{head}' is not a valid variable name")));
    }
    segments.push(PathSegment::Key(head.to_string()));
    pos = head_end;

    while pos < s.len() {
        match s.as_bytes()[pos] {
            b'.' => {
                pos += 1;
                let end = s[pos..]
                    .find(['.', '['])
                    .map_or(s.len(), |offset| pos + offset);
                let key = &s[pos..end];
                if key.is_empty() || key.chars().any(char::is_whitespace) {
                    return Err(malformed("invalid key after '.'".to_string()));
                }
                segments.push(PathSegment::Key(key.to_string()));
                pos = end;
            }
            b'[' => {
                let inner_start = pos + 1;
                let close = find_unquoted(&s[inner_start..], ']')
                    .ok_or_else(|| malformed("missing ']' in bracket index".to_string()))?;
                let inner = s[inner_start..inner_start + close].trim();
                segments.push(parse_bracket_segment(inner, &malformed)?);
                pos = inner_start + close + 1;
            }
            _ => {
                return Err(malformed(format!(
                    "unexpected character '{}' in variable path",
                    &s[pos..].chars().next().unwrap_or('\0')
                )));
            }
        }
    }

    Ok(segments)
}

fn parse_bracket_segment(
    inner: &str,
    malformed: &impl Fn(String) -> ParseError,
) -> Result<PathSegment, ParseError> {
    if inner.is_empty() {
        return Err(malformed("empty bracket index".to_string()));
    }
    if let Some(quote) = leading_quote(inner) {
        let Ok(Expression::Literal(Literal::Str(key))) = parse_string_literal(inner, quote) else {
            return Err(malformed(format!("invalid bracket key {inner}")));
        };
        return Ok(PathSegment::Key(key));
    }
    if let Ok(index) = inner.parse::<i64>() {
        return Ok(PathSegment::Index(index));
    }
    if inner.chars().any(char::is_whitespace) {
        return Err(malformed(format!("invalid bracket index '{inner}'")));
    }
    // Bare word: treated as a string key, e.g. `a[b]` is `a["b"]`
    Ok(PathSegment::Key(inner.to_string()))
}

fn offset_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn var(segments: &[PathSegment]) -> Expression {
        Expression::Variable(segments.to_vec())
    }

    fn key(s: &str) -> PathSegment {
        PathSegment::Key(s.to_string())
    }

    #[test]
    fn bare_name() {
        assert_eq!(parse_expression("user").unwrap(), var(&[key("user")]));
    }

    #[test]
    fn dotted_path() {
        assert_eq!(
            parse_expression("user.profile.email").unwrap(),
            var(&[key("user"), key("profile"), key("email")])
        );
    }

    #[test]
    fn bracket_indexes() {
        assert_eq!(
            parse_expression("arr[0][1]").unwrap(),
            var(&[key("arr"), PathSegment::Index(0), PathSegment::Index(1)])
        );
    }

    #[test]
    fn bracket_string_key() {
        assert_eq!(
            parse_expression(r#"a["b c"].d"#).unwrap(),
            var(&[key("a"), key("b c"), key("d")])
        );
    }

    #[test]
    fn mixed_path() {
        assert_eq!(
            parse_expression("items[2].name").unwrap(),
            var(&[key("items"), PathSegment::Index(2), key("name")])
        );
    }

    #[test]
    fn string_literals_both_quote_styles() {
        assert_eq!(
            parse_expression("'hello'").unwrap(),
            Expression::Literal(Literal::Str("hello".to_string()))
        );
        assert_eq!(
            parse_expression("\"world\"").unwrap(),
            Expression::Literal(Literal::Str("world".to_string()))
        );
    }

    #[test]
    fn string_literal_with_escapes() {
        assert_eq!(
            parse_expression(r#""say \"hi\"""#).unwrap(),
            Expression::Literal(Literal::Str(r#"say "hi""#.to_string()))
        );
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(
            parse_expression("42").unwrap(),
            Expression::Literal(Literal::Int(42))
        );
        assert_eq!(
            parse_expression("-42").unwrap(),
            Expression::Literal(Literal::Int(-42))
        );
        assert_eq!(
            parse_expression("3.5").unwrap(),
            Expression::Literal(Literal::Float(3.5))
        );
        assert_eq!(
            parse_expression("9007199254740991").unwrap(),
            Expression::Literal(Literal::Int(9_007_199_254_740_991))
        );
    }

    #[test]
    fn keyword_literals() {
        assert_eq!(
            parse_expression("true").unwrap(),
            Expression::Literal(Literal::Bool(true))
        );
        assert_eq!(
            parse_expression("nil").unwrap(),
            Expression::Literal(Literal::Nil)
        );
        assert_eq!(
            parse_expression("null").unwrap(),
            Expression::Literal(Literal::Nil)
        );
    }

    #[test]
    fn keywords_in_path_position_are_plain_keys() {
        // `if`/`true` are only special in tag-name or whole-expression
        // position; as path components they are ordinary keys
        assert_eq!(parse_expression("if").unwrap(), var(&[key("if")]));
        assert_eq!(
            parse_expression("config.true").unwrap(),
            var(&[key("config"), key("true")])
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(matches!(
            parse_expression("'oops"),
            Err(ParseError::MalformedExpression { .. })
        ));
    }

    #[test]
    fn missing_bracket_close_is_an_error() {
        assert!(matches!(
            parse_expression("a[0"),
            Err(ParseError::MalformedExpression { .. })
        ));
    }

    #[test]
    fn pipeline_head_and_filters() {
        let (head, filters) = parse_pipeline("name | upcase | truncate: 5, '...'", 0).unwrap();
        assert_eq!(head, var(&[key("name")]));
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].name, "upcase");
        assert!(filters[0].args.is_empty());
        assert_eq!(filters[1].name, "truncate");
        assert_eq!(
            filters[1].args,
            vec![
                Expression::Literal(Literal::Int(5)),
                Expression::Literal(Literal::Str("...".to_string())),
            ]
        );
    }

    #[test]
    fn pipeline_pipe_inside_quotes_is_not_a_separator() {
        let (_, filters) = parse_pipeline(r#"x | default: "a|b""#, 0).unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(
            filters[0].args,
            vec![Expression::Literal(Literal::Str("a|b".to_string()))]
        );
    }

    #[test]
    fn pipeline_colon_inside_quotes_is_argument_content() {
        let (_, filters) = parse_pipeline(r#"posted | date: "H:i:s""#, 0).unwrap();
        assert_eq!(filters[0].name, "date");
        assert_eq!(
            filters[0].args,
            vec![Expression::Literal(Literal::Str("H:i:s".to_string()))]
        );
    }

    #[test]
    fn pipeline_variable_argument() {
        let (_, filters) = parse_pipeline("x | default: other", 0).unwrap();
        assert_eq!(filters[0].args, vec![var(&[key("other")])]);
    }

    #[test]
    fn pipeline_empty_head_is_an_error() {
        assert!(matches!(
            parse_pipeline("  | upcase", 0),
            Err(ParseError::EmptyExpression { .. })
        ));
    }

    #[test]
    fn pipeline_trailing_pipe_is_an_error() {
        assert!(matches!(
            parse_pipeline("value |", 0),
            Err(ParseError::InvalidFilterSyntax { .. })
        ));
    }

    #[test]
    fn filter_spans_are_byte_accurate() {
        let (_, filters) = parse_pipeline("v|ab|cd: x", 3).unwrap();
        assert_eq!(filters[0].span, Span::new(5, 2));
        assert_eq!(filters[1].span, Span::new(8, 5));
    }
}
