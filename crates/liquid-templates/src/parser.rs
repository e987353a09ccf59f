use crate::ast::Node;
use crate::ast::TagBranch;
use crate::ast::TagNode;
use crate::error::ParseError;
use crate::expr::parse_pipeline;
use crate::quotes::split_words;
use crate::spans::Span;
use crate::tagspecs::TagSpec;
use crate::tagspecs::TagSpecs;
use crate::tokens::Token;
use crate::tokens::TokenKind;

/// Byte width of `{{` / `{%` plus the conventional following space;
/// used to approximate content offsets for diagnostics.
const DELIMITER_OFFSET: u32 = 3;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    specs: &'a TagSpecs,
}

/// An intermediate or closing tag that ended a body.
struct Terminator {
    name: String,
    bits: Vec<String>,
    span: Span,
}

/// The block tag currently being parsed.
struct OpenBlock<'a> {
    name: &'a str,
    spec: &'a TagSpec,
    position: usize,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(mut tokens: Vec<Token>, specs: &'a TagSpecs) -> Self {
        if !tokens.last().is_some_and(|t| matches!(t.kind(), TokenKind::Eof)) {
            let offset = tokens.last().map_or(0, |t| t.span().end());
            tokens.push(Token::new(TokenKind::Eof, offset));
        }
        Self {
            tokens,
            current: 0,
            specs,
        }
    }

    /// Parse the token stream into a node tree.
    ///
    /// Fails closed: the first syntax error aborts the parse, so a
    /// template that parses successfully is fully renderable in shape.
    pub fn parse(&mut self) -> Result<Vec<Node>, ParseError> {
        let (nodes, terminator) = self.parse_body(None)?;
        debug_assert!(terminator.is_none(), "terminators only occur inside blocks");
        Ok(nodes)
    }

    /// Parse nodes until end of input or, when inside a block, until a
    /// closing or intermediate tag of that block.
    fn parse_body(
        &mut self,
        block: Option<&OpenBlock<'_>>,
    ) -> Result<(Vec<Node>, Option<Terminator>), ParseError> {
        let mut nodes = Vec::new();

        loop {
            let token = self.peek().clone();
            match token.kind() {
                TokenKind::Eof => {
                    if let Some(open) = block {
                        let end = open.spec.end.as_ref().map_or("", |end| end.tag.as_str());
                        let optional = open.spec.end.as_ref().is_some_and(|end| end.optional);
                        if !optional {
                            return Err(ParseError::UnclosedTag {
                                tag: open.name.to_string(),
                                expected: end.to_string(),
                                position: open.position,
                            });
                        }
                    }
                    return Ok((nodes, None));
                }
                TokenKind::Error(content) => {
                    return Err(ParseError::UnterminatedConstruct {
                        position: token.offset() as usize,
                        content: content.clone(),
                    });
                }
                TokenKind::Text(content) => {
                    self.advance();
                    // Whitespace control may leave empty text behind
                    if !content.is_empty() {
                        nodes.push(Node::Text {
                            content: content.clone(),
                            span: token.span(),
                        });
                    }
                }
                TokenKind::Output(content) => {
                    self.advance();
                    nodes.push(self.parse_output(content, &token)?);
                }
                TokenKind::Tag(content) => {
                    let position = token.offset() as usize;
                    let mut bits = split_words(content);
                    if bits.is_empty() {
                        return Err(ParseError::EmptyTag { position });
                    }
                    let name = bits.remove(0);

                    // Does this tag terminate the enclosing block?
                    if let Some(open) = block {
                        let closes = open
                            .spec
                            .end
                            .as_ref()
                            .is_some_and(|end| end.tag == name);
                        if closes || open.spec.accepts_branch(&name) {
                            self.advance();
                            let terminator = Terminator {
                                name,
                                bits,
                                span: token.span(),
                            };
                            return Ok((nodes, Some(terminator)));
                        }
                    }

                    self.advance();
                    nodes.push(self.parse_tag(name, bits, &token, block)?);
                }
            }
        }
    }

    fn parse_output(&mut self, content: &str, token: &Token) -> Result<Node, ParseError> {
        let base = token.offset() + DELIMITER_OFFSET;
        if content.is_empty() {
            return Err(ParseError::EmptyExpression {
                position: token.offset() as usize,
            });
        }
        let (expression, filters) = parse_pipeline(content, base)?;
        Ok(Node::Output {
            expression,
            filters,
            span: token.span(),
        })
    }

    fn parse_tag(
        &mut self,
        name: String,
        bits: Vec<String>,
        token: &Token,
        enclosing: Option<&OpenBlock<'_>>,
    ) -> Result<Node, ParseError> {
        let position = token.offset() as usize;

        if let Some(spec) = self.specs.get(&name) {
            if spec.end.is_some() {
                if name == "comment" {
                    return self.skip_comment_body(position, token.span());
                }
                return self.parse_block_tag(name, bits, spec, token);
            }
            // Simple registered tag, e.g. `assign`
            return Ok(Node::Tag(TagNode {
                name,
                bits,
                body: Vec::new(),
                branches: Vec::new(),
                span: token.span(),
            }));
        }

        if self.specs.find_opener_for_closer(&name).is_some() {
            return Err(match enclosing {
                Some(block) => ParseError::MismatchedCloser {
                    found: name,
                    open: block.name.to_string(),
                    expected: block
                        .spec
                        .end
                        .as_ref()
                        .map_or_else(String::new, |end| end.tag.clone()),
                    position,
                },
                None => ParseError::StrayCloser {
                    found: name,
                    position,
                },
            });
        }

        if let Some(container) = self.specs.find_container_for_branch(&name) {
            return Err(ParseError::OrphanedBranch {
                found: name,
                container: container.to_string(),
                position,
            });
        }

        // Unknown tag: parsed as a simple tag, surfaced as a
        // render-time tag error unless a handler has been registered
        Ok(Node::Tag(TagNode {
            name,
            bits,
            body: Vec::new(),
            branches: Vec::new(),
            span: token.span(),
        }))
    }

    fn parse_block_tag(
        &mut self,
        name: String,
        bits: Vec<String>,
        spec: &TagSpec,
        token: &Token,
    ) -> Result<Node, ParseError> {
        let open = OpenBlock {
            name: &name,
            spec,
            position: token.offset() as usize,
        };
        let closer = spec.end.as_ref().map_or("", |end| end.tag.as_str());

        let (body, mut terminator) = self.parse_body(Some(&open))?;

        let mut branches = Vec::new();
        while let Some(term) = terminator {
            if term.name == closer {
                terminator = None;
                break;
            }
            let (branch_body, next) = self.parse_body(Some(&open))?;
            branches.push(TagBranch {
                name: term.name,
                bits: term.bits,
                body: branch_body,
                span: term.span,
            });
            terminator = next;
        }
        let _ = terminator; // None: closed explicitly or by optional end at EOF

        Ok(Node::Tag(TagNode {
            name,
            bits,
            body,
            branches,
            span: token.span(),
        }))
    }

    /// Consume everything up to the matching `endcomment`, honoring
    /// nesting. The body is never interpreted, so malformed expressions
    /// inside a comment are not errors; an unterminated construct still
    /// is, because the closer can no longer be found.
    fn skip_comment_body(&mut self, position: usize, span: Span) -> Result<Node, ParseError> {
        let mut depth = 1usize;

        loop {
            let token = self.peek().clone();
            match token.kind() {
                TokenKind::Eof => {
                    return Err(ParseError::UnclosedTag {
                        tag: "comment".to_string(),
                        expected: "endcomment".to_string(),
                        position,
                    });
                }
                TokenKind::Error(content) => {
                    return Err(ParseError::UnterminatedConstruct {
                        position: token.offset() as usize,
                        content: content.clone(),
                    });
                }
                TokenKind::Tag(content) => {
                    self.advance();
                    let name = content.split_whitespace().next().unwrap_or("");
                    if name == "comment" {
                        depth += 1;
                    } else if name == "endcomment" {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(Node::Comment { span });
                        }
                    }
                }
                _ => self.advance(),
            }
        }
    }

    fn peek(&self) -> &Token {
        // The stream always ends with Eof and advance() never passes it
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.current + 1 < self.tokens.len() {
            self.current += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::expr::Expression;
    use crate::expr::Literal;
    use crate::expr::PathSegment;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Result<Vec<Node>, ParseError> {
        let specs = TagSpecs::builtin();
        let (tokens, _) = Lexer::new(source).tokenize();
        Parser::new(tokens, &specs).parse()
    }

    fn tag(node: &Node) -> &TagNode {
        match node {
            Node::Tag(tag) => tag,
            other => panic!("expected tag node, got {other:?}"),
        }
    }

    #[test]
    fn empty_template() {
        assert_eq!(parse("").unwrap(), Vec::new());
    }

    #[test]
    fn text_only() {
        let nodes = parse("hello").unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(matches!(&nodes[0], Node::Text { content, .. } if content == "hello"));
    }

    #[test]
    fn output_with_filters() {
        let nodes = parse("{{ user.name | upcase | truncate: 3 }}").unwrap();
        let Node::Output {
            expression,
            filters,
            ..
        } = &nodes[0]
        else {
            panic!("expected output node");
        };
        assert_eq!(
            *expression,
            Expression::Variable(vec![
                PathSegment::Key("user".to_string()),
                PathSegment::Key("name".to_string()),
            ])
        );
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].name, "upcase");
        assert_eq!(filters[1].name, "truncate");
        assert_eq!(filters[1].args, vec![Expression::Literal(Literal::Int(3))]);
    }

    #[test]
    fn if_block_with_branches() {
        let nodes = parse("{% if a %}1{% elsif b %}2{% else %}3{% endif %}").unwrap();
        let tag = tag(&nodes[0]);
        assert_eq!(tag.name, "if");
        assert_eq!(tag.bits, vec!["a"]);
        assert_eq!(tag.body.len(), 1);
        assert_eq!(tag.branches.len(), 2);
        assert_eq!(tag.branches[0].name, "elsif");
        assert_eq!(tag.branches[0].bits, vec!["b"]);
        assert_eq!(tag.branches[1].name, "else");
        assert!(tag.branches[1].bits.is_empty());
    }

    #[test]
    fn nested_blocks_attach_to_the_right_parent() {
        let nodes = parse("{% for x in xs %}{% if x %}y{% endif %}{% endfor %}").unwrap();
        let outer = tag(&nodes[0]);
        assert_eq!(outer.name, "for");
        let inner = tag(&outer.body[0]);
        assert_eq!(inner.name, "if");
        assert_eq!(inner.body.len(), 1);
    }

    #[test]
    fn nested_else_binds_to_innermost_block() {
        let nodes = parse("{% if a %}{% for x in xs %}b{% else %}c{% endfor %}{% endif %}").unwrap();
        let outer = tag(&nodes[0]);
        assert_eq!(outer.name, "if");
        assert!(outer.branches.is_empty());
        let inner = tag(&outer.body[0]);
        assert_eq!(inner.name, "for");
        assert_eq!(inner.branches.len(), 1);
        assert_eq!(inner.branches[0].name, "else");
    }

    #[test]
    fn case_with_multiple_whens() {
        let nodes = parse("{% case x %}{% when 1 %}a{% when 2, 3 %}b{% else %}c{% endcase %}")
            .unwrap();
        let tag = tag(&nodes[0]);
        assert_eq!(tag.name, "case");
        assert_eq!(tag.branches.len(), 3);
        assert_eq!(tag.branches[0].name, "when");
        assert_eq!(tag.branches[1].bits, vec!["2,", "3"]);
        assert_eq!(tag.branches[2].name, "else");
    }

    #[test]
    fn assign_is_a_simple_tag() {
        let nodes = parse("{% assign a = b %}").unwrap();
        let tag = tag(&nodes[0]);
        assert_eq!(tag.name, "assign");
        assert_eq!(tag.bits, vec!["a", "=", "b"]);
        assert!(tag.body.is_empty());
    }

    #[test]
    fn comment_body_is_skipped_not_interpreted() {
        let nodes = parse("a{% comment %} {{ not | valid | }} {% endcomment %}b").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[1], Node::Comment { .. }));
    }

    #[test]
    fn nested_comments_balance() {
        let nodes =
            parse("{% comment %}x{% comment %}y{% endcomment %}z{% endcomment %}").unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(matches!(nodes[0], Node::Comment { .. }));
    }

    #[test]
    fn unknown_tag_parses_as_simple_tag() {
        let nodes = parse("{% widget foo %}").unwrap();
        let tag = tag(&nodes[0]);
        assert_eq!(tag.name, "widget");
        assert_eq!(tag.bits, vec!["foo"]);
    }

    #[test]
    fn unclosed_output_is_a_parse_error() {
        assert!(matches!(
            parse("{{ unclosed"),
            Err(ParseError::UnterminatedConstruct { .. })
        ));
    }

    #[test]
    fn unclosed_if_names_the_tag() {
        match parse("{% if x %}hello") {
            Err(ParseError::UnclosedTag { tag, expected, .. }) => {
                assert_eq!(tag, "if");
                assert_eq!(expected, "endif");
            }
            other => panic!("expected UnclosedTag, got {other:?}"),
        }
    }

    #[test]
    fn unclosed_comment_is_a_parse_error() {
        assert!(matches!(
            parse("{% comment %}never ends"),
            Err(ParseError::UnclosedTag { .. })
        ));
    }

    #[test]
    fn mismatched_closer_is_a_parse_error() {
        match parse("{% if x %}{% endfor %}") {
            Err(ParseError::MismatchedCloser {
                found,
                open,
                expected,
                ..
            }) => {
                assert_eq!(found, "endfor");
                assert_eq!(open, "if");
                assert_eq!(expected, "endif");
            }
            other => panic!("expected MismatchedCloser, got {other:?}"),
        }
    }

    #[test]
    fn stray_closer_is_a_parse_error() {
        assert!(matches!(
            parse("{% endif %}"),
            Err(ParseError::StrayCloser { .. })
        ));
    }

    #[test]
    fn orphaned_else_is_a_parse_error() {
        assert!(matches!(
            parse("{% else %}"),
            Err(ParseError::OrphanedBranch { .. })
        ));
    }

    #[test]
    fn empty_tag_is_a_parse_error() {
        assert!(matches!(parse("{% %}"), Err(ParseError::EmptyTag { .. })));
    }

    #[test]
    fn empty_output_is_a_parse_error() {
        assert!(matches!(
            parse("{{ }}"),
            Err(ParseError::EmptyExpression { .. })
        ));
    }

    #[test]
    fn parse_is_deterministic() {
        let source = "{% for i in xs %}{{ i | plus: 1 }}{% endfor %}";
        assert_eq!(parse(source).unwrap(), parse(source).unwrap());
    }

    #[test]
    fn deeply_nested_blocks() {
        let mut source = String::new();
        for _ in 0..50 {
            source.push_str("{% if x %}");
        }
        source.push('y');
        for _ in 0..50 {
            source.push_str("{% endif %}");
        }
        let nodes = parse(&source).unwrap();
        assert_eq!(nodes.len(), 1);
    }
}
