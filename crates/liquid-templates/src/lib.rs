//! Liquid template lexing and parsing.
//!
//! This crate is the front end of the template engine: it turns raw
//! template text into a tree of typed nodes, without evaluating
//! anything.
//!
//! The pipeline has two stages:
//!
//! 1. **Lexing**: template text is split into literal text spans and
//!    delimiter-bounded output (`{{ ... }}`) and tag (`{% ... %}`)
//!    spans, with whitespace-control markers applied.
//! 2. **Parsing**: spans are parsed into a node tree. Block structure
//!    (which tags open a block, which keyword closes them, which
//!    intermediate branches they accept) is driven by [`TagSpecs`], so
//!    custom block tags participate in parsing exactly like builtins.
//!
//! Expressions and filter pipelines inside output spans are parsed
//! here; they are resolved against a context by the render crate.
//!
//! ```
//! use liquid_templates::{parse, TagSpecs};
//!
//! let specs = TagSpecs::builtin();
//! let nodes = parse("Hello, {{ name | upcase }}!", &specs).unwrap();
//! assert_eq!(nodes.len(), 3);
//! ```

mod ast;
mod error;
mod expr;
mod lexer;
mod parser;
mod quotes;
mod spans;
mod tagspecs;
mod tokens;

pub use ast::Node;
pub use ast::TagBranch;
pub use ast::TagNode;
pub use error::ParseError;
pub use expr::parse_expression;
pub use expr::parse_pipeline;
pub use expr::Expression;
pub use expr::FilterCall;
pub use expr::Literal;
pub use expr::PathSegment;
pub use lexer::Lexer;
pub use parser::Parser;
pub use quotes::split_unquoted;
pub use spans::LineOffsets;
pub use spans::Span;
pub use tagspecs::EndTag;
pub use tagspecs::TagSpec;
pub use tagspecs::TagSpecError;
pub use tagspecs::TagSpecs;
pub use tokens::Token;
pub use tokens::TokenKind;

/// Tokenize and parse `source` in one step.
pub fn parse(source: &str, specs: &TagSpecs) -> Result<Vec<Node>, ParseError> {
    let (tokens, _) = Lexer::new(source).tokenize();
    Parser::new(tokens, specs).parse()
}

/// Tokenize and parse, also returning line offsets for mapping error
/// positions to line/column pairs.
pub fn parse_with_lines(
    source: &str,
    specs: &TagSpecs,
) -> Result<(Vec<Node>, LineOffsets), ParseError> {
    let (tokens, line_offsets) = Lexer::new(source).tokenize();
    let nodes = Parser::new(tokens, specs).parse()?;
    Ok((nodes, line_offsets))
}
