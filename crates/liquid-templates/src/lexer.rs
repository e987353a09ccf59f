use crate::spans::LineOffsets;
use crate::tokens::Token;
use crate::tokens::TokenKind;

const OUTPUT_START: &str = "{{";
const OUTPUT_END: &str = "}}";
const TAG_START: &str = "{%";
const TAG_END: &str = "%}";

/// Hand-written scanner producing literal text spans and
/// delimiter-bounded output/tag spans.
///
/// Lexing is total: arbitrary input always produces a token stream. The
/// single failure the lexer detects itself is a construct whose closing
/// delimiter never arrives before end of input; that becomes an `Error`
/// token which the parser turns into a `ParseError`.
pub struct Lexer {
    source: String,
    start: usize,
    current: usize,
}

impl Lexer {
    #[must_use]
    pub fn new(source: &str) -> Self {
        Lexer {
            source: String::from(source),
            start: 0,
            current: 0,
        }
    }

    pub fn tokenize(&mut self) -> (Vec<Token>, LineOffsets) {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            self.start = self.current;

            let token = match (self.peek(), self.peek_next()) {
                ('{', '{') => self.lex_construct(OUTPUT_END, TokenKind::Output),
                ('{', '%') => self.lex_construct(TAG_END, TokenKind::Tag),
                _ => self.lex_text(),
            };

            tokens.push(token);
        }

        tokens.push(Token::new(TokenKind::Eof, self.offset_u32(self.current)));

        apply_whitespace_control(&mut tokens);

        (tokens, self.line_offsets())
    }

    fn lex_construct(&mut self, end: &str, kind: impl FnOnce(String) -> TokenKind) -> Token {
        let offset = self.offset_u32(self.start);

        self.consume_n(2);

        match self.consume_until(end) {
            Ok(text) => {
                self.consume_n(2);
                let (text, trim_before, trim_after) = strip_trim_markers(&text);
                Token::with_trim(kind(text), offset, trim_before, trim_after)
            }
            Err(err_text) => Token::new(TokenKind::Error(err_text), offset),
        }
    }

    fn lex_text(&mut self) -> Token {
        while !self.is_at_end() {
            if self.source[self.current..].starts_with(OUTPUT_START)
                || self.source[self.current..].starts_with(TAG_START)
            {
                break;
            }
            self.consume();
        }

        let text = self.source[self.start..self.current].to_string();
        Token::new(TokenKind::Text(text), self.offset_u32(self.start))
    }

    fn line_offsets(&self) -> LineOffsets {
        let mut offsets = LineOffsets::default();
        for (idx, byte) in self.source.bytes().enumerate() {
            if byte == b'\n' {
                offsets.add_line(self.offset_u32(idx + 1));
            }
        }
        offsets
    }

    #[inline]
    fn peek(&self) -> char {
        self.source[self.current..].chars().next().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next().unwrap_or('\0')
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    #[inline]
    fn consume(&mut self) {
        if let Some(ch) = self.source[self.current..].chars().next() {
            self.current += ch.len_utf8();
        }
    }

    fn consume_n(&mut self, count: usize) {
        for _ in 0..count {
            self.consume();
        }
    }

    fn consume_until(&mut self, delimiter: &str) -> Result<String, String> {
        let offset = self.current;

        while self.current < self.source.len() {
            if self.source[self.current..].starts_with(delimiter) {
                return Ok(self.source[offset..self.current].trim().to_string());
            }
            self.consume();
        }

        Err(self.source[offset..self.current].trim().to_string())
    }

    #[allow(clippy::unused_self)]
    fn offset_u32(&self, value: usize) -> u32 {
        u32::try_from(value).unwrap_or(u32::MAX)
    }
}

/// Strip `-` trim markers adjacent to the delimiters and report which
/// sides requested trimming. The content has already been trimmed of
/// surrounding whitespace, so a marker is simply a leading or trailing
/// `-` that is not part of the expression itself.
fn strip_trim_markers(content: &str) -> (String, bool, bool) {
    let mut text = content;
    let mut trim_before = false;
    let mut trim_after = false;

    if let Some(rest) = text.strip_prefix('-') {
        // `{{-3}}` must stay a negative number literal
        if rest.is_empty() || !rest.starts_with(|c: char| c.is_ascii_digit()) {
            text = rest;
            trim_before = true;
        }
    }
    if let Some(rest) = text.strip_suffix('-') {
        text = rest;
        trim_after = true;
    }

    (text.trim().to_string(), trim_before, trim_after)
}

/// Post-pass for `{{- -}}` / `{%- -%}`: trim whitespace off the text
/// tokens adjacent to a construct that carries trim markers.
fn apply_whitespace_control(tokens: &mut [Token]) {
    for idx in 0..tokens.len() {
        let (trim_before, trim_after) = (tokens[idx].trim_before(), tokens[idx].trim_after());

        if trim_before && idx > 0 && tokens[idx - 1].is_text() {
            if let Some(text) = tokens[idx - 1].content_mut() {
                let trimmed = text.trim_end().len();
                text.truncate(trimmed);
            }
        }
        if trim_after && idx + 1 < tokens.len() && tokens[idx + 1].is_text() {
            if let Some(text) = tokens[idx + 1].content_mut() {
                *text = text.trim_start().to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, _) = Lexer::new(source).tokenize();
        tokens.into_iter().map(|t| t.kind().clone()).collect()
    }

    #[test]
    fn empty_input_yields_only_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn plain_text() {
        assert_eq!(
            kinds("hello world"),
            vec![TokenKind::Text("hello world".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn output_construct() {
        assert_eq!(
            kinds("{{ user.name }}"),
            vec![TokenKind::Output("user.name".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn tag_construct() {
        assert_eq!(
            kinds("{% if logged_in %}yes{% endif %}"),
            vec![
                TokenKind::Tag("if logged_in".to_string()),
                TokenKind::Text("yes".to_string()),
                TokenKind::Tag("endif".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn mixed_text_and_constructs() {
        assert_eq!(
            kinds("Hello, {{ name }}!"),
            vec![
                TokenKind::Text("Hello, ".to_string()),
                TokenKind::Output("name".to_string()),
                TokenKind::Text("!".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_output_becomes_error_token() {
        assert_eq!(
            kinds("{{ unclosed"),
            vec![TokenKind::Error("unclosed".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_tag_becomes_error_token() {
        assert_eq!(
            kinds("{% if x"),
            vec![TokenKind::Error("if x".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn lone_brace_is_text() {
        assert_eq!(
            kinds("a { b } c"),
            vec![TokenKind::Text("a { b } c".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn unicode_text_survives() {
        assert_eq!(
            kinds("こんにちは {{ 名前 }} 🎉"),
            vec![
                TokenKind::Text("こんにちは ".to_string()),
                TokenKind::Output("名前".to_string()),
                TokenKind::Text(" 🎉".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn long_variable_name() {
        let name = "x".repeat(1200);
        let source = format!("{{{{ {name} }}}}");
        assert_eq!(kinds(&source), vec![TokenKind::Output(name), TokenKind::Eof]);
    }

    #[test]
    fn trim_markers_strip_adjacent_whitespace() {
        assert_eq!(
            kinds("a  {{- x -}}  b"),
            vec![
                TokenKind::Text("a".to_string()),
                TokenKind::Output("x".to_string()),
                TokenKind::Text("b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn trim_markers_on_tags() {
        assert_eq!(
            kinds("x\n  {%- if a -%}\n  y"),
            vec![
                TokenKind::Text("x".to_string()),
                TokenKind::Tag("if a".to_string()),
                TokenKind::Text("y".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn leading_minus_on_number_is_not_a_trim_marker() {
        assert_eq!(
            kinds("{{ -3 }}"),
            vec![TokenKind::Output("-3".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn line_offsets_track_newlines() {
        let (_, offsets) = Lexer::new("ab\ncd\nef").tokenize();
        assert_eq!(offsets.position_to_line_col(4), (2, 1));
        assert_eq!(offsets.position_to_line_col(6), (3, 0));
    }
}
