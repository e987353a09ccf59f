use serde::Serialize;

use crate::spans::Span;

/// A classified substring of the template source.
///
/// `Output` and `Tag` carry the content between their delimiters with
/// surrounding whitespace (and trim markers) already stripped. `Error`
/// is produced for a construct whose closing delimiter never appears
/// before end of input.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub enum TokenKind {
    Text(String),
    Output(String),
    Tag(String),
    Error(String),
    Eof,
}

impl TokenKind {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            TokenKind::Text(s)
            | TokenKind::Output(s)
            | TokenKind::Tag(s)
            | TokenKind::Error(s) => s.len(),
            TokenKind::Eof => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    offset: u32,
    /// `{{-` / `{%-`: eat whitespace at the end of the preceding text.
    trim_before: bool,
    /// `-}}` / `-%}`: eat whitespace at the start of the following text.
    trim_after: bool,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, offset: u32) -> Self {
        Self {
            kind,
            offset,
            trim_before: false,
            trim_after: false,
        }
    }

    #[must_use]
    pub fn with_trim(kind: TokenKind, offset: u32, trim_before: bool, trim_after: bool) -> Self {
        Self {
            kind,
            offset,
            trim_before,
            trim_after,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &TokenKind {
        &self.kind
    }

    #[must_use]
    pub fn content(&self) -> &str {
        match &self.kind {
            TokenKind::Text(s)
            | TokenKind::Output(s)
            | TokenKind::Tag(s)
            | TokenKind::Error(s) => s,
            TokenKind::Eof => "",
        }
    }

    pub(crate) fn content_mut(&mut self) -> Option<&mut String> {
        match &mut self.kind {
            TokenKind::Text(s)
            | TokenKind::Output(s)
            | TokenKind::Tag(s)
            | TokenKind::Error(s) => Some(s),
            TokenKind::Eof => None,
        }
    }

    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[must_use]
    pub fn trim_before(&self) -> bool {
        self.trim_before
    }

    #[must_use]
    pub fn trim_after(&self) -> bool {
        self.trim_after
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, TokenKind::Text(_))
    }

    /// Span of the token content (not including delimiters).
    #[must_use]
    pub fn span(&self) -> Span {
        Span::new(self.offset, u32::try_from(self.kind.len()).unwrap_or(u32::MAX))
    }
}
