use serde::Serialize;
use thiserror::Error;

/// Malformed template syntax.
///
/// Every variant carries the byte position of the offending construct
/// so callers can map it to a line/column with
/// [`LineOffsets`](crate::LineOffsets).
#[derive(Clone, Debug, Error, PartialEq, Serialize)]
pub enum ParseError {
    #[error("unterminated construct at position {position}: '{content}'")]
    UnterminatedConstruct { position: usize, content: String },

    #[error("unclosed '{tag}' tag at position {position}: expected '{{% {expected} %}}' before end of input")]
    UnclosedTag {
        tag: String,
        expected: String,
        position: usize,
    },

    #[error("'{{% {found} %}}' at position {position} does not close '{{% {open} %}}': expected '{{% {expected} %}}'")]
    MismatchedCloser {
        found: String,
        open: String,
        expected: String,
        position: usize,
    },

    #[error("'{{% {found} %}}' at position {position} has no matching opening tag")]
    StrayCloser { found: String, position: usize },

    #[error("'{{% {found} %}}' at position {position} is only valid inside '{{% {container} %}}'")]
    OrphanedBranch {
        found: String,
        container: String,
        position: usize,
    },

    #[error("empty tag at position {position}")]
    EmptyTag { position: usize },

    #[error("empty output expression at position {position}")]
    EmptyExpression { position: usize },

    #[error("malformed expression '{content}': {reason}")]
    MalformedExpression { content: String, reason: String },

    #[error("invalid filter syntax at position {position}: {reason}")]
    InvalidFilterSyntax { position: usize, reason: String },
}
