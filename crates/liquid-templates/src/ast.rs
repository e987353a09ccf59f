use serde::Serialize;

use crate::expr::Expression;
use crate::expr::FilterCall;
use crate::spans::Span;

/// A parsed template node.
///
/// The tree is strictly hierarchical: a tag owns its body and branch
/// bodies exclusively, there are no back-references.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Node {
    /// Literal output, emitted verbatim.
    Text { content: String, span: Span },
    /// `{{ expression | filter: args }}`.
    Output {
        expression: Expression,
        filters: Vec<FilterCall>,
        span: Span,
    },
    Tag(TagNode),
    /// `{% comment %} ... {% endcomment %}`; never rendered.
    Comment { span: Span },
}

impl Node {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Node::Text { span, .. } | Node::Output { span, .. } | Node::Comment { span } => *span,
            Node::Tag(tag) => tag.span,
        }
    }
}

/// A simple or block tag.
///
/// Simple tags (`assign`, `include`, unregistered names) have an empty
/// `body` and no `branches`. Block tags carry the body between the
/// opening tag and the first branch (or the closer), and one entry in
/// `branches` per intermediate tag in source order, e.g.
/// `{% if a %}x{% elsif b %}y{% else %}z{% endif %}` has body `[x]` and
/// branches `[elsif b -> [y], else -> [z]]`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TagNode {
    pub name: String,
    /// Whitespace-split arguments of the opening tag, quote-aware.
    pub bits: Vec<String>,
    pub body: Vec<Node>,
    pub branches: Vec<TagBranch>,
    pub span: Span,
}

impl TagNode {
    /// The raw argument text, reassembled for handlers that parse the
    /// whole argument list as one expression (e.g. conditions).
    #[must_use]
    pub fn raw_args(&self) -> String {
        self.bits.join(" ")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TagBranch {
    pub name: String,
    pub bits: Vec<String>,
    pub body: Vec<Node>,
    pub span: Span,
}

impl TagBranch {
    #[must_use]
    pub fn raw_args(&self) -> String {
        self.bits.join(" ")
    }
}
