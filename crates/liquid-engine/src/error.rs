use thiserror::Error;

use liquid_templates::ParseError;

/// Failure inside a filter invocation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("unknown filter '{name}'")]
    Unknown { name: String },

    #[error("filter '{filter}': {reason}")]
    InvalidInput { filter: String, reason: String },

    #[error("filter '{filter}': invalid argument: {reason}")]
    InvalidArgument { filter: String, reason: String },
}

impl FilterError {
    pub fn invalid_input(filter: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            filter: filter.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(filter: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            filter: filter.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure inside a tag invocation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TagError {
    #[error("unknown tag '{name}'")]
    Unknown { name: String },

    #[error("tag '{tag}': malformed arguments: {reason}")]
    MalformedArguments { tag: String, reason: String },

    #[error("tag '{tag}': {message}")]
    Failed { tag: String, message: String },
}

impl TagError {
    pub fn malformed(tag: &str, reason: impl Into<String>) -> Self {
        Self::MalformedArguments {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }

    pub fn failed(tag: &str, message: impl Into<String>) -> Self {
        Self::Failed {
            tag: tag.to_string(),
            message: message.into(),
        }
    }
}

/// Failure resolving a variable path under strict resolution.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ContextError {
    #[error("undefined variable '{path}'")]
    Undefined { path: String },
}

/// Any render-time failure. Rendering aborts on the first error; no
/// partial output is returned.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RenderError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Tag(#[from] TagError),

    #[error(transparent)]
    Context(#[from] ContextError),

    /// A syntax error surfaced while a tag handler interpreted its raw
    /// arguments at render time.
    #[error("invalid expression: {0}")]
    Expression(#[from] ParseError),

    #[error("{message}")]
    Other { message: String },
}

impl RenderError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Combined boundary error for parse-and-render operations.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LiquidError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
