//! Liquid template rendering.
//!
//! This crate is the back end of the template engine: it takes the
//! node tree produced by `liquid_templates` and evaluates it against
//! runtime data. It provides the value model, variable scoping, the
//! builtin filter and tag sets, and the [`Engine`] facade that ties
//! parsing and rendering together.
//!
//! ```
//! use liquid_engine::{Engine, Value};
//!
//! let engine = Engine::new();
//! let globals = Value::from(serde_json::json!({ "name": "World" }));
//! let out = engine.render("Hello, {{ name | upcase }}!", &globals).unwrap();
//! assert_eq!(out, "Hello, WORLD!");
//! ```

mod context;
mod engine;
mod error;
mod filters;
mod renderer;
mod tags;
mod value;

pub use context::Scope;
pub use engine::Engine;
pub use engine::EngineOptions;
pub use engine::Template;
pub use error::ContextError;
pub use error::FilterError;
pub use error::LiquidError;
pub use error::RenderError;
pub use error::TagError;
pub use filters::FilterRegistry;
pub use renderer::Renderer;
pub use tags::TagHandler;
pub use tags::TagRegistry;
pub use value::Number;
pub use value::Value;
pub use value::ValueMap;

// The parse-side types flow through the public API, so re-export them.
pub use liquid_templates::Node;
pub use liquid_templates::ParseError;
pub use liquid_templates::TagNode;
pub use liquid_templates::TagSpec;
pub use liquid_templates::TagSpecs;
