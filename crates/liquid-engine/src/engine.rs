//! The engine facade: registries, options and the compile/render
//! entry points.

use std::path::Path;

use liquid_templates::Node;
use liquid_templates::ParseError;
use liquid_templates::TagSpec;
use liquid_templates::TagSpecs;

use crate::context::Scope;
use crate::error::FilterError;
use crate::error::LiquidError;
use crate::filters::FilterRegistry;
use crate::renderer::Renderer;
use crate::tags::TagHandler;
use crate::tags::TagRegistry;
use crate::value::Value;

/// Rendering policy switches. Everything defaults to the forgiving
/// behavior: undefined variables are nil, unknown filters are errors.
#[derive(Clone, Copy, Debug, Default)]
pub struct EngineOptions {
    /// Error on undefined variables instead of treating them as nil.
    pub strict_variables: bool,
    /// Pass values through unknown filters instead of erroring.
    pub lenient_filters: bool,
}

/// A parsed template, reusable across renders and contexts.
#[derive(Clone, Debug)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// Owns the filter and tag registries, the tag specs that drive block
/// parsing, and the rendering options.
pub struct Engine {
    filters: FilterRegistry,
    tags: TagRegistry,
    specs: TagSpecs,
    options: EngineOptions,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    #[must_use]
    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            filters: FilterRegistry::with_builtins(),
            tags: TagRegistry::with_builtins(),
            specs: TagSpecs::builtin(),
            options,
        }
    }

    /// Register a custom filter. Registering under a builtin name
    /// shadows the builtin.
    pub fn register_filter<F>(&mut self, name: &str, filter: F)
    where
        F: Fn(&Value, &[Value]) -> Result<Value, FilterError> + Send + Sync + 'static,
    {
        self.filters.register(name, filter);
    }

    /// Register a custom tag. The spec tells the parser whether the
    /// tag is a lone statement or a block, and which keywords close
    /// and branch it; the handler interprets it at render time.
    pub fn register_tag<H: TagHandler + 'static>(
        &mut self,
        name: &str,
        spec: TagSpec,
        handler: H,
    ) {
        self.specs.insert(name, spec);
        self.tags.register(name, handler);
    }

    /// Merge user tag specs from `liquid.toml` or `.liquid.toml` under
    /// `project_root`, if present.
    pub fn load_tagspecs(&mut self, project_root: &Path) -> Result<(), anyhow::Error> {
        let user = TagSpecs::load_user_specs(project_root)?;
        self.specs.merge(user);
        Ok(())
    }

    pub fn parse(&self, source: &str) -> Result<Vec<Node>, ParseError> {
        liquid_templates::parse(source, &self.specs)
    }

    /// Parse once, render many times.
    pub fn compile(&self, source: &str) -> Result<Template, LiquidError> {
        let nodes = self.parse(source)?;
        tracing::debug!(source_len = source.len(), nodes = nodes.len(), "compiled template");
        Ok(Template { nodes })
    }

    pub fn render(&self, source: &str, globals: &Value) -> Result<String, LiquidError> {
        let template = self.compile(source)?;
        self.render_compiled(&template, globals)
    }

    pub fn render_compiled(
        &self,
        template: &Template,
        globals: &Value,
    ) -> Result<String, LiquidError> {
        let renderer = Renderer::new(&self.filters, &self.tags, &self.options);
        let mut scope = Scope::new(globals);
        let mut out = String::new();
        renderer.render_nodes(template.nodes(), &mut scope, &mut out)?;
        tracing::debug!(output_len = out.len(), "rendered template");
        Ok(out)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
