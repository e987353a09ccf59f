use std::fs;
use std::path::Path;

use anyhow::Result;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use toml::Value;

#[derive(Debug, Error)]
pub enum TagSpecError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Failed to extract specs: {0}")]
    Extract(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Parse-time contract of the tag registry: which tags open a block,
/// which keyword closes them, and which intermediate branch keywords
/// they accept. The parser consults this to build the tree; render-time
/// behavior lives with the tag handlers.
#[derive(Clone, Debug, Default)]
pub struct TagSpecs(FxHashMap<String, TagSpec>);

impl TagSpecs {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TagSpec> {
        self.0.get(key)
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: TagSpec) {
        self.0.insert(name.into(), spec);
    }

    /// Is `name` the closing keyword of any registered block tag?
    #[must_use]
    pub fn find_opener_for_closer(&self, closer: &str) -> Option<&str> {
        self.0.iter().find_map(|(tag_name, spec)| {
            spec.end
                .as_ref()
                .filter(|end| end.tag == closer)
                .map(|_| tag_name.as_str())
        })
    }

    /// Is `name` an intermediate branch keyword of any registered block
    /// tag? Returns the owning tag, for diagnostics.
    #[must_use]
    pub fn find_container_for_branch(&self, branch: &str) -> Option<&str> {
        self.0.iter().find_map(|(tag_name, spec)| {
            spec.intermediates
                .as_ref()
                .filter(|branches| branches.iter().any(|b| b == branch))
                .map(|_| tag_name.as_str())
        })
    }

    /// The built-in Liquid tags. User and custom specs are merged on
    /// top of these.
    #[must_use]
    pub fn builtin() -> Self {
        let mut specs = TagSpecs::default();
        specs.insert(
            "if",
            TagSpec::block("endif").with_intermediates(&["elsif", "else"]),
        );
        specs.insert(
            "unless",
            TagSpec::block("endunless").with_intermediates(&["else"]),
        );
        specs.insert(
            "case",
            TagSpec::block("endcase").with_intermediates(&["when", "else"]),
        );
        specs.insert(
            "for",
            TagSpec::block("endfor").with_intermediates(&["else"]),
        );
        specs.insert("capture", TagSpec::block("endcapture"));
        specs.insert("comment", TagSpec::block("endcomment"));
        specs.insert("assign", TagSpec::simple());
        specs
    }

    /// Load specs from a TOML file, looking under the specified table path.
    fn load_from_toml(path: &Path, table_path: &[&str]) -> Result<Self, TagSpecError> {
        let content = fs::read_to_string(path)?;
        let value: Value = toml::from_str(&content)?;

        let start_node = table_path
            .iter()
            .try_fold(&value, |current, &key| current.get(key));

        let mut specs = FxHashMap::default();

        if let Some(Value::Table(table)) = start_node {
            for (name, node) in table {
                let spec = TagSpec::deserialize(node.clone()).map_err(|err| {
                    TagSpecError::Extract(format!("invalid spec for tag '{name}': {err}"))
                })?;
                specs.insert(name.clone(), spec);
            }
        }

        Ok(TagSpecs(specs))
    }

    /// Load specs from a user's project directory.
    ///
    /// `liquid.toml` takes precedence over `.liquid.toml`; only the
    /// first file found is read.
    pub fn load_user_specs(project_root: &Path) -> Result<Self, anyhow::Error> {
        let config_files = ["liquid.toml", ".liquid.toml"];

        for &file in &config_files {
            let path = project_root.join(file);
            if path.exists() {
                return Self::load_from_toml(&path, &["tagspecs"]).map_err(anyhow::Error::from);
            }
        }
        Ok(Self::default())
    }

    /// Merge another `TagSpecs` into this one, with the other taking
    /// precedence.
    pub fn merge(&mut self, other: TagSpecs) -> &mut Self {
        self.0.extend(other.0);
        self
    }

    /// Built-in specs plus user specs from `project_root`, with user
    /// specs taking precedence.
    pub fn load_all(project_root: &Path) -> Result<Self, anyhow::Error> {
        let mut specs = Self::builtin();
        let user_specs = Self::load_user_specs(project_root)?;
        Ok(specs.merge(user_specs).clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagSpec {
    pub end: Option<EndTag>,
    #[serde(default)]
    pub intermediates: Option<Vec<String>>,
}

impl TagSpec {
    /// A tag with no body, like `assign`.
    #[must_use]
    pub fn simple() -> Self {
        Self {
            end: None,
            intermediates: None,
        }
    }

    /// A block tag closed by `closer`.
    #[must_use]
    pub fn block(closer: &str) -> Self {
        Self {
            end: Some(EndTag {
                tag: closer.to_string(),
                optional: false,
            }),
            intermediates: None,
        }
    }

    #[must_use]
    pub fn with_intermediates(mut self, branches: &[&str]) -> Self {
        self.intermediates = Some(branches.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn accepts_branch(&self, name: &str) -> bool {
        self.intermediates
            .as_ref()
            .is_some_and(|branches| branches.iter().any(|b| b == name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndTag {
    pub tag: String,
    #[serde(default)]
    pub optional: bool,
}
