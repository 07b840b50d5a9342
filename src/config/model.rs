// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use crate::errors::{Result, RunError};

/// Environment variable carrying the JSON form of the whole document to every
/// process the run spawns.
pub const CONFIG_ENV_VAR: &str = "TISF_CONFIG";

/// A parsed config document.
///
/// Mirrors files like:
///
/// ```yaml
/// meta:
///   repo: some-owner/some-scripts
///   branch: main
/// inputs:
///   threshold: 3
/// ```
///
/// Only `meta.repo` and `meta.branch` are read by tisf-run itself; every
/// other key is handed to the entry script untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    source: PathBuf,
    document: Value,
}

/// The `meta` mapping, read leniently: either field may be absent and any
/// scalar type is accepted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MetaSection {
    #[serde(default)]
    pub repo: Option<Value>,
    #[serde(default)]
    pub branch: Option<Value>,
}

/// Render a `meta` scalar as text: `branch: 2024` reads as `"2024"`.
fn scalar_text(value: Option<Value>, name: &'static str) -> Result<String> {
    match value {
        None | Some(Value::Null) => Err(RunError::MissingField(name)),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(RunError::Config(format!("`{name}` must be a scalar"))),
    }
}

impl RunConfig {
    pub fn new(source: impl Into<PathBuf>, document: Value) -> Self {
        Self {
            source: source.into(),
            document,
        }
    }

    /// Path the document was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// The `meta` section, or an empty one if the document has none.
    pub fn meta(&self) -> Result<MetaSection> {
        match self.document.get("meta") {
            None | Some(Value::Null) => Ok(MetaSection::default()),
            Some(meta) => serde_yaml::from_value(meta.clone())
                .map_err(|e| RunError::Config(format!("invalid `meta` section: {e}"))),
        }
    }

    /// `meta.repo`, in `owner/name` form.
    pub fn repo(&self) -> Result<String> {
        scalar_text(self.meta()?.repo, "meta.repo")
    }

    pub fn branch(&self) -> Result<String> {
        scalar_text(self.meta()?.branch, "meta.branch")
    }

    /// Compact JSON of the full document, as exported through
    /// [`CONFIG_ENV_VAR`].
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.document)?)
    }
}
