// src/config/loader.rs

use std::path::Path;

use serde_yaml::Value;
use tracing::debug;

use crate::config::model::RunConfig;
use crate::errors::Result;
use crate::fs::FileSystem;

/// Load a config file from `path` through the given filesystem.
///
/// This only reads and parses YAML; `meta.*` fields are looked up later by
/// whoever needs them.
pub fn load_from_path(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<RunConfig> {
    let path = path.as_ref();
    let contents = fs.read_to_string(path)?;
    let config = parse_document(path, &contents)?;
    debug!(path = ?path, "loaded config document");
    Ok(config)
}

/// Parse YAML text into a [`RunConfig`] remembering `source` as its origin.
pub fn parse_document(source: impl AsRef<Path>, contents: &str) -> Result<RunConfig> {
    let document: Value = serde_yaml::from_str(contents)?;
    Ok(RunConfig::new(source.as_ref(), document))
}
