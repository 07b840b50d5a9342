#![allow(dead_code)]

use serde_yaml::{Mapping, Value};
use tisf_run::config::RunConfig;

/// Builder for `RunConfig` to simplify test setup.
pub struct RunConfigBuilder {
    meta: Mapping,
    extra: Mapping,
}

impl RunConfigBuilder {
    /// A config with `meta.repo` and `meta.branch` set.
    pub fn new(repo: &str, branch: &str) -> Self {
        Self::empty().repo(repo).branch(branch)
    }

    /// A config with no `meta` fields at all.
    pub fn empty() -> Self {
        Self {
            meta: Mapping::new(),
            extra: Mapping::new(),
        }
    }

    pub fn repo(mut self, repo: &str) -> Self {
        self.meta.insert("repo".into(), repo.into());
        self
    }

    /// Any scalar works here; `branch(2024)` writes a YAML integer.
    pub fn branch(mut self, branch: impl Into<Value>) -> Self {
        self.meta.insert("branch".into(), branch.into());
        self
    }

    /// Add a top-level key that tisf-run passes through untouched.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> RunConfig {
        let mut doc = Mapping::new();
        if !self.meta.is_empty() {
            doc.insert("meta".into(), Value::Mapping(self.meta));
        }
        for (k, v) in self.extra {
            doc.insert(k, v);
        }
        RunConfig::new("config.yml", Value::Mapping(doc))
    }

    /// The same document rendered as YAML text, for tests that go through a
    /// real file.
    pub fn to_yaml(self) -> String {
        let cfg = self.build();
        serde_yaml::to_string(cfg.document()).expect("test config serializes")
    }
}
