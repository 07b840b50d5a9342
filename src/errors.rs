// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ChildExit, Stage};

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration is missing `{0}`")]
    MissingField(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{stage} stage could not start `{program}`: not found on PATH")]
    ToolNotFound { stage: Stage, program: String },

    #[error("{stage} stage failed ({status}): {stderr}")]
    StageFailed {
        stage: Stage,
        status: String,
        stderr: String,
    },

    #[error("Entry script not found at {0:?}")]
    EntryScriptMissing(PathBuf),

    #[error("Entry script {0}")]
    ChildFailed(ChildExit),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunError {
    /// Process exit code the top-level handler should use for this error.
    ///
    /// A child that exited with its own non-zero code hands that code back;
    /// everything else maps to `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::ChildFailed(ChildExit {
                code: Some(code), ..
            }) if *code != 0 => *code,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, RunError>;
