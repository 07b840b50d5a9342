// src/engine/stages.rs

//! Pure builders for the commands each stage runs.
//!
//! Nothing here touches the filesystem or spawns processes, so the same
//! builders serve the real pipeline and `--dry-run`.

use std::path::PathBuf;

use crate::config::{CONFIG_ENV_VAR, RunConfig};
use crate::errors::Result;
use crate::types::{Stage, StageCommand};
use crate::workspace::Workspace;

/// Hosting prefix the configured `owner/name` is appended to.
pub const GITHUB_PREFIX: &str = "https://github.com/";

/// Entry script path, relative to the workspace.
pub const ENTRY_SCRIPT: &str = "index.js";

pub const GIT_PROGRAM: &str = "git";
pub const NPM_PROGRAM: &str = "npm";
pub const NODE_PROGRAM: &str = "node";

pub fn clone_url(repo: &str) -> String {
    format!("{GITHUB_PREFIX}{repo}")
}

/// `git clone -b <branch> <url> . --quiet`, run inside the workspace.
pub fn fetch_command(
    config: &RunConfig,
    workspace: &Workspace,
    config_json: &str,
) -> Result<StageCommand> {
    let repo = config.repo()?;
    let branch = config.branch()?;

    Ok(StageCommand::new(Stage::Fetch, GIT_PROGRAM, workspace.path())
        .arg("clone")
        .arg("-b")
        .arg(branch)
        .arg(clone_url(&repo))
        .arg(".")
        .arg("--quiet")
        .env(CONFIG_ENV_VAR, config_json))
}

/// `npm install`, run inside the workspace.
pub fn install_command(workspace: &Workspace, config_json: &str) -> StageCommand {
    StageCommand::new(Stage::Install, NPM_PROGRAM, workspace.path())
        .arg("install")
        .env(CONFIG_ENV_VAR, config_json)
}

pub fn entry_script_path(workspace: &Workspace) -> PathBuf {
    workspace.join(ENTRY_SCRIPT)
}

/// `node <workspace>/index.js`, run inside the workspace.
pub fn entry_command(workspace: &Workspace, config_json: &str) -> StageCommand {
    StageCommand::new(Stage::Run, NODE_PROGRAM, workspace.path())
        .arg(entry_script_path(workspace).to_string_lossy())
        .env(CONFIG_ENV_VAR, config_json)
}

/// Everything a run would do, resolved up front.
#[derive(Debug, Clone)]
pub struct Plan {
    pub workspace: Workspace,
    pub fetch: StageCommand,
    pub install: StageCommand,
    pub entry: StageCommand,
    pub config_json: String,
}

impl Plan {
    pub fn build(config: &RunConfig, workspace: &Workspace) -> Result<Self> {
        let config_json = config.to_json()?;
        Ok(Self {
            workspace: workspace.clone(),
            fetch: fetch_command(config, workspace, &config_json)?,
            install: install_command(workspace, &config_json),
            entry: entry_command(workspace, &config_json),
            config_json,
        })
    }
}
