// src/exec/command.rs

//! Run one external tool to completion and capture what it printed.

use std::io::ErrorKind;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{Result, RunError};
use crate::types::{StageCommand, StageOutput};

/// Build a `tokio::process::Command` from a [`StageCommand`].
///
/// The program is invoked directly, never through a shell.
pub fn build_command(stage_cmd: &StageCommand) -> Command {
    let mut cmd = Command::new(&stage_cmd.program);
    cmd.args(&stage_cmd.args)
        .current_dir(&stage_cmd.cwd)
        .envs(&stage_cmd.env);
    cmd
}

/// Map a spawn error, turning "program not found" into [`RunError::ToolNotFound`].
pub fn spawn_error(stage_cmd: &StageCommand, err: std::io::Error) -> RunError {
    if err.kind() == ErrorKind::NotFound {
        RunError::ToolNotFound {
            stage: stage_cmd.stage,
            program: stage_cmd.program.clone(),
        }
    } else {
        RunError::Io(err)
    }
}

/// Spawn `stage_cmd`, wait for it, and return its exit code and output.
///
/// A non-zero exit is *not* an error here; see [`ensure_success`].
pub async fn run_stage_command(stage_cmd: &StageCommand) -> Result<StageOutput> {
    info!(
        stage = %stage_cmd.stage,
        cmd = %stage_cmd.display_line(),
        cwd = ?stage_cmd.cwd,
        "starting stage process"
    );

    let output = build_command(stage_cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| spawn_error(stage_cmd, e))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    for line in stdout.lines() {
        debug!(stage = %stage_cmd.stage, "stdout: {}", line);
    }
    for line in stderr.lines() {
        debug!(stage = %stage_cmd.stage, "stderr: {}", line);
    }

    let code = output.status.code();
    info!(
        stage = %stage_cmd.stage,
        exit_code = ?code,
        success = output.status.success(),
        "stage process exited"
    );

    Ok(StageOutput {
        code,
        stdout,
        stderr,
    })
}

/// Turn a non-zero stage exit into [`RunError::StageFailed`].
pub fn ensure_success(stage_cmd: &StageCommand, output: StageOutput) -> Result<StageOutput> {
    if output.success() {
        return Ok(output);
    }

    let status = match output.code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    };

    Err(RunError::StageFailed {
        stage: stage_cmd.stage,
        status,
        stderr: output.stderr.trim().to_string(),
    })
}
