// src/exec/entry.rs

//! Launch the checked-out entry script and report what it does as
//! [`RunnerEvent`]s.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::exec::command::{build_command, spawn_error};
use crate::types::{ChildExit, RunnerEvent, StageCommand};

/// How long the readers may keep draining after the child exited.
///
/// Bounds the wait when a grandchild inherited the channel or stdout and
/// keeps it open.
pub const MESSAGE_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Spawn the entry script described by `stage_cmd`.
///
/// Returns once the process is running. From then on:
/// - every message the child sends is forwarded as `RunnerEvent::Message`,
///   in arrival order;
/// - every stdout line is forwarded as `RunnerEvent::Output`, so the caller
///   can print it around its progress display;
/// - exactly one `RunnerEvent::Exited` follows, after the last of both.
///
/// stderr of the child is inherited.
pub fn spawn_entry(
    stage_cmd: &StageCommand,
    events_tx: mpsc::Sender<RunnerEvent>,
) -> Result<()> {
    info!(
        cmd = %stage_cmd.display_line(),
        cwd = ?stage_cmd.cwd,
        "starting entry script"
    );

    let mut cmd = build_command(stage_cmd);
    cmd.stdout(Stdio::piped());

    #[cfg(unix)]
    {
        use crate::exec::ipc::{MessageChannel, install_child_end};

        let channel = MessageChannel::new()?;
        install_child_end(&mut cmd, &channel.child);

        let mut child = cmd.spawn().map_err(|e| spawn_error(stage_cmd, e))?;
        // Close our copy of the child end so EOF arrives when the child exits.
        drop(channel.child);

        let mut readers = vec![spawn_listener(channel.parent, events_tx.clone())];
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_stdout_relay(stdout, events_tx.clone()));
        }
        spawn_waiter(child, readers, events_tx);
    }

    #[cfg(not(unix))]
    {
        let mut child = cmd.spawn().map_err(|e| spawn_error(stage_cmd, e))?;
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_stdout_relay(stdout, events_tx.clone()));
        }
        spawn_waiter(child, readers, events_tx);
    }

    Ok(())
}

/// Read newline-delimited JSON messages until EOF.
#[cfg(unix)]
fn spawn_listener(
    stream: tokio::net::UnixStream,
    events_tx: mpsc::Sender<RunnerEvent>,
) -> JoinHandle<()> {
    use crate::exec::ipc::parse_line;

    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "reading from entry script channel failed");
                    break;
                }
            };

            match parse_line(&line) {
                Ok(Some(message)) => {
                    debug!(raw = %message.raw, "message from entry script");
                    if events_tx.send(RunnerEvent::Message(message)).await.is_err() {
                        debug!("runner event receiver dropped; stopping listener");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(line = %line, error = %e, "ignoring malformed message from entry script");
                }
            }
        }

        debug!("entry script channel closed");
    })
}

/// Forward the child's stdout line by line until EOF.
fn spawn_stdout_relay(
    stdout: ChildStdout,
    events_tx: mpsc::Sender<RunnerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if events_tx.send(RunnerEvent::Output(line)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "reading entry script stdout failed");
                    break;
                }
            }
        }
    })
}

/// Wait for the child, let the readers finish, then emit `Exited`.
fn spawn_waiter(
    mut child: Child,
    mut readers: Vec<JoinHandle<()>>,
    events_tx: mpsc::Sender<RunnerEvent>,
) {
    tokio::spawn(async move {
        let exit = match child.wait().await {
            Ok(status) => ChildExit::from_status(status),
            Err(e) => {
                error!(error = %e, "waiting for entry script failed");
                ChildExit {
                    code: None,
                    signal: None,
                }
            }
        };

        info!(
            exit_code = ?exit.code,
            signal = ?exit.signal,
            "entry script exited"
        );

        let drained = tokio::time::timeout(MESSAGE_DRAIN_GRACE, async {
            for reader in readers.iter_mut() {
                let _ = reader.await;
            }
        })
        .await;
        if drained.is_err() {
            warn!("entry script output still open after exit; dropping further messages");
            for reader in &readers {
                reader.abort();
            }
        }

        let _ = events_tx.send(RunnerEvent::Exited(exit)).await;
    });
}
