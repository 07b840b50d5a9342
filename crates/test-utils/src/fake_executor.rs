use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;
use tisf_run::errors::{Result, RunError};
use tisf_run::exec::ExecutorBackend;
use tisf_run::fs::FileSystem;
use tisf_run::types::{ChildExit, ChildMessage, RunnerEvent, Stage, StageCommand, StageOutput};

enum StageBehaviour {
    Exit { code: i32, stderr: String },
    ToolMissing,
}

/// A fake executor that:
/// - records every command it was asked to run
/// - "checks out" a configurable set of files into the workspace on fetch
/// - lets individual stages fail
/// - plays back scripted entry-script messages followed by a scripted exit.
pub struct FakeExecutor {
    fs: Arc<dyn FileSystem>,
    commands: Arc<Mutex<Vec<StageCommand>>>,
    behaviours: HashMap<Stage, StageBehaviour>,
    checkout: Vec<(String, String)>,
    messages: Vec<Value>,
    exit: ChildExit,
}

impl FakeExecutor {
    /// A fake whose checkout contains an `index.js` and whose child exits 0.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            commands: Arc::new(Mutex::new(Vec::new())),
            behaviours: HashMap::new(),
            checkout: vec![("index.js".to_string(), "process.send('hi')".to_string())],
            messages: Vec::new(),
            exit: ChildExit {
                code: Some(0),
                signal: None,
            },
        }
    }

    /// Shared handle to the recorded commands.
    pub fn commands(&self) -> Arc<Mutex<Vec<StageCommand>>> {
        Arc::clone(&self.commands)
    }

    /// Replace the files the fetch stage writes into the workspace.
    pub fn with_checkout(mut self, files: &[(&str, &str)]) -> Self {
        self.checkout = files
            .iter()
            .map(|(p, c)| (p.to_string(), c.to_string()))
            .collect();
        self
    }

    pub fn fail_stage(mut self, stage: Stage, code: i32, stderr: &str) -> Self {
        self.behaviours.insert(
            stage,
            StageBehaviour::Exit {
                code,
                stderr: stderr.to_string(),
            },
        );
        self
    }

    pub fn tool_missing(mut self, stage: Stage) -> Self {
        self.behaviours.insert(stage, StageBehaviour::ToolMissing);
        self
    }

    pub fn with_message(mut self, message: Value) -> Self {
        self.messages.push(message);
        self
    }

    pub fn child_exit(mut self, code: Option<i32>, signal: Option<i32>) -> Self {
        self.exit = ChildExit { code, signal };
        self
    }

    fn record(&self, command: &StageCommand) {
        let mut guard = self.commands.lock().unwrap();
        guard.push(command.clone());
    }

    fn tool_missing_error(command: &StageCommand) -> RunError {
        RunError::ToolNotFound {
            stage: command.stage,
            program: command.program.clone(),
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn run_stage(
        &mut self,
        command: StageCommand,
    ) -> Pin<Box<dyn Future<Output = Result<StageOutput>> + Send + '_>> {
        self.record(&command);

        Box::pin(async move {
            match self.behaviours.get(&command.stage) {
                Some(StageBehaviour::ToolMissing) => {
                    return Err(Self::tool_missing_error(&command));
                }
                Some(StageBehaviour::Exit { code, stderr }) => {
                    return Ok(StageOutput {
                        code: Some(*code),
                        stdout: String::new(),
                        stderr: stderr.clone(),
                    });
                }
                None => {}
            }

            if command.stage == Stage::Fetch {
                for (rel, contents) in &self.checkout {
                    self.fs
                        .write(&command.cwd.join(rel), contents.as_bytes())
                        .map_err(RunError::from)?;
                }
            }

            Ok(StageOutput {
                code: Some(0),
                ..StageOutput::default()
            })
        })
    }

    fn spawn_entry(
        &mut self,
        command: StageCommand,
        events: mpsc::Sender<RunnerEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.record(&command);
        let messages = self.messages.clone();
        let exit = self.exit;
        let missing = matches!(
            self.behaviours.get(&Stage::Run),
            Some(StageBehaviour::ToolMissing)
        );

        Box::pin(async move {
            if missing {
                return Err(Self::tool_missing_error(&command));
            }

            tokio::spawn(async move {
                for value in messages {
                    let message = ChildMessage {
                        raw: value.to_string(),
                        value,
                    };
                    if events.send(RunnerEvent::Message(message)).await.is_err() {
                        return;
                    }
                }
                let _ = events.send(RunnerEvent::Exited(exit)).await;
            });
            Ok(())
        })
    }
}
