use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde_json::Value;

/// The pipeline stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Prepare,
    Fetch,
    Install,
    Run,
    Cleanup,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Prepare => "prepare",
            Stage::Fetch => "fetch",
            Stage::Install => "install",
            Stage::Run => "run",
            Stage::Cleanup => "cleanup",
        }
    }

    /// Spinner text shown while the stage is in progress.
    pub fn progress_message(self) -> &'static str {
        match self {
            Stage::Prepare => "Preparing workspace...",
            Stage::Fetch => "Downloading files...",
            Stage::Install => "Installing dependencies...",
            Stage::Run => "Running scripts...",
            Stage::Cleanup => "Cleaning up...",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An explicit invocation of an external tool: program, arguments, working
/// directory and any extra environment on top of the inherited one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    pub stage: Stage,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
}

impl StageCommand {
    pub fn new(stage: Stage, program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// `program arg1 arg2 ...`, for logs and dry-run output.
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured result of a finished stage command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl StageOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// How the entry script terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ChildExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    #[cfg(unix)]
    pub fn from_status(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }

    #[cfg(not(unix))]
    pub fn from_status(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: None,
        }
    }
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exited with code {code}"),
            (None, Some(signal)) => write!(f, "was terminated by signal {signal}"),
            (None, None) => f.write_str("exited with an unknown status"),
        }
    }
}

/// One message sent by the entry script over its message channel.
///
/// `raw` is the line exactly as received; it is what gets relayed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildMessage {
    pub raw: String,
    pub value: Value,
}

impl ChildMessage {
    /// Text printed for this message: string payloads bare, anything else as
    /// the JSON line.
    pub fn relay_text(&self) -> &str {
        match &self.value {
            Value::String(text) => text,
            _ => &self.raw,
        }
    }
}

/// Events observed while the entry script runs.
///
/// `Exited` is always the last event of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunnerEvent {
    Message(ChildMessage),
    /// A line the entry script wrote to its stdout.
    Output(String),
    Exited(ChildExit),
}
