// tests/pipeline_fake_executor.rs

mod common;
use crate::common::builders::RunConfigBuilder;
use crate::common::{init_tracing, with_timeout};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;

use tisf_run::config::CONFIG_ENV_VAR;
use tisf_run::engine::PipelineOptions;
use tisf_run::errors::RunError;
use tisf_run::fs::mock::MockFileSystem;
use tisf_run::fs::FileSystem;
use tisf_run::run_pipeline;
use tisf_run::types::Stage;
use tisf_run::workspace::Workspace;
use tisf_run_test_utils::fake_executor::FakeExecutor;

const BASE: &str = "./base";

fn quiet() -> PipelineOptions {
    PipelineOptions {
        show_progress: false,
    }
}

fn workspace() -> Workspace {
    Workspace::new(BASE)
}

#[tokio::test]
async fn successful_run_removes_workspace_and_relays_messages() {
    init_tracing();

    let fs = MockFileSystem::new();
    let executor = FakeExecutor::new(Arc::new(fs.clone()))
        .with_message(json!({"step": 1}))
        .with_message(json!("halfway"))
        .with_message(json!({"sum": 42}));
    let commands = executor.commands();

    let report = with_timeout(run_pipeline(
        RunConfigBuilder::new("acme/jobs", "main").build(),
        workspace(),
        Arc::new(fs.clone()),
        executor,
        quiet(),
    ))
    .await
    .expect("run succeeds");

    assert!(report.exit.success());
    let raws: Vec<_> = report.messages.iter().map(|m| m.raw.as_str()).collect();
    assert_eq!(raws, vec![r#"{"step":1}"#, r#""halfway""#, r#"{"sum":42}"#]);

    assert!(!fs.exists(workspace().path()));
    assert!(fs.is_dir(Path::new(BASE)));

    let stages: Vec<_> = commands.lock().unwrap().iter().map(|c| c.stage).collect();
    assert_eq!(stages, vec![Stage::Fetch, Stage::Install, Stage::Run]);
}

#[tokio::test]
async fn every_stage_gets_the_config_and_runs_in_the_workspace() {
    init_tracing();

    let fs = MockFileSystem::new();
    let executor = FakeExecutor::new(Arc::new(fs.clone()));
    let commands = executor.commands();
    let config = RunConfigBuilder::new("acme/jobs", "dev")
        .with("threshold", 3)
        .build();
    let expected_json = config.to_json().unwrap();

    with_timeout(run_pipeline(
        config,
        workspace(),
        Arc::new(fs.clone()),
        executor,
        quiet(),
    ))
    .await
    .unwrap();

    let commands = commands.lock().unwrap();
    for cmd in commands.iter() {
        assert_eq!(cmd.cwd, PathBuf::from("./base/temp"), "{}", cmd.stage);
        assert_eq!(cmd.env.get(CONFIG_ENV_VAR), Some(&expected_json), "{}", cmd.stage);
    }
    assert_eq!(
        commands[0].display_line(),
        "git clone -b dev https://github.com/acme/jobs . --quiet"
    );

    // The parent process never exports the config itself.
    assert!(std::env::var_os(CONFIG_ENV_VAR).is_none());
}

#[tokio::test]
async fn failed_checkout_keeps_workspace_and_stops() {
    init_tracing();

    let fs = MockFileSystem::new();
    let executor = FakeExecutor::new(Arc::new(fs.clone())).fail_stage(
        Stage::Fetch,
        128,
        "fatal: Remote branch nope not found in upstream origin\n",
    );
    let commands = executor.commands();

    let err = with_timeout(run_pipeline(
        RunConfigBuilder::new("acme/jobs", "nope").build(),
        workspace(),
        Arc::new(fs.clone()),
        executor,
        quiet(),
    ))
    .await
    .unwrap_err();

    match err {
        RunError::StageFailed { stage, stderr, .. } => {
            assert_eq!(stage, Stage::Fetch);
            assert!(stderr.contains("Remote branch nope"));
        }
        other => panic!("expected StageFailed, got {other:?}"),
    }

    assert!(fs.is_dir(workspace().path()));
    assert_eq!(commands.lock().unwrap().len(), 1, "install must not run");
}

#[tokio::test]
async fn missing_package_manager_is_reported() {
    init_tracing();

    let fs = MockFileSystem::new();
    let executor = FakeExecutor::new(Arc::new(fs.clone())).tool_missing(Stage::Install);

    let err = with_timeout(run_pipeline(
        RunConfigBuilder::new("acme/jobs", "main").build(),
        workspace(),
        Arc::new(fs.clone()),
        executor,
        quiet(),
    ))
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        RunError::ToolNotFound { stage: Stage::Install, ref program } if program == "npm"
    ));
    assert!(fs.is_file(&workspace().join("index.js")));
}

#[tokio::test]
async fn nonzero_child_exit_is_an_error_and_keeps_workspace() {
    init_tracing();

    let fs = MockFileSystem::new();
    let executor = FakeExecutor::new(Arc::new(fs.clone()))
        .with_message(json!({"error": "boom"}))
        .child_exit(Some(2), None);

    let err = with_timeout(run_pipeline(
        RunConfigBuilder::new("acme/jobs", "main").build(),
        workspace(),
        Arc::new(fs.clone()),
        executor,
        quiet(),
    ))
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        RunError::ChildFailed(exit) if exit.code == Some(2)
    ));
    assert_eq!(err.exit_code(), 2);
    assert!(fs.is_dir(workspace().path()));
}

#[tokio::test]
async fn signalled_child_keeps_workspace() {
    init_tracing();

    let fs = MockFileSystem::new();
    let executor = FakeExecutor::new(Arc::new(fs.clone())).child_exit(None, Some(9));

    let err = with_timeout(run_pipeline(
        RunConfigBuilder::new("acme/jobs", "main").build(),
        workspace(),
        Arc::new(fs.clone()),
        executor,
        quiet(),
    ))
    .await
    .unwrap_err();

    assert!(matches!(err, RunError::ChildFailed(exit) if exit.signal == Some(9)));
    assert_eq!(err.exit_code(), 1);
    assert!(fs.is_dir(workspace().path()));
}

#[tokio::test]
async fn checkout_without_entry_script_fails_before_running() {
    init_tracing();

    let fs = MockFileSystem::new();
    let executor = FakeExecutor::new(Arc::new(fs.clone()))
        .with_checkout(&[("package.json", "{}")]);
    let commands = executor.commands();

    let err = with_timeout(run_pipeline(
        RunConfigBuilder::new("acme/jobs", "main").build(),
        workspace(),
        Arc::new(fs.clone()),
        executor,
        quiet(),
    ))
    .await
    .unwrap_err();

    assert!(matches!(err, RunError::EntryScriptMissing(ref p) if p.ends_with("index.js")));
    assert!(
        commands
            .lock()
            .unwrap()
            .iter()
            .all(|c| c.stage != Stage::Run)
    );
}

#[tokio::test]
async fn missing_repo_fails_at_fetch_after_workspace_is_prepared() {
    init_tracing();

    let fs = MockFileSystem::new();
    let executor = FakeExecutor::new(Arc::new(fs.clone()));
    let commands = executor.commands();

    let err = with_timeout(run_pipeline(
        RunConfigBuilder::empty().branch("main").build(),
        workspace(),
        Arc::new(fs.clone()),
        executor,
        quiet(),
    ))
    .await
    .unwrap_err();

    assert!(matches!(err, RunError::MissingField("meta.repo")));
    assert!(fs.is_dir(workspace().path()));
    assert!(commands.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rerun_after_failure_starts_from_clean_workspace() {
    init_tracing();

    let fs = MockFileSystem::new();

    let failing = FakeExecutor::new(Arc::new(fs.clone())).fail_stage(Stage::Install, 1, "ERR!");
    let first = with_timeout(run_pipeline(
        RunConfigBuilder::new("acme/jobs", "main").build(),
        workspace(),
        Arc::new(fs.clone()),
        failing,
        quiet(),
    ))
    .await;
    assert!(first.is_err());
    fs.add_file("./base/temp/node_modules/.partial", "x");

    // The recreated workspace starts empty; nothing from the first run survives.
    let observed = Arc::new(std::sync::Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(Arc::new(fs.clone()));
    let report = with_timeout(run_pipeline(
        RunConfigBuilder::new("acme/jobs", "main").build(),
        workspace(),
        Arc::new(ObservingFs::new(fs.clone(), Arc::clone(&observed))),
        executor,
        quiet(),
    ))
    .await
    .expect("second run succeeds");

    assert!(report.exit.success());
    assert_eq!(*observed.lock().unwrap(), vec![Vec::<PathBuf>::new()]);
    assert!(!fs.exists(workspace().path()));
    assert!(!fs.exists(Path::new("./base/temp/node_modules/.partial")));
}

#[tokio::test]
async fn leftover_file_named_temp_does_not_block_the_run() {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("./base/temp", "stray file");

    let report = with_timeout(run_pipeline(
        RunConfigBuilder::new("acme/jobs", "main").build(),
        workspace(),
        Arc::new(fs.clone()),
        FakeExecutor::new(Arc::new(fs.clone())),
        quiet(),
    ))
    .await
    .expect("run succeeds");

    assert!(report.exit.success());
    assert!(!fs.exists(workspace().path()));
}

#[tokio::test]
async fn numeric_branch_is_passed_to_checkout_as_text() {
    init_tracing();

    let fs = MockFileSystem::new();
    let executor = FakeExecutor::new(Arc::new(fs.clone()));
    let commands = executor.commands();

    with_timeout(run_pipeline(
        RunConfigBuilder::new("acme/jobs", "main")
            .branch(2024)
            .build(),
        workspace(),
        Arc::new(fs.clone()),
        executor,
        quiet(),
    ))
    .await
    .expect("run succeeds");

    let fetch = commands.lock().unwrap()[0].clone();
    assert_eq!(fetch.args[1..3], ["-b", "2024"]);
}

#[tokio::test]
async fn cleanup_runs_exactly_once_on_success() {
    init_tracing();

    let fs = MockFileSystem::new();
    let counting = CountingFs::new(fs.clone());
    let removals = Arc::clone(&counting.removals);

    with_timeout(run_pipeline(
        RunConfigBuilder::new("acme/jobs", "main").build(),
        workspace(),
        Arc::new(counting),
        FakeExecutor::new(Arc::new(fs.clone())),
        quiet(),
    ))
    .await
    .unwrap();

    // Fresh base: prepare had nothing to remove, so the only removal is cleanup.
    assert_eq!(removals.load(Ordering::SeqCst), 1);
}

/// Wraps a `MockFileSystem` and counts `remove_dir_all` calls.
#[derive(Debug)]
struct CountingFs {
    inner: MockFileSystem,
    removals: Arc<AtomicUsize>,
}

impl CountingFs {
    fn new(inner: MockFileSystem) -> Self {
        Self {
            inner,
            removals: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FileSystem for CountingFs {
    fn read_to_string(&self, path: &Path) -> anyhow::Result<String> {
        self.inner.read_to_string(path)
    }
    fn write(&self, path: &Path, contents: &[u8]) -> anyhow::Result<()> {
        self.inner.write(path, contents)
    }
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }
    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }
    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }
    fn create_dir_all(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.create_dir_all(path)
    }
    fn remove_file(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.remove_file(path)
    }
    fn remove_dir_all(&self, path: &Path) -> anyhow::Result<()> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_dir_all(path)
    }
    fn read_dir(&self, path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        self.inner.read_dir(path)
    }
}

/// Records the contents of the workspace right after it is (re)created.
#[derive(Debug)]
struct ObservingFs {
    inner: MockFileSystem,
    after_create: Arc<std::sync::Mutex<Vec<Vec<PathBuf>>>>,
}

impl ObservingFs {
    fn new(
        inner: MockFileSystem,
        after_create: Arc<std::sync::Mutex<Vec<Vec<PathBuf>>>>,
    ) -> Self {
        Self {
            inner,
            after_create,
        }
    }
}

impl FileSystem for ObservingFs {
    fn read_to_string(&self, path: &Path) -> anyhow::Result<String> {
        self.inner.read_to_string(path)
    }
    fn write(&self, path: &Path, contents: &[u8]) -> anyhow::Result<()> {
        self.inner.write(path, contents)
    }
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }
    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }
    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }
    fn create_dir_all(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.create_dir_all(path)?;
        let entries = self.inner.read_dir(path)?;
        self.after_create.lock().unwrap().push(entries);
        Ok(())
    }
    fn remove_file(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.remove_file(path)
    }
    fn remove_dir_all(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.remove_dir_all(path)
    }
    fn read_dir(&self, path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        self.inner.read_dir(path)
    }
}
