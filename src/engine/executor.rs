//! Script Executor
//!
//! Runs a whole script as one batch invocation of the post-processor and
//! reads back the log it leaves behind. The engine keeps its session state
//! (loaded geometry, active case, display settings) only for the lifetime of
//! one process, so a script is never split across invocations.
//!
//! Each invocation gets its own temporary working directory holding the
//! command listing and the engine log, so concurrent executions never see
//! each other's files.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::script::Script;
use crate::error::ExecutionError;

/// Log the engine writes into its working directory
pub const LOG_FILE_NAME: &str = "META_post.log";
/// Plain-text copy of the script, one command per line
pub const COMMAND_FILE_NAME: &str = "commands.txt";

/// Flags for a headless, session-less batch run
pub const BATCH_FLAGS: [&str; 3] = ["-b", "-noses", "-fastses"];
pub const EXEC_FLAG: &str = "-exec";

/// How the process ended; its streams are kept only for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineExit {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Something that can run a script inside a working directory
#[async_trait]
pub trait BatchEngine: Send + Sync {
    async fn run(&self, script: &Script, workdir: &Path) -> Result<EngineExit, ExecutionError>;
}

/// The META post-processor driven through its batch command line
#[derive(Debug, Clone)]
pub struct MetaBatchEngine {
    binary: PathBuf,
    elevate: bool,
}

impl MetaBatchEngine {
    /// A bare program name is looked up on `PATH`; a relative path such as
    /// `bin/meta_post64.sh` is anchored at the current directory, since the
    /// engine is launched from a scratch directory.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        let binary = binary.into();
        let binary = if binary.is_relative() && binary.components().count() > 1 {
            std::path::absolute(&binary).unwrap_or(binary)
        } else {
            binary
        };
        Self { binary, elevate: true }
    }

    /// Run through `sudo -E` (the default) or directly
    pub fn with_elevation(mut self, elevate: bool) -> Self {
        self.elevate = elevate;
        self
    }

    /// Program and arguments for one invocation
    pub fn argv(&self, script: &Script) -> (String, Vec<String>) {
        let mut args = Vec::new();
        let program = if self.elevate {
            args.push("-E".to_string());
            args.push(self.binary.to_string_lossy().to_string());
            "sudo".to_string()
        } else {
            self.binary.to_string_lossy().to_string()
        };
        args.extend(BATCH_FLAGS.iter().map(|f| f.to_string()));
        args.push(EXEC_FLAG.to_string());
        args.push(script.joined());
        (program, args)
    }
}

#[async_trait]
impl BatchEngine for MetaBatchEngine {
    async fn run(&self, script: &Script, workdir: &Path) -> Result<EngineExit, ExecutionError> {
        let (program, args) = self.argv(script);
        debug!("Launching {} with {} arguments in {}", program, args.len(), workdir.display());

        let output = Command::new(&program)
            .args(&args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ExecutionError::Launch(format!("{}: {}", program, e)))?;

        Ok(EngineExit {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Log text produced by one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLog {
    pub text: String,
    /// Where the log was read from; gone afterwards unless work dirs are kept.
    pub path: PathBuf,
    pub exit: EngineExit,
}

/// Executes frozen scripts, one isolated batch run each
#[derive(Clone)]
pub struct ScriptExecutor {
    engine: Arc<dyn BatchEngine>,
    keep_workdirs: bool,
}

impl ScriptExecutor {
    pub fn new(engine: Arc<dyn BatchEngine>) -> Self {
        Self {
            engine,
            keep_workdirs: false,
        }
    }

    /// Leave each working directory on disk after the run
    pub fn keep_workdirs(mut self, keep: bool) -> Self {
        self.keep_workdirs = keep;
        self
    }

    /// Run `script` once and return the engine log.
    ///
    /// The log is read whatever the exit status; its absence is the failure
    /// signal. Nothing is retried.
    pub async fn execute(&self, script: Script) -> Result<EngineLog, ExecutionError> {
        let workdir = tempfile::Builder::new()
            .prefix("fem-run-")
            .tempdir()
            .map_err(|e| ExecutionError::Workspace(e.to_string()))?;

        let listing = workdir.path().join(COMMAND_FILE_NAME);
        tokio::fs::write(&listing, script.listing())
            .await
            .map_err(|e| ExecutionError::Workspace(format!("{}: {}", listing.display(), e)))?;

        info!("Executing engine script ({} commands) in {}", script.len(), workdir.path().display());
        debug!("Engine script: {}", script.joined());

        let exit = self.engine.run(&script, workdir.path()).await?;
        debug!("Engine exited with {:?}", exit.code);
        if !exit.stderr.trim().is_empty() {
            debug!("Engine stderr: {}", exit.stderr.trim());
        }

        let log_path = workdir.path().join(LOG_FILE_NAME);
        let result = match tokio::fs::read(&log_path).await {
            Ok(bytes) => Ok(EngineLog {
                text: String::from_utf8_lossy(&bytes).to_string(),
                path: log_path,
                exit,
            }),
            Err(_) => {
                warn!("Engine log missing at {}", log_path.display());
                Err(ExecutionError::LogFileNotFound(log_path))
            }
        };

        if self.keep_workdirs {
            let kept = workdir.keep();
            info!("Kept engine working directory {}", kept.display());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::script::CommandScript;
    use tokio::sync::Mutex;

    /// Writes a log echoing each command, like the real engine's session log
    #[derive(Default)]
    struct EchoEngine {
        seen: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl BatchEngine for EchoEngine {
        async fn run(&self, script: &Script, workdir: &Path) -> Result<EngineExit, ExecutionError> {
            self.seen.lock().await.push(workdir.to_path_buf());
            let log: String = script.commands().iter().map(|c| format!("> {}\n", c)).collect();
            std::fs::write(workdir.join(LOG_FILE_NAME), log).unwrap();
            Ok(EngineExit {
                code: Some(1),
                ..Default::default()
            })
        }
    }

    struct SilentEngine;

    #[async_trait]
    impl BatchEngine for SilentEngine {
        async fn run(&self, _script: &Script, _workdir: &Path) -> Result<EngineExit, ExecutionError> {
            Ok(EngineExit::default())
        }
    }

    fn script(commands: &[&str]) -> Script {
        let mut s = CommandScript::new();
        s.extend(commands.iter().copied());
        s.finish()
    }

    #[tokio::test]
    async fn test_log_is_read_even_on_nonzero_exit() {
        let executor = ScriptExecutor::new(Arc::new(EchoEngine::default()));
        let log = executor.execute(script(&["erase all", "erase none"])).await.unwrap();
        assert_eq!(log.text, "> erase all\n> erase none\n");
        assert_eq!(log.exit.code, Some(1));
    }

    #[tokio::test]
    async fn test_missing_log_names_expected_path() {
        let executor = ScriptExecutor::new(Arc::new(SilentEngine));
        let err = executor.execute(script(&["erase all"])).await.unwrap_err();
        match &err {
            ExecutionError::LogFileNotFound(path) => {
                assert!(path.ends_with(LOG_FILE_NAME));
                assert!(err.to_string().contains(&path.display().to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_each_run_gets_its_own_workdir() {
        let engine = Arc::new(EchoEngine::default());
        let executor = ScriptExecutor::new(engine.clone()).keep_workdirs(true);

        let (a, b) = tokio::join!(executor.execute(script(&["a"])), executor.execute(script(&["b"])));
        assert_eq!(a.unwrap().text, "> a\n");
        assert_eq!(b.unwrap().text, "> b\n");

        let seen = engine.seen.lock().await;
        assert_eq!(seen.len(), 2);
        assert_ne!(seen[0], seen[1]);
        for dir in seen.iter() {
            let listing = std::fs::read_to_string(dir.join(COMMAND_FILE_NAME)).unwrap();
            assert_eq!(listing.lines().count(), 1);
            std::fs::remove_dir_all(dir).unwrap();
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_launch_error() {
        let engine = MetaBatchEngine::new("/nonexistent/meta_post64.sh").with_elevation(false);
        let executor = ScriptExecutor::new(Arc::new(engine));
        let err = executor.execute(script(&["erase all"])).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Launch(_)));
    }

    #[test]
    fn test_argv_layout() {
        let s = script(&["read geom AUTO m.odb", "erase all"]);

        let (program, args) = MetaBatchEngine::new("/opt/meta/meta_post64.sh").argv(&s);
        assert_eq!(program, "sudo");
        assert_eq!(
            args,
            vec!["-E", "/opt/meta/meta_post64.sh", "-b", "-noses", "-fastses", "-exec", "read geom AUTO m.odb;erase all"]
        );

        let (program, args) = MetaBatchEngine::new("/opt/meta/meta_post64.sh").with_elevation(false).argv(&s);
        assert_eq!(program, "/opt/meta/meta_post64.sh");
        assert_eq!(args[0], "-b");
    }

    #[test]
    fn test_relative_launcher_is_anchored() {
        let (program, _) = MetaBatchEngine::new("meta_post64.sh").with_elevation(false).argv(&script(&["erase all"]));
        assert_eq!(program, "meta_post64.sh");

        let (program, _) = MetaBatchEngine::new("bin/meta_post64.sh").with_elevation(false).argv(&script(&["erase all"]));
        let expected = std::env::current_dir().unwrap().join("bin/meta_post64.sh");
        assert_eq!(PathBuf::from(program), expected);
    }
}
