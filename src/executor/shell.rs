//! Shell command execution
//!
//! Runs commands through `sh -c`, capturing exit code and both output
//! streams. Unlike a CI step runner, a non-zero exit code is *not* an error
//! here: the build pipeline inspects exit codes itself and decides which
//! failures are fatal (image build, push) and which are best-effort (local
//! image removal).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

/// Result of a command invocation.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Exit code returned by the command (`-1` when terminated by a signal).
    pub exit_code: i32,

    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Duration of execution
    pub duration: Duration,
}

impl RunOutput {
    /// Returns true if the command succeeded (exit code 0)
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns true if the command failed
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.exit_code != 0
    }
}

/// Options for a single command invocation.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Working directory for the command, if any.
    pub cwd: Option<PathBuf>,

    /// Extra environment variables for this invocation only.
    pub env: HashMap<String, String>,
}

impl RunOptions {
    /// Creates empty options (inherit cwd and environment).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the working directory.
    #[must_use]
    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Adds an environment variable for this invocation.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Capability interface for running external commands.
///
/// `run` resolves with the command's exit code and captured output; it only
/// errors when the command could not be spawned at all.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs a command and captures its outcome.
    async fn run(&self, command: &str, options: &RunOptions) -> std::io::Result<RunOutput>;
}

/// Command runner that executes through a local shell.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    /// Shell to use (default: sh)
    shell: String,
}

impl ShellRunner {
    /// Creates a new shell runner using `sh`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    /// Sets the shell executable.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, options: &RunOptions) -> std::io::Result<RunOutput> {
        tracing::trace!(command = %command, "Invoking shell command");

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c");
        cmd.arg(command);
        cmd.envs(&options.env);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }

        let start = Instant::now();
        let output = cmd.output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        tracing::debug!(command = %command, exit_code, "Shell command finished");

        Ok(RunOutput {
            exit_code,
            stdout,
            stderr,
            duration: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let runner = ShellRunner::new();
        let output = runner
            .run("echo hello", &RunOptions::new())
            .await
            .unwrap();

        assert!(output.is_success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_reports_exit_code() {
        let runner = ShellRunner::new();
        let output = runner.run("exit 3", &RunOptions::new()).await.unwrap();

        assert!(output.is_failure());
        assert_eq!(output.exit_code, 3);
    }

    #[tokio::test]
    async fn test_run_captures_stderr() {
        let runner = ShellRunner::new();
        let output = runner
            .run("echo oops 1>&2", &RunOptions::new())
            .await
            .unwrap();

        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_run_honors_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ShellRunner::new();
        let output = runner
            .run("pwd", &RunOptions::new().cwd(dir.path()))
            .await
            .unwrap();

        let reported = std::fs::canonicalize(output.stdout.trim()).unwrap();
        let expected = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(reported, expected);
    }

    #[tokio::test]
    async fn test_run_applies_env_override() {
        let runner = ShellRunner::new();
        let output = runner
            .run(
                "echo $FNFORGE_TEST_VAR",
                &RunOptions::new().env("FNFORGE_TEST_VAR", "42"),
            )
            .await
            .unwrap();

        assert_eq!(output.stdout.trim(), "42");
    }
}
