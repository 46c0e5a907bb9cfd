//! Help probe execution

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Runs `program <help_arg>` and returns the captured text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HelpRunner: Send + Sync {
    /// Run one help invocation; stdout and stderr are concatenated.
    async fn run(&self, program: &str, help_arg: &str, timeout: Duration) -> Result<String>;
}

/// Runs help probes as child processes.
///
/// The child is killed when the timeout elapses. A non-zero exit status is
/// not an error: many tools print usage and exit 1 or 2 for `-h`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessHelpRunner;

#[async_trait]
impl HelpRunner for ProcessHelpRunner {
    async fn run(&self, program: &str, help_arg: &str, timeout: Duration) -> Result<String> {
        let mut cmd = Command::new(program);
        cmd.arg(help_arg)
            .env("NO_COLOR", "1")
            .env("TERM", "dumb")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| Error::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Timeout(timeout.as_millis() as u64))??;

        debug!(
            program = %program,
            arg = %help_arg,
            status = ?output.status.code(),
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            "Help probe finished"
        );

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_probe_still_returns_stderr() {
        // `sh -c` without a command string exits non-zero with a usage error
        let text = ProcessHelpRunner
            .run("sh", "-c", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(text.contains("-c"), "unexpected output: {text:?}");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let result = ProcessHelpRunner
            .run("/no/such/tabmux-probe", "--help", Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_timeout_kills_probe() {
        let result = ProcessHelpRunner
            .run("sleep", "30", Duration::from_millis(100))
            .await;
        assert!(matches!(result, Err(Error::Timeout(100))));
    }

    #[tokio::test]
    async fn test_echo_output() {
        let text = ProcessHelpRunner
            .run("echo", "--help-text", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(text, "--help-text\n");
    }
}
