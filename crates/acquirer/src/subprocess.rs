//! Subprocess execution with timeout and truncated-stderr capture.
//!
//! Grounded on `crates/video-extract-core/src/executor.rs`'s
//! `tokio::time::timeout`-wrapped stage execution, applied here to external
//! processes instead of in-process plugin calls, per spec.md §6: "all
//! subprocess failures are captured with exit code and (truncated) stderr."
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

const STDERR_TRUNCATE_LEN: usize = 2000;

#[derive(Debug)]
pub struct SubprocessOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SubprocessError {
    #[error("subprocess timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to spawn subprocess: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Run `program` with `args`, bounded by `timeout_dur`. On Windows hosts,
/// per spec.md §6, stdout/stderr would be forced to UTF-8 with decode
/// errors tolerated and replaced; `String::from_utf8_lossy` gives that
/// behavior uniformly across platforms.
pub async fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout_dur: Duration,
) -> Result<SubprocessOutput, SubprocessError> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.kill_on_drop(true);

    let fut = cmd.output();
    let output = timeout(timeout_dur, fut)
        .await
        .map_err(|_| SubprocessError::Timeout(timeout_dur))??;

    let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if stderr.len() > STDERR_TRUNCATE_LEN {
        stderr.truncate(STDERR_TRUNCATE_LEN);
        stderr.push_str("...[truncated]");
    }

    Ok(SubprocessOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_reports_success() {
        let out = run_with_timeout("true", &[], Duration::from_secs(5)).await.unwrap();
        assert!(out.success);
    }

    #[tokio::test]
    async fn failing_command_captures_exit_code() {
        let out = run_with_timeout("false", &[], Duration::from_secs(5)).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.exit_code, Some(1));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let result = run_with_timeout("sleep", &["5"], Duration::from_millis(50)).await;
        assert!(matches!(result, Err(SubprocessError::Timeout(_))));
    }
}
