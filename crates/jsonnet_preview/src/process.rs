//! Wrapper of [`tokio::process::Command`] running the compiler.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("{0}")]
    Failed(String),
    #[error("`{command}` did not finish within {} seconds", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
}

/// Runs `cmd` and returns its stdout.
///
/// `command` names the invocation in error messages. The child process is
/// killed if it outlives `timeout` or the returned future is dropped. A
/// non-zero exit is reported with the stderr of the process.
pub async fn stdout_of(
    mut cmd: Command,
    command: &str,
    timeout: Option<Duration>,
) -> Result<Vec<u8>, ProcessError> {
    cmd.stdin(Stdio::null()).kill_on_drop(true);

    let output = cmd.output();

    let output = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, output)
            .await
            .map_err(|_| ProcessError::Timeout {
                command: command.to_string(),
                timeout,
            })?,
        None => output.await,
    }
    .map_err(|source| ProcessError::Spawn {
        command: command.to_string(),
        source,
    })?;

    if output.status.success() {
        return Ok(output.stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        Err(ProcessError::Failed(format!(
            "`{command}` exited with {}",
            output.status
        )))
    } else {
        Err(ProcessError::Failed(stderr.to_string()))
    }
}
