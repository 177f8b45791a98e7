//! Runs a fetch backend as a child process.

use super::{classify_failure, FetchError, FetchErrorKind};
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of a successful backend run.
pub(super) struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs `program` with `args`, killing it if it outlives `timeout`.
///
/// A non-zero exit status is classified from the combined output.
pub(super) async fn run_tool(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<ToolOutput, FetchError> {
    debug!(program, ?args, "Executing fetch backend");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, &e))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(FetchError::Unknown(format!("{program} failed to run: {e}")));
        }
        Err(_) => {
            warn!(program, timeout_secs = timeout.as_secs(), "Fetch backend timed out");
            return Err(FetchError::NetworkError(format!(
                "{program} timed out after {}s",
                timeout.as_secs()
            )));
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if output.status.success() {
        return Ok(ToolOutput { stdout, stderr });
    }

    let message = if stderr.trim().is_empty() {
        stdout.trim().to_string()
    } else {
        stderr.trim().to_string()
    };
    let kind = classify_failure(&message);
    warn!(program, status = %output.status, %kind, "Fetch backend exited with failure");
    Err(FetchError::new(kind, message))
}

fn spawn_error(program: &str, e: &io::Error) -> FetchError {
    if e.kind() == io::ErrorKind::NotFound {
        FetchError::new(
            FetchErrorKind::Unknown,
            format!("{program} is not installed or not on PATH"),
        )
    } else {
        FetchError::new(FetchErrorKind::Unknown, format!("failed to start {program}: {e}"))
    }
}
