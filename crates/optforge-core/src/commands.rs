//! Blocking, timeout-bounded execution of external tools (compiler front
//! ends, linkers, benchmark binaries). A failure here fails the single
//! session operation that issued the command, never the session itself.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Applied when a benchmark command declares no timeout of its own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("`{command}` did not produce expected output file {path}")]
    MissingOutput { command: String, path: String },
}

/// Captured output of a successfully completed command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `arguments` to completion in `cwd`, capturing output. The child is
/// killed if the timeout elapses or the future is dropped.
pub async fn run_command(
    arguments: &[String],
    timeout: Duration,
    cwd: &Path,
) -> Result<CommandOutput, CommandError> {
    let command = arguments.join(" ");
    let Some((program, args)) = arguments.split_first() else {
        return Err(CommandError::Spawn {
            command,
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argument list"),
        });
    };

    debug!(%command, cwd = %cwd.display(), "running external tool");

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CommandError::Spawn {
            command: command.clone(),
            source,
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| CommandError::Spawn {
            command: command.clone(),
            source,
        })?,
        Err(_) => return Err(CommandError::Timeout { command, timeout }),
    };

    if !output.status.success() {
        return Err(CommandError::NonZeroExit {
            command,
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
