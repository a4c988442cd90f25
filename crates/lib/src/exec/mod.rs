//! Privileged execution helpers.
//!
//! - `runner`: argv-only subprocesses with bounded timeouts
//! - `compose`: compose tool detection and manifest environment injection
//! - `preseed`: debconf answers for the Debian package install

pub mod compose;
pub mod preseed;
pub mod runner;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::info;

pub use runner::{CommandOutput, CommandRunner, Invocation, Output, RunError, SystemRunner, succeeds};

use crate::config::MissingSettingError;

/// The final privileged step did not complete.
#[derive(Debug, Error)]
pub enum ExecutionError {
  #[error("'{command}' exited with {}", describe_code(*code))]
  Failed { command: String, code: Option<i32> },

  #[error(transparent)]
  Run(#[from] RunError),

  #[error("cannot render {what}: {message}")]
  Render { what: &'static str, message: String },

  #[error(
    "refusing to overwrite existing file {}; remove it (and any containers started from it) to install again",
    path.display()
  )]
  TargetExists { path: PathBuf },

  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("services {services:?} were not running within {}", humantime::format_duration(*timeout))]
  NotReady { services: Vec<String>, timeout: Duration },

  #[error(transparent)]
  MissingSetting(#[from] MissingSettingError),
}

pub(crate) fn describe_code(code: Option<i32>) -> String {
  match code {
    Some(code) => format!("exit code {code}"),
    None => "a signal".to_string(),
  }
}

/// Run `invocation` and turn a non-zero exit into [`ExecutionError::Failed`].
pub async fn run_checked<R: CommandRunner>(runner: &R, invocation: &Invocation) -> Result<CommandOutput, ExecutionError> {
  info!(command = %invocation.command_line(), "running");
  let output = runner.run(invocation).await?;
  if output.success() {
    Ok(output)
  } else {
    Err(ExecutionError::Failed {
      command: invocation.command_line(),
      code: output.code,
    })
  }
}

/// Create `path` with owner-only permissions and write `content`.
///
/// Never replaces an existing file.
pub fn write_private(path: &Path, content: &str) -> Result<(), ExecutionError> {
  let mut options = std::fs::OpenOptions::new();
  options.write(true).create_new(true);
  #[cfg(unix)]
  {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(0o600);
  }

  let mut file = options.open(path).map_err(|source| {
    if source.kind() == std::io::ErrorKind::AlreadyExists {
      ExecutionError::TargetExists { path: path.to_path_buf() }
    } else {
      ExecutionError::Write {
        path: path.to_path_buf(),
        source,
      }
    }
  })?;

  file
    .write_all(content.as_bytes())
    .and_then(|()| file.flush())
    .map_err(|source| ExecutionError::Write {
      path: path.to_path_buf(),
      source,
    })
}
