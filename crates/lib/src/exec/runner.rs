//! Argument-vector subprocess execution.
//!
//! Commands are always spawned directly with an explicit argv; nothing is
//! passed through a shell, so operator answers can never be reinterpreted as
//! shell syntax. Every run is bounded by a timeout; when it expires the engine
//! stops waiting but leaves the child running. A captured child keeps its
//! pipes: a background task drains them for as long as the runtime lives.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
  /// Collect stdout/stderr; stdin is closed.
  Capture,
  /// Share the operator's terminal so progress is visible and the command
  /// may ask its own questions.
  Inherit,
}

/// A command line and its environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
  program: String,
  args: Vec<String>,
  env: BTreeMap<String, String>,
  output: Output,
}

impl Invocation {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      env: BTreeMap::new(),
      output: Output::Capture,
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  /// Stream output to the terminal instead of capturing it.
  pub fn streamed(mut self) -> Self {
    self.output = Output::Inherit;
    self
  }

  pub fn program(&self) -> &str {
    &self.program
  }

  pub fn get_args(&self) -> &[String] {
    &self.args
  }

  pub fn get_env(&self, key: &str) -> Option<&str> {
    self.env.get(key).map(String::as_str)
  }

  pub fn output(&self) -> Output {
    self.output
  }

  /// `program arg1 arg2 ...`, for messages and logs. Environment values are
  /// left out.
  pub fn command_line(&self) -> String {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl fmt::Debug for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Invocation")
      .field("program", &self.program)
      .field("args", &self.args)
      .field("env", &self.env.keys().collect::<Vec<_>>())
      .field("output", &self.output)
      .finish()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  /// `None` when the process was ended by a signal.
  pub code: Option<i32>,
  /// Empty for [`Output::Inherit`] runs.
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }
}

#[derive(Debug, Error)]
pub enum RunError {
  #[error("failed to start '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("'{command}' did not finish within {}", humantime::format_duration(*timeout))]
  Timeout { command: String, timeout: Duration },

  #[error("failed waiting for '{command}': {source}")]
  Wait {
    command: String,
    #[source]
    source: std::io::Error,
  },
}

/// Runs invocations. Implemented by [`SystemRunner`] and by test doubles.
pub trait CommandRunner {
  fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<CommandOutput, RunError>>;
}

/// Whether `invocation` runs and exits 0. Spawn failures count as "no".
pub async fn succeeds<R: CommandRunner>(runner: &R, invocation: &Invocation) -> bool {
  match runner.run(invocation).await {
    Ok(output) => output.success(),
    Err(e) => {
      debug!(command = %invocation.command_line(), error = %e, "probe failed");
      false
    }
  }
}

/// Spawns real processes with tokio.
#[derive(Debug, Clone)]
pub struct SystemRunner {
  timeout: Duration,
}

impl SystemRunner {
  pub fn new(timeout: Duration) -> Self {
    Self { timeout }
  }
}

impl CommandRunner for SystemRunner {
  async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunError> {
    let command_line = invocation.command_line();
    debug!(command = %command_line, output = ?invocation.output, "spawning process");

    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args).envs(&invocation.env).kill_on_drop(false);

    let spawn_error = |source| RunError::Spawn {
      program: invocation.program.clone(),
      source,
    };
    let timed_out = || RunError::Timeout {
      command: command_line.clone(),
      timeout: self.timeout,
    };

    match invocation.output {
      Output::Capture => {
        command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        let child = command.spawn().map_err(spawn_error)?;
        // Dropping the handle on timeout detaches the task instead of closing the pipes.
        let drain = tokio::spawn(child.wait_with_output());
        let output = tokio::time::timeout(self.timeout, drain)
          .await
          .map_err(|_| timed_out())?
          .map_err(std::io::Error::other)
          .and_then(|waited| waited)
          .map_err(|source| RunError::Wait {
            command: command_line.clone(),
            source,
          })?;

        let result = CommandOutput {
          code: output.status.code(),
          stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
          stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };
        if !result.success() && !result.stderr.is_empty() {
          debug!(command = %command_line, stderr = %result.stderr, "command stderr");
        }
        Ok(result)
      }
      Output::Inherit => {
        command.stdin(Stdio::inherit()).stdout(Stdio::inherit()).stderr(Stdio::inherit());
        let mut child = command.spawn().map_err(spawn_error)?;
        let status = tokio::time::timeout(self.timeout, child.wait())
          .await
          .map_err(|_| timed_out())?
          .map_err(|source| RunError::Wait {
            command: command_line.clone(),
            source,
          })?;
        Ok(CommandOutput {
          code: status.code(),
          ..CommandOutput::default()
        })
      }
    }
  }
}
