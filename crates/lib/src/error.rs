//! Installation error taxonomy.
//!
//! Each module reports its own error type; [`InstallError`] gathers them so
//! the sequencer can report which kind of failure ended a run and the CLI can
//! turn it into a process exit code.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::config::PromptError;
use crate::deps::DependencyError;
use crate::exec::ExecutionError;
use crate::fetch::{ArtifactError, FetchError, IntegrityError};
use crate::host::UnsupportedHostError;
use crate::settings::SettingsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
  UnsupportedHost,
  PrivilegeRequired,
  Fetch,
  Integrity,
  Dependency,
  Execution,
  Unexpected,
}

impl ErrorKind {
  /// Process exit code for a run that ended with this kind of error.
  pub fn exit_code(self) -> u8 {
    match self {
      Self::Unexpected => 1,
      Self::UnsupportedHost => 2,
      Self::Fetch => 3,
      Self::Integrity => 4,
      Self::Dependency => 5,
      Self::Execution => 6,
      Self::PrivilegeRequired => 7,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::UnsupportedHost => "unsupported host",
      Self::PrivilegeRequired => "privilege required",
      Self::Fetch => "fetch",
      Self::Integrity => "integrity",
      Self::Dependency => "dependency",
      Self::Execution => "execution",
      Self::Unexpected => "unexpected",
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error)]
pub enum InstallError {
  #[error(transparent)]
  UnsupportedHost(#[from] UnsupportedHostError),

  #[error("the {pathway} pathway must be run as root")]
  PrivilegeRequired { pathway: &'static str },

  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Integrity(#[from] IntegrityError),

  #[error(transparent)]
  Dependency(DependencyError),

  #[error(transparent)]
  Execution(#[from] ExecutionError),

  #[error(transparent)]
  Prompt(#[from] PromptError),

  #[error(transparent)]
  Settings(#[from] SettingsError),
}

impl InstallError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::UnsupportedHost(_) => ErrorKind::UnsupportedHost,
      Self::PrivilegeRequired { .. } => ErrorKind::PrivilegeRequired,
      Self::Fetch(_) => ErrorKind::Fetch,
      Self::Integrity(_) => ErrorKind::Integrity,
      Self::Dependency(_) => ErrorKind::Dependency,
      Self::Execution(_) => ErrorKind::Execution,
      Self::Prompt(_) | Self::Settings(_) => ErrorKind::Unexpected,
    }
  }

  pub fn exit_code(&self) -> u8 {
    self.kind().exit_code()
  }
}

impl From<ArtifactError> for InstallError {
  fn from(err: ArtifactError) -> Self {
    match err {
      ArtifactError::Fetch(e) => Self::Fetch(e),
      ArtifactError::Integrity(e) => Self::Integrity(e),
    }
  }
}

impl From<DependencyError> for InstallError {
  fn from(err: DependencyError) -> Self {
    match err {
      DependencyError::UnsupportedHost(e) => Self::UnsupportedHost(e),
      other => Self::Dependency(other),
    }
  }
}
