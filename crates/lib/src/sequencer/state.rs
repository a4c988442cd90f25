//! Sequencer states and run outcomes.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::pathway::Pathway;
use crate::error::{ErrorKind, InstallError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum State {
  Start,
  ClassifyHost,
  SelectPathway,
  DockerPath,
  PackagePath,
  CollectConfig,
  VerifyArtifact,
  Execute,
  Success,
  Failed,
  Cancelled,
}

impl State {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Start => "start",
      Self::ClassifyHost => "classify-host",
      Self::SelectPathway => "select-pathway",
      Self::DockerPath => "docker-path",
      Self::PackagePath => "package-path",
      Self::CollectConfig => "collect-config",
      Self::VerifyArtifact => "verify-artifact",
      Self::Execute => "execute",
      Self::Success => "success",
      Self::Failed => "failed",
      Self::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for State {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The state a run failed in, and why.
#[derive(Debug)]
pub struct Failure {
  pub state: State,
  pub error: InstallError,
}

impl Failure {
  pub fn kind(&self) -> ErrorKind {
    self.error.kind()
  }
}

impl fmt::Display for Failure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} failed during {}: {}", self.kind(), self.state, self.error)
  }
}

/// What a successful run left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
  pub pathway: Pathway,
  /// The rendered compose file, for the docker pathway.
  pub compose_file: Option<PathBuf>,
  /// Where the first administrator finishes their account setup.
  pub registration_link: Option<String>,
}

#[derive(Debug)]
pub enum Outcome {
  Success(Completion),
  Failed(Failure),
  /// The operator backed out in `state`; control returns to the menu.
  Cancelled { state: State },
}

/// A finished run: the states visited, in order, and how it ended.
#[derive(Debug)]
pub struct RunReport {
  pub trail: Vec<State>,
  pub outcome: Outcome,
}

impl RunReport {
  pub fn exit_code(&self) -> u8 {
    match &self.outcome {
      Outcome::Success(_) | Outcome::Cancelled { .. } => 0,
      Outcome::Failed(failure) => failure.error.exit_code(),
    }
  }

  pub fn visited(&self, state: State) -> bool {
    self.trail.contains(&state)
  }
}
