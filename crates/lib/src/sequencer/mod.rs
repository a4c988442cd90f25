//! The installation state machine.
//!
//! ```text
//! Start -> ClassifyHost -> SelectPathway -> DockerPath | PackagePath
//!       -> CollectConfig -> VerifyArtifact -> Execute -> Success
//! ```
//!
//! Any state may end in `Failed`. Prompts may end in `Cancelled`, which hands
//! control back to the menu. Execute is never retried automatically; only
//! downloads are, and only when the operator agrees.

mod execute;
pub mod pathway;
pub mod plan;
pub mod state;


use tracing::{info, warn};

pub use pathway::{Pathway, PathwaySpec};
pub use plan::InstallationPlan;
pub use state::{Completion, Failure, Outcome, RunReport, State};

use crate::config::{self, Collected, Prompter};
use crate::consts::MAX_FETCH_ATTEMPTS;
use crate::deps::{self, DependencyError};
use crate::error::InstallError;
use crate::exec::compose::{self, ComposeTool};
use crate::exec::runner::CommandRunner;
use crate::exec::ExecutionError;
use crate::fetch::{Artifact, ArtifactError, Fetcher, Transport};
use crate::host::{self, HostProfile, UnsupportedHostError};
use crate::settings::Settings;

/// Drives one pathway from host classification to a terminal state.
pub struct Sequencer<T, R, P> {
  settings: Settings,
  transport: T,
  runner: R,
  prompter: P,
  elevated: bool,
}

/// `Ok(None)` is a cancellation.
type Step<T> = Result<Option<T>, InstallError>;

impl<T: Transport, R: CommandRunner, P: Prompter> Sequencer<T, R, P> {
  pub fn new(settings: Settings, transport: T, runner: R, prompter: P) -> Self {
    Self {
      settings,
      transport,
      runner,
      prompter,
      elevated: host::is_elevated(),
    }
  }

  /// Override the detected privilege level.
  pub fn with_elevation(mut self, elevated: bool) -> Self {
    self.elevated = elevated;
    self
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  #[cfg(test)]
  pub(crate) fn transport(&self) -> &T {
    &self.transport
  }

  #[cfg(test)]
  pub(crate) fn runner(&self) -> &R {
    &self.runner
  }

  #[cfg(test)]
  pub(crate) fn prompter(&self) -> &P {
    &self.prompter
  }

  /// Run `pathway` to completion. Never panics on host or network
  /// failures; they end up in the report.
  pub async fn run(&mut self, pathway: Pathway) -> RunReport {
    let mut trail = vec![State::Start];
    info!(pathway = %pathway, "starting installation");

    let outcome = match self.drive(pathway, &mut trail).await {
      Ok(Some(completion)) => {
        trail.push(State::Success);
        info!(pathway = %pathway, "installation complete");
        Outcome::Success(completion)
      }
      Ok(None) => {
        let state = trail.last().copied().unwrap_or(State::Start);
        trail.push(State::Cancelled);
        info!(state = %state, "installation cancelled");
        Outcome::Cancelled { state }
      }
      Err(error) => {
        let state = trail.last().copied().unwrap_or(State::Start);
        trail.push(State::Failed);
        let failure = Failure { state, error };
        warn!(state = %state, kind = %failure.kind(), error = %failure.error, "installation failed");
        Outcome::Failed(failure)
      }
    };

    RunReport { trail, outcome }
  }

  async fn drive(&mut self, pathway: Pathway, trail: &mut Vec<State>) -> Step<Completion> {
    trail.push(State::ClassifyHost);
    let profile = host::classify(&self.settings.os_release_path);
    info!(host = %profile, "host classified");
    if !profile.is_supported() {
      match pathway {
        Pathway::Packages => {
          return Err(UnsupportedHostError::new(&profile, "native packages need a known package manager").into());
        }
        Pathway::Docker => {
          if compose::detect(&self.runner).await.ready().is_none() {
            return Err(
              UnsupportedHostError::new(&profile, "docker is not installed and cannot be installed automatically")
                .into(),
            );
          }
          warn!("unrecognized distribution, continuing with the installed docker");
        }
      }
    }

    trail.push(State::SelectPathway);
    if pathway.requires_elevation() && !self.elevated {
      return Err(InstallError::PrivilegeRequired {
        pathway: pathway.as_str(),
      });
    }
    let spec = PathwaySpec::new(pathway, &self.settings, profile.distribution_family());
    let tool = match pathway {
      Pathway::Docker => {
        trail.push(State::DockerPath);
        let Some(tool) = self.ensure_container_tools(&profile).await? else {
          return Ok(None);
        };
        Some(tool)
      }
      Pathway::Packages => {
        trail.push(State::PackagePath);
        let base = deps::base_packages(profile.distribution_family())?;
        let report = deps::ensure(&base, &profile, &self.runner).await?;
        info!(installed = report.installed.len(), "base packages ready");
        None
      }
    };
    let fetcher = Fetcher::new(&self.transport, self.settings.require_digest)?;
    let artifact = fetch_with_retry(&fetcher, &spec, &mut self.prompter).await?;

    trail.push(State::CollectConfig);
    let record = match config::collect(&spec.schema, &mut self.prompter)? {
      Collected::Record(record) => record,
      Collected::Cancelled { key } => {
        info!(key, "configuration cancelled");
        return Ok(None);
      }
    };
    record
      .check_complete(&spec.schema)
      .map_err(ExecutionError::from)?;

    trail.push(State::VerifyArtifact);
    let plan = InstallationPlan::new(pathway, artifact, record, profile)?;
    plan.artifact().reverify()?;

    trail.push(State::Execute);
    let completion = match tool {
      Some(tool) => execute::docker(&plan, tool, &self.settings, &self.runner).await?,
      None => execute::packages(&plan, &self.runner).await?,
    };
    Ok(Some(completion))
  }

  /// Make sure docker and a compose tool exist, offering to install them.
  async fn ensure_container_tools(&mut self, profile: &HostProfile) -> Step<ComposeTool> {
    if let Some(tool) = compose::detect(&self.runner).await.ready() {
      return Ok(Some(tool));
    }

    if !profile.is_supported() {
      return Err(UnsupportedHostError::new(profile, "cannot install docker on this distribution").into());
    }
    if !self
      .prompter
      .confirm("Docker or Docker Compose is not installed. Install them now?")?
    {
      return Ok(None);
    }

    let report = deps::install_container_runtime(profile, &self.runner).await?;
    info!(installed = report.installed.len(), "container runtime installed");

    match compose::detect(&self.runner).await {
      tools if !tools.docker => Err(InstallError::from(DependencyError::ToolUnavailable { tool: "docker" })),
      tools => tools
        .ready()
        .map(Some)
        .ok_or_else(|| InstallError::from(DependencyError::ToolUnavailable { tool: "docker compose" })),
    }
  }
}

/// Fetch the pathway's artifact, offering a retry after transport failures.
///
/// Integrity failures are never retried.
async fn fetch_with_retry<T: Transport, P: Prompter>(
  fetcher: &Fetcher<T>,
  spec: &PathwaySpec,
  prompter: &mut P,
) -> Result<Artifact, InstallError> {
  let mut attempt = 1;
  loop {
    match fetcher
      .fetch(&spec.artifact_url, &spec.digest_source, spec.artifact_kind)
      .await
    {
      Ok(artifact) => return Ok(artifact),
      Err(ArtifactError::Fetch(error)) if error.is_retryable() && attempt < MAX_FETCH_ATTEMPTS => {
        warn!(attempt, error = %error, "download failed");
        if !prompter.confirm(&format!("Download failed ({error}). Try again?"))? {
          return Err(error.into());
        }
        attempt += 1;
      }
      Err(error) => return Err(error.into()),
    }
  }
}
