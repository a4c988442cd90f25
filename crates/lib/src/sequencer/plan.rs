//! The checked bundle handed to execution.

use crate::config::ConfigurationRecord;
use crate::fetch::{Artifact, IntegrityError};
use crate::host::HostProfile;

use super::pathway::Pathway;

/// A verified artifact plus everything needed to install from it.
///
/// Holding one is the precondition for any privileged step.
#[derive(Debug)]
pub struct InstallationPlan {
  pathway: Pathway,
  artifact: Artifact,
  config: ConfigurationRecord,
  host: HostProfile,
}

impl InstallationPlan {
  pub fn new(
    pathway: Pathway,
    artifact: Artifact,
    config: ConfigurationRecord,
    host: HostProfile,
  ) -> Result<Self, IntegrityError> {
    if !artifact.is_verified() {
      return Err(IntegrityError::NotVerified {
        path: artifact.local_path().to_path_buf(),
      });
    }
    Ok(Self {
      pathway,
      artifact,
      config,
      host,
    })
  }

  pub fn pathway(&self) -> Pathway {
    self.pathway
  }

  pub fn artifact(&self) -> &Artifact {
    &self.artifact
  }

  pub fn config(&self) -> &ConfigurationRecord {
    &self.config
  }

  pub fn host(&self) -> &HostProfile {
    &self.host
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fetch::ArtifactKind;

  #[test]
  fn unverified_artifact_is_refused() {
    let artifact = Artifact::unverified(
      "https://example.com/passbolt-repo-setup.ce.sh",
      "/tmp/cache/passbolt-repo-setup.ce.sh",
      ArtifactKind::ShellScript,
      None,
    );
    let result = InstallationPlan::new(
      Pathway::Packages,
      artifact,
      ConfigurationRecord::default(),
      HostProfile::unknown(),
    );
    assert!(matches!(result, Err(IntegrityError::NotVerified { .. })));
  }
}
