//! Host classification.
//!
//! Maps the distribution named in the OS release descriptor onto a closed set
//! of families, each tied to exactly one package manager. Anything not in the
//! table classifies as [`DistributionFamily::Unknown`]; deciding what to do
//! about that is left to the caller.

pub mod os_release;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::consts::LEGACY_SUSE_RELEASE_PATH;

/// Distribution family variants the installer knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistributionFamily {
  Debian,
  RhelLike,
  Suse,
  Unknown,
}

impl DistributionFamily {
  /// Look up the family for an `ID=` value from os-release.
  pub fn from_id(id: &str) -> Self {
    let id = id.trim().to_ascii_lowercase();
    match id.as_str() {
      "debian" | "ubuntu" => Self::Debian,
      "rocky" | "almalinux" | "rhel" | "centos" | "fedora" => Self::RhelLike,
      "sles" | "sled" => Self::Suse,
      _ if id.starts_with("opensuse") => Self::Suse,
      _ => Self::Unknown,
    }
  }

  /// The package manager used by this family.
  pub fn package_manager(self) -> PackageManager {
    match self {
      Self::Debian => PackageManager::Apt,
      Self::RhelLike => PackageManager::Dnf,
      Self::Suse => PackageManager::Zypper,
      Self::Unknown => PackageManager::None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Debian => "debian",
      Self::RhelLike => "rhel-like",
      Self::Suse => "suse",
      Self::Unknown => "unknown",
    }
  }
}

impl fmt::Display for DistributionFamily {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Package manager flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
  Apt,
  Dnf,
  Zypper,
  None,
}

impl PackageManager {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Apt => "apt",
      Self::Dnf => "dnf",
      Self::Zypper => "zypper",
      Self::None => "none",
    }
  }
}

impl fmt::Display for PackageManager {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// The classified host. Fields are private so the family and package manager
/// can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostProfile {
  distribution_family: DistributionFamily,
  package_manager: PackageManager,
  distribution_id: Option<String>,
}

impl HostProfile {
  pub fn new(distribution_family: DistributionFamily, distribution_id: Option<String>) -> Self {
    Self {
      distribution_family,
      package_manager: distribution_family.package_manager(),
      distribution_id,
    }
  }

  pub fn unknown() -> Self {
    Self::new(DistributionFamily::Unknown, None)
  }

  pub fn distribution_family(&self) -> DistributionFamily {
    self.distribution_family
  }

  pub fn package_manager(&self) -> PackageManager {
    self.package_manager
  }

  /// The raw `ID=` value, when one was found.
  pub fn distribution_id(&self) -> Option<&str> {
    self.distribution_id.as_deref()
  }

  pub fn is_supported(&self) -> bool {
    self.distribution_family != DistributionFamily::Unknown
  }
}

impl fmt::Display for HostProfile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.distribution_id {
      Some(id) => write!(f, "{} ({}, {})", id, self.distribution_family, self.package_manager),
      None => write!(f, "{} ({})", self.distribution_family, self.package_manager),
    }
  }
}

/// Raised by callers that cannot proceed on an unknown host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported host '{}': {reason}", distribution.as_deref().unwrap_or("unidentified"))]
pub struct UnsupportedHostError {
  pub distribution: Option<String>,
  pub reason: String,
}

impl UnsupportedHostError {
  pub fn new(profile: &HostProfile, reason: impl Into<String>) -> Self {
    Self {
      distribution: profile.distribution_id.clone(),
      reason: reason.into(),
    }
  }
}

/// Classify the host from its os-release descriptor, normally `/etc/os-release`.
///
/// Never fails: an unreadable file yields the unknown profile. When the file
/// has no `ID=` line the legacy SuSE marker is consulted.
pub fn classify(path: &Path) -> HostProfile {
  let content = match std::fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) => {
      warn!(path = %path.display(), error = %e, "cannot read os-release");
      String::new()
    }
  };

  let profile = classify_os_release(&content);
  if profile.distribution_id.is_none() && Path::new(LEGACY_SUSE_RELEASE_PATH).exists() {
    debug!("no ID in os-release, found legacy SuSE marker");
    return HostProfile::new(DistributionFamily::Suse, Some("opensuse".to_string()));
  }

  debug!(profile = %profile, "host classified");
  profile
}

/// Classify from os-release content.
pub fn classify_os_release(content: &str) -> HostProfile {
  match os_release::parse(content).id() {
    Some(id) => {
      let id = id.to_ascii_lowercase();
      HostProfile::new(DistributionFamily::from_id(&id), Some(id))
    }
    None => HostProfile::unknown(),
  }
}

/// Whether the process runs with an effective uid of 0.
#[cfg(unix)]
pub fn is_elevated() -> bool {
  rustix::process::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_elevated() -> bool {
  false
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn supported_ids_map_to_their_family() {
    let table = [
      ("debian", DistributionFamily::Debian, PackageManager::Apt),
      ("ubuntu", DistributionFamily::Debian, PackageManager::Apt),
      ("rocky", DistributionFamily::RhelLike, PackageManager::Dnf),
      ("almalinux", DistributionFamily::RhelLike, PackageManager::Dnf),
      ("rhel", DistributionFamily::RhelLike, PackageManager::Dnf),
      ("centos", DistributionFamily::RhelLike, PackageManager::Dnf),
      ("fedora", DistributionFamily::RhelLike, PackageManager::Dnf),
      ("opensuse-leap", DistributionFamily::Suse, PackageManager::Zypper),
      ("opensuse-tumbleweed", DistributionFamily::Suse, PackageManager::Zypper),
      ("sles", DistributionFamily::Suse, PackageManager::Zypper),
    ];

    for (id, family, manager) in table {
      let profile = classify_os_release(&format!("NAME=\"Some Linux\"\nID={id}\n"));
      assert_eq!(profile.distribution_family(), family, "family for {id}");
      assert_eq!(profile.package_manager(), manager, "manager for {id}");
      assert_eq!(profile.distribution_id(), Some(id));
    }
  }

  #[test]
  fn unsupported_ids_are_unknown() {
    for id in ["arch", "alpine", "gentoo", "nixos", "void", ""] {
      let profile = classify_os_release(&format!("ID={id}\n"));
      assert_eq!(profile.distribution_family(), DistributionFamily::Unknown, "{id}");
      assert_eq!(profile.package_manager(), PackageManager::None, "{id}");
    }
  }

  #[test]
  fn quoted_and_uppercase_ids_are_normalised() {
    let profile = classify_os_release("ID=\"Ubuntu\"\nID_LIKE=debian\n");
    assert_eq!(profile.distribution_family(), DistributionFamily::Debian);
    assert_eq!(profile.distribution_id(), Some("ubuntu"));
  }

  #[test]
  fn id_like_does_not_drive_classification() {
    let profile = classify_os_release("ID=linuxmint\nID_LIKE=\"ubuntu debian\"\n");
    assert!(!profile.is_supported());
  }

  #[test]
  fn missing_file_is_unknown() {
    let temp = tempfile::tempdir().unwrap();
    let profile = classify(&temp.path().join("absent"));
    // The legacy SuSE marker only exists on old SuSE hosts.
    if !Path::new(LEGACY_SUSE_RELEASE_PATH).exists() {
      assert_eq!(profile, HostProfile::unknown());
    }
  }

  #[test]
  fn classify_reads_descriptor() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("os-release");
    std::fs::write(&path, "PRETTY_NAME=\"Rocky Linux 9\"\nID=\"rocky\"\nVERSION_ID=\"9.4\"\n").unwrap();

    let profile = classify(&path);
    assert_eq!(profile.distribution_family(), DistributionFamily::RhelLike);
    assert_eq!(profile.package_manager(), PackageManager::Dnf);
  }

  #[test]
  fn unknown_never_has_a_package_manager() {
    let profile = HostProfile::unknown();
    assert_eq!(profile.package_manager(), PackageManager::None);
    assert!(!profile.is_supported());
  }

  #[test]
  fn unsupported_error_names_distribution() {
    let profile = classify_os_release("ID=arch\n");
    let err = UnsupportedHostError::new(&profile, "no package manager mapping");
    assert_eq!(err.to_string(), "unsupported host 'arch': no package manager mapping");
  }
}
