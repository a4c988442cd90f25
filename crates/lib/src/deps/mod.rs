//! Host package installation.
//!
//! [`ensure`] checks each requested package with the native query tool and
//! installs only what is missing, so running it twice is harmless. Package
//! names are validated up front because they end up in a package manager's
//! argument vector.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::DOCKER_CE_REPO_URL;
use crate::exec::describe_code;
use crate::exec::runner::{CommandRunner, Invocation, RunError};
use crate::host::{DistributionFamily, HostProfile, PackageManager, UnsupportedHostError};

#[derive(Debug, Error)]
pub enum DependencyError {
  #[error(transparent)]
  UnsupportedHost(#[from] UnsupportedHostError),

  #[error("invalid package name '{0}'")]
  InvalidPackageName(String),

  #[error("refreshing package metadata with {manager} failed with {}", describe_code(*code))]
  RefreshFailed { manager: PackageManager, code: Option<i32> },

  #[error("installing '{package}' failed with {}", describe_code(*code))]
  InstallFailed { package: PackageName, code: Option<i32> },

  #[error("adding repository {url} failed with {}", describe_code(*code))]
  RepositoryFailed { url: String, code: Option<i32> },

  #[error("enabling service '{service}' failed with {}", describe_code(*code))]
  ServiceFailed { service: String, code: Option<i32> },

  #[error("{tool} is still unavailable after installation")]
  ToolUnavailable { tool: &'static str },

  #[error(transparent)]
  Run(#[from] RunError),
}

/// A distribution package name.
///
/// Restricted to `[A-Za-z0-9.+_-]` and may not start with `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageName(String);

impl PackageName {
  pub fn new(name: impl Into<String>) -> Result<Self, DependencyError> {
    let name = name.into();
    let valid = !name.is_empty()
      && !name.starts_with('-')
      && name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '_' | '-'));
    if valid {
      Ok(Self(name))
    } else {
      Err(DependencyError::InvalidPackageName(name))
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl FromStr for PackageName {
  type Err = DependencyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::new(s)
  }
}

impl fmt::Display for PackageName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// What [`ensure`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnsureReport {
  pub already_present: Vec<PackageName>,
  pub installed: Vec<PackageName>,
}

impl EnsureReport {
  fn merge(&mut self, other: EnsureReport) {
    self.already_present.extend(other.already_present);
    self.installed.extend(other.installed);
  }
}

fn package_set(names: &[&str]) -> Result<BTreeSet<PackageName>, DependencyError> {
  names.iter().map(|name| PackageName::new(*name)).collect()
}

/// Packages the repository setup script relies on.
pub fn base_packages(family: DistributionFamily) -> Result<BTreeSet<PackageName>, DependencyError> {
  match family {
    DistributionFamily::Debian => package_set(&["curl", "gnupg", "apt-transport-https"]),
    DistributionFamily::RhelLike => package_set(&["epel-release", "curl"]),
    DistributionFamily::Suse => package_set(&["curl"]),
    DistributionFamily::Unknown => Ok(BTreeSet::new()),
  }
}

fn refresh_invocation(manager: PackageManager) -> Option<Invocation> {
  match manager {
    PackageManager::Apt => Some(Invocation::new("apt-get").arg("update")),
    PackageManager::Dnf => Some(Invocation::new("dnf").arg("makecache")),
    PackageManager::Zypper => Some(Invocation::new("zypper").args(["--non-interactive", "refresh"])),
    PackageManager::None => None,
  }
}

/// The native install command for one package.
pub fn install_invocation(manager: PackageManager, package: &str) -> Option<Invocation> {
  let base = match manager {
    PackageManager::Apt => Invocation::new("apt-get")
      .args(["install", "-y"])
      .env("DEBIAN_FRONTEND", "noninteractive"),
    PackageManager::Dnf => Invocation::new("dnf").args(["install", "-y"]),
    PackageManager::Zypper => Invocation::new("zypper").args(["--non-interactive", "install"]),
    PackageManager::None => return None,
  };
  Some(base.arg(package).streamed())
}

async fn is_installed<R: CommandRunner>(
  runner: &R,
  manager: PackageManager,
  package: &PackageName,
) -> Result<bool, DependencyError> {
  let installed = match manager {
    PackageManager::Apt => {
      let probe = Invocation::new("dpkg-query").args(["-W", "-f=${Status}", package.as_str()]);
      let output = runner.run(&probe).await?;
      output.success() && output.stdout.contains("install ok installed")
    }
    PackageManager::Dnf | PackageManager::Zypper => {
      let probe = Invocation::new("rpm").args(["-q", package.as_str()]);
      runner.run(&probe).await?.success()
    }
    PackageManager::None => false,
  };
  debug!(package = %package, installed, "package probe");
  Ok(installed)
}

/// Install whichever of `packages` are missing on the host.
///
/// Metadata is refreshed at most once, and only when something needs
/// installing.
pub async fn ensure<R: CommandRunner>(
  packages: &BTreeSet<PackageName>,
  profile: &HostProfile,
  runner: &R,
) -> Result<EnsureReport, DependencyError> {
  let manager = profile.package_manager();
  let Some(refresh) = refresh_invocation(manager) else {
    return Err(UnsupportedHostError::new(profile, "no supported package manager").into());
  };

  let mut report = EnsureReport::default();
  let mut missing = Vec::new();
  for package in packages {
    if is_installed(runner, manager, package).await? {
      report.already_present.push(package.clone());
    } else {
      missing.push(package.clone());
    }
  }

  if missing.is_empty() {
    debug!(count = report.already_present.len(), "all packages present");
    return Ok(report);
  }

  info!(manager = %manager, "refreshing package metadata");
  let output = runner.run(&refresh.streamed()).await?;
  if !output.success() {
    return Err(DependencyError::RefreshFailed {
      manager,
      code: output.code,
    });
  }

  for package in missing {
    info!(package = %package, "installing package");
    let Some(install) = install_invocation(manager, package.as_str()) else {
      return Err(UnsupportedHostError::new(profile, "no supported package manager").into());
    };
    let output = runner.run(&install).await?;
    if !output.success() {
      return Err(DependencyError::InstallFailed {
        package,
        code: output.code,
      });
    }
    report.installed.push(package);
  }

  Ok(report)
}

/// Install docker and a compose tool, then enable the docker service.
pub async fn install_container_runtime<R: CommandRunner>(
  profile: &HostProfile,
  runner: &R,
) -> Result<EnsureReport, DependencyError> {
  let mut report = EnsureReport::default();
  match profile.distribution_family() {
    DistributionFamily::Debian => {
      report = ensure(&package_set(&["docker.io", "docker-compose"])?, profile, runner).await?;
    }
    DistributionFamily::RhelLike => {
      report.merge(ensure(&package_set(&["dnf-plugins-core"])?, profile, runner).await?);

      let add_repo = Invocation::new("dnf").args(["config-manager", "--add-repo", DOCKER_CE_REPO_URL]);
      info!(url = DOCKER_CE_REPO_URL, "adding docker repository");
      let output = runner.run(&add_repo).await?;
      if !output.success() {
        return Err(DependencyError::RepositoryFailed {
          url: DOCKER_CE_REPO_URL.to_string(),
          code: output.code,
        });
      }

      let engine = package_set(&[
        "docker-ce",
        "docker-ce-cli",
        "containerd.io",
        "docker-buildx-plugin",
        "docker-compose-plugin",
      ])?;
      report.merge(ensure(&engine, profile, runner).await?);
    }
    DistributionFamily::Suse => {
      report = ensure(&package_set(&["docker", "docker-compose"])?, profile, runner).await?;
    }
    DistributionFamily::Unknown => {
      return Err(UnsupportedHostError::new(profile, "cannot install a container runtime automatically").into());
    }
  }

  enable_service(runner, "docker").await?;
  Ok(report)
}

async fn enable_service<R: CommandRunner>(runner: &R, service: &str) -> Result<(), DependencyError> {
  info!(service, "enabling service");
  let output = runner
    .run(&Invocation::new("systemctl").args(["enable", "--now", service]))
    .await?;
  if output.success() {
    Ok(())
  } else {
    Err(DependencyError::ServiceFailed {
      service: service.to_string(),
      code: output.code,
    })
  }
}
