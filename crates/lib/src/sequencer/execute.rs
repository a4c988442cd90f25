//! The privileged final step of each pathway.

use std::path::Path;

use tracing::{info, warn};

use super::plan::InstallationPlan;
use super::state::Completion;
use crate::config::MissingSettingError;
use crate::consts::{COMPOSE_FILE_NAME, DB_SERVICE, PASSBOLT_CONFIGURE, PASSBOLT_SERVICE, SERVER_PACKAGE};
use crate::deps::install_invocation;
use crate::error::InstallError;
use crate::exec::compose::{self, ComposeTool, keys};
use crate::exec::runner::{CommandRunner, Invocation};
use crate::exec::{ExecutionError, preseed, run_checked, write_private};
use crate::host::{DistributionFamily, UnsupportedHostError};
use crate::settings::Settings;

const PRESEED_FILE_NAME: &str = "passbolt-ce-server.preseed";

/// Write the compose file, bring the stack up and register the admin.
pub(super) async fn docker<R: CommandRunner>(
  plan: &InstallationPlan,
  tool: ComposeTool,
  settings: &Settings,
  runner: &R,
) -> Result<Completion, InstallError> {
  let source = plan.artifact().local_path();
  let manifest = std::fs::read_to_string(source).map_err(|source_err| ExecutionError::Read {
    path: source.to_path_buf(),
    source: source_err,
  })?;
  let rendered = compose::render(&manifest, plan.config())?;

  let target = settings.install_dir.join(COMPOSE_FILE_NAME);
  write_private(&target, &rendered)?;
  info!(path = %target.display(), "compose file written");

  run_checked(runner, &tool.up(&target)).await?;
  compose::wait_until_running(
    runner,
    tool,
    &target,
    &[DB_SERVICE, PASSBOLT_SERVICE],
    settings.ready_timeout,
  )
  .await?;

  let setting = |key: &'static str| {
    plan
      .config()
      .value(key)
      .ok_or(MissingSettingError { schema: "docker", key })
      .map_err(ExecutionError::from)
  };
  let register = tool.register_admin(
    &target,
    setting(keys::ADMIN_EMAIL)?,
    setting(keys::ADMIN_FIRST_NAME)?,
    setting(keys::ADMIN_LAST_NAME)?,
  );
  let output = run_checked(runner, &register).await?;

  let registration_link = compose::registration_link(&output.stdout);
  if registration_link.is_none() {
    warn!("no registration link found in the registration output");
  }

  Ok(Completion {
    pathway: plan.pathway(),
    compose_file: Some(target),
    registration_link,
  })
}

/// Run the repository setup script, then install and configure the server
/// package.
pub(super) async fn packages<R: CommandRunner>(
  plan: &InstallationPlan,
  runner: &R,
) -> Result<Completion, InstallError> {
  let script = plan.artifact().local_path();
  let setup = Invocation::new("bash")
    .arg(script.to_string_lossy())
    .arg("--accept-license")
    .streamed();
  run_checked(runner, &setup).await?;

  let host = plan.host();
  let Some(install) = install_invocation(host.package_manager(), SERVER_PACKAGE) else {
    return Err(UnsupportedHostError::new(host, "no supported package manager").into());
  };

  match host.distribution_family() {
    DistributionFamily::Debian => {
      let dir = script.parent().unwrap_or(Path::new("."));
      let preseed_path = dir.join(PRESEED_FILE_NAME);
      write_private(&preseed_path, &preseed::render(plan.config())?)?;
      run_checked(
        runner,
        &Invocation::new("debconf-set-selections").arg(preseed_path.to_string_lossy()),
      )
      .await?;
      run_checked(runner, &install).await?;
    }
    DistributionFamily::RhelLike | DistributionFamily::Suse => {
      run_checked(runner, &install).await?;
      run_checked(runner, &Invocation::new(PASSBOLT_CONFIGURE).streamed()).await?;
    }
    DistributionFamily::Unknown => {
      return Err(UnsupportedHostError::new(host, "no supported package manager").into());
    }
  }

  Ok(Completion {
    pathway: plan.pathway(),
    compose_file: None,
    registration_link: None,
  })
}
