//! Implementation of the `passbolt-setup info` command.

use anyhow::{Context, Result};
use serde::Serialize;

use passbolt_setup_lib::host::{self, HostProfile};
use passbolt_setup_lib::settings::Settings;

use crate::output::{print_info, print_json, print_stat, print_warning};

#[derive(Serialize)]
struct HostReport<'a> {
  host: &'a HostProfile,
  supported: bool,
  elevated: bool,
}

pub fn cmd_info(json: bool) -> Result<()> {
  let settings = Settings::from_env().context("Invalid settings")?;
  let profile = host::classify(&settings.os_release_path);
  let elevated = host::is_elevated();

  if json {
    return print_json(&HostReport {
      host: &profile,
      supported: profile.is_supported(),
      elevated,
    });
  }

  print_info("Host:");
  print_stat("Distribution", profile.distribution_id().unwrap_or("unknown"));
  print_stat("Family", profile.distribution_family().as_str());
  print_stat("Package manager", profile.package_manager().as_str());
  print_stat("Running as root", if elevated { "yes" } else { "no" });
  if !profile.is_supported() {
    print_warning("Native packages are not available on this host; only the Docker pathway can be used.");
  }
  Ok(())
}
