//! Runtime settings.
//!
//! Every value has a documented default and can be overridden through a
//! `PASSBOLT_SETUP_*` environment variable. Durations use humantime syntax
//! (`90s`, `5m`, `1h 30m`).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::consts::{
  COMPOSE_SUMS_URL, COMPOSE_URL, DEFAULT_COMMAND_TIMEOUT, DEFAULT_FETCH_TIMEOUT, DEFAULT_READY_TIMEOUT, ENV_PREFIX,
  OS_RELEASE_PATH, SCRIPT_SUMS_URL, SCRIPT_URL,
};

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("invalid duration in {var}: {source}")]
  Duration {
    var: String,
    #[source]
    source: humantime::DurationError,
  },

  #[error("invalid boolean in {var}: '{value}' (expected true/false/1/0)")]
  Boolean { var: String, value: String },

  #[error("failed to determine current directory: {0}")]
  CurrentDir(#[source] std::io::Error),
}

/// Upstream locations for one artifact and its published checksum list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
  pub url: String,
  /// `None` means no digest is published for this artifact.
  pub sums_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
  /// Upper bound for a single HTTP request.
  pub fetch_timeout: Duration,
  /// Upper bound for a single subprocess.
  pub command_timeout: Duration,
  /// How long to wait for compose services to come up.
  pub ready_timeout: Duration,
  pub os_release_path: PathBuf,
  /// Where the rendered compose manifest is written.
  pub install_dir: PathBuf,
  pub compose: ArtifactSource,
  pub script: ArtifactSource,
  /// Refuse artifacts without a published digest instead of falling back to
  /// the length and shape check.
  pub require_digest: bool,
}

impl Settings {
  /// Settings with every default applied, writing into `install_dir`.
  pub fn with_install_dir(install_dir: PathBuf) -> Self {
    Self {
      fetch_timeout: DEFAULT_FETCH_TIMEOUT,
      command_timeout: DEFAULT_COMMAND_TIMEOUT,
      ready_timeout: DEFAULT_READY_TIMEOUT,
      os_release_path: PathBuf::from(OS_RELEASE_PATH),
      install_dir,
      compose: ArtifactSource {
        url: COMPOSE_URL.to_string(),
        sums_url: Some(COMPOSE_SUMS_URL.to_string()),
      },
      script: ArtifactSource {
        url: SCRIPT_URL.to_string(),
        sums_url: Some(SCRIPT_SUMS_URL.to_string()),
      },
      require_digest: false,
    }
  }

  /// Load settings from the process environment.
  pub fn from_env() -> Result<Self, SettingsError> {
    let install_dir = match var("INSTALL_DIR") {
      Some(dir) => PathBuf::from(dir),
      None => std::env::current_dir().map_err(SettingsError::CurrentDir)?,
    };
    let mut settings = Self::with_install_dir(install_dir);

    if let Some(timeout) = duration_var("FETCH_TIMEOUT")? {
      settings.fetch_timeout = timeout;
    }
    if let Some(timeout) = duration_var("COMMAND_TIMEOUT")? {
      settings.command_timeout = timeout;
    }
    if let Some(timeout) = duration_var("READY_TIMEOUT")? {
      settings.ready_timeout = timeout;
    }
    if let Some(path) = var("OS_RELEASE") {
      settings.os_release_path = PathBuf::from(path);
    }
    if let Some(url) = var("COMPOSE_URL") {
      settings.compose.url = url;
    }
    if let Some(url) = var("COMPOSE_SUMS_URL") {
      settings.compose.sums_url = non_empty(url);
    }
    if let Some(url) = var("SCRIPT_URL") {
      settings.script.url = url;
    }
    if let Some(url) = var("SCRIPT_SUMS_URL") {
      settings.script.sums_url = non_empty(url);
    }
    if let Some(flag) = bool_var("REQUIRE_DIGEST")? {
      settings.require_digest = flag;
    }

    Ok(settings)
  }
}

fn var(name: &str) -> Option<String> {
  std::env::var(format!("{ENV_PREFIX}{name}")).ok()
}

/// An empty override disables the published checksum list.
fn non_empty(value: String) -> Option<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

fn duration_var(name: &str) -> Result<Option<Duration>, SettingsError> {
  let Some(value) = var(name) else {
    return Ok(None);
  };
  humantime::parse_duration(value.trim())
    .map(Some)
    .map_err(|source| SettingsError::Duration {
      var: format!("{ENV_PREFIX}{name}"),
      source,
    })
}

fn bool_var(name: &str) -> Result<Option<bool>, SettingsError> {
  let Some(value) = var(name) else {
    return Ok(None);
  };
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" => Ok(Some(true)),
    "0" | "false" | "no" | "" => Ok(Some(false)),
    _ => Err(SettingsError::Boolean {
      var: format!("{ENV_PREFIX}{name}"),
      value,
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn defaults_without_overrides() {
    temp_env::with_vars_unset(
      [
        "PASSBOLT_SETUP_FETCH_TIMEOUT",
        "PASSBOLT_SETUP_INSTALL_DIR",
        "PASSBOLT_SETUP_REQUIRE_DIGEST",
        "PASSBOLT_SETUP_COMPOSE_SUMS_URL",
      ],
      || {
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
        assert_eq!(settings.compose.url, COMPOSE_URL);
        assert_eq!(settings.compose.sums_url.as_deref(), Some(COMPOSE_SUMS_URL));
        assert!(!settings.require_digest);
      },
    );
  }

  #[test]
  #[serial]
  fn overrides_are_applied() {
    temp_env::with_vars(
      [
        ("PASSBOLT_SETUP_FETCH_TIMEOUT", Some("90s")),
        ("PASSBOLT_SETUP_COMMAND_TIMEOUT", Some("1h 30m")),
        ("PASSBOLT_SETUP_INSTALL_DIR", Some("/srv/passbolt")),
        ("PASSBOLT_SETUP_REQUIRE_DIGEST", Some("true")),
        ("PASSBOLT_SETUP_SCRIPT_SUMS_URL", Some("")),
      ],
      || {
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.fetch_timeout, Duration::from_secs(90));
        assert_eq!(settings.command_timeout, Duration::from_secs(90 * 60));
        assert_eq!(settings.install_dir, PathBuf::from("/srv/passbolt"));
        assert!(settings.require_digest);
        assert_eq!(settings.script.sums_url, None);
      },
    );
  }

  #[test]
  #[serial]
  fn invalid_duration_is_rejected() {
    temp_env::with_var("PASSBOLT_SETUP_READY_TIMEOUT", Some("soon"), || {
      let err = Settings::from_env().unwrap_err();
      assert!(matches!(err, SettingsError::Duration { ref var, .. } if var == "PASSBOLT_SETUP_READY_TIMEOUT"));
    });
  }

  #[test]
  #[serial]
  fn invalid_boolean_is_rejected() {
    temp_env::with_var("PASSBOLT_SETUP_REQUIRE_DIGEST", Some("maybe"), || {
      assert!(matches!(Settings::from_env(), Err(SettingsError::Boolean { .. })));
    });
  }
}
