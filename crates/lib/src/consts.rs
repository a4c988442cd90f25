//! Constants shared across the crate.

use std::time::Duration;

pub const APP_NAME: &str = "passbolt-setup";

/// Prefix for environment variables read by [`crate::settings::Settings`].
pub const ENV_PREFIX: &str = "PASSBOLT_SETUP_";

pub const COMPOSE_URL: &str = "https://download.passbolt.com/ce/docker/docker-compose-ce.yaml";
pub const COMPOSE_SUMS_URL: &str =
  "https://github.com/passbolt/passbolt_docker/releases/latest/download/docker-compose-ce-SHA512SUM.txt";
pub const SCRIPT_URL: &str =
  "https://github.com/passbolt/passbolt-dep-scripts/releases/latest/download/passbolt-repo-setup.ce.sh";
pub const SCRIPT_SUMS_URL: &str =
  "https://github.com/passbolt/passbolt-dep-scripts/releases/latest/download/passbolt-ce-SHA512SUM.txt";

/// File name the rendered compose manifest is written under.
pub const COMPOSE_FILE_NAME: &str = "docker-compose-ce.yaml";

pub const OS_RELEASE_PATH: &str = "/etc/os-release";
pub const LEGACY_SUSE_RELEASE_PATH: &str = "/etc/SuSE-release";

/// Smallest artifact accepted when no digest is published.
pub const MIN_ARTIFACT_BYTES: usize = 1000;

/// Total download attempts for one artifact, including the first.
pub const MAX_FETCH_ATTEMPTS: u32 = 3;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(60);
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Compose service names inside the upstream manifest.
pub const PASSBOLT_SERVICE: &str = "passbolt";
pub const DB_SERVICE: &str = "db";

/// SMTP port used when the operator leaves it blank.
pub const DEFAULT_SMTP_PORT: &str = "587";

pub const SERVER_PACKAGE: &str = "passbolt-ce-server";
pub const PASSBOLT_CONFIGURE: &str = "/usr/local/bin/passbolt-configure";
pub const CAKE_BIN: &str = "/usr/share/php/passbolt/bin/cake";
pub const DOCKER_CE_REPO_URL: &str = "https://download.docker.com/linux/centos/docker-ce.repo";
