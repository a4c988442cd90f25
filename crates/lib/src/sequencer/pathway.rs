//! Pathway definitions: what each installation route downloads and asks.

use std::fmt;

use serde::Serialize;

use crate::config::{Schema, Setting, Validator};
use crate::exec::compose::keys as compose_keys;
use crate::exec::preseed::{self, keys as preseed_keys};
use crate::fetch::{ArtifactKind, DigestSource};
use crate::host::DistributionFamily;
use crate::settings::{ArtifactSource, Settings};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pathway {
  Docker,
  Packages,
}

impl Pathway {
  /// Native package installs write to the system package database.
  pub fn requires_elevation(self) -> bool {
    matches!(self, Self::Packages)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Docker => "docker",
      Self::Packages => "packages",
    }
  }
}

impl fmt::Display for Pathway {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Everything a pathway declares up front.
#[derive(Debug, Clone)]
pub struct PathwaySpec {
  pub pathway: Pathway,
  pub artifact_url: String,
  pub digest_source: DigestSource,
  pub artifact_kind: ArtifactKind,
  pub schema: Schema,
}

impl PathwaySpec {
  pub fn new(pathway: Pathway, settings: &Settings, family: DistributionFamily) -> Self {
    match pathway {
      Pathway::Docker => Self {
        pathway,
        artifact_url: settings.compose.url.clone(),
        digest_source: digest_source(&settings.compose),
        artifact_kind: ArtifactKind::ComposeManifest,
        schema: docker_schema(),
      },
      Pathway::Packages => Self {
        pathway,
        artifact_url: settings.script.url.clone(),
        digest_source: digest_source(&settings.script),
        artifact_kind: ArtifactKind::ShellScript,
        schema: packages_schema(family),
      },
    }
  }
}

fn digest_source(source: &ArtifactSource) -> DigestSource {
  match &source.sums_url {
    Some(sums_url) => DigestSource::Published {
      sums_url: sums_url.clone(),
    },
    None => DigestSource::Unpublished,
  }
}

/// Questions for the compose deployment.
pub fn docker_schema() -> Schema {
  Schema::new(
    "docker",
    vec![
      Setting::required(compose_keys::DB_HOST, "Database host", Validator::ServiceHost)
        .with_default("db")
        .with_help("The compose service name of the database, normally 'db'. Not localhost or an IP address."),
      Setting::required(compose_keys::DB_NAME, "Database name", Validator::NonEmpty).with_default("passboltdb"),
      Setting::required(compose_keys::DB_USER, "Database user", Validator::NonEmpty).with_default("passboltadmin"),
      Setting::required(
        compose_keys::DB_PASSWORD,
        "Database password",
        Validator::Password { min: MIN_PASSWORD_LEN },
      )
      .secret(),
      Setting::optional(
        compose_keys::DB_ROOT_PASSWORD,
        "Database root password",
        Validator::Password { min: MIN_PASSWORD_LEN },
      )
      .secret()
      .with_help("Leave blank to let the database image generate one."),
      Setting::required(compose_keys::BASE_URL, "Full Passbolt URL", Validator::BaseUrl)
        .with_help("For example https://passbolt.example.com"),
      Setting::required(compose_keys::EMAIL_FROM, "Sender email", Validator::Email),
      Setting::required(compose_keys::SMTP_HOST, "SMTP host", Validator::Hostname),
      Setting::optional(compose_keys::SMTP_PORT, "SMTP port", Validator::Port).with_help("Defaults to 587."),
      Setting::optional(compose_keys::SMTP_USER, "SMTP user", Validator::NonEmpty)
        .with_help("Leave blank if the server needs no authentication."),
      Setting::optional(compose_keys::SMTP_PASSWORD, "SMTP password", Validator::NonEmpty).secret(),
      Setting::optional(compose_keys::SMTP_TLS, "SMTP TLS (true/false)", Validator::Boolean)
        .with_help("Leave blank for the image default."),
      Setting::required(compose_keys::ADMIN_EMAIL, "Admin email", Validator::Email),
      Setting::required(compose_keys::ADMIN_FIRST_NAME, "Admin first name", Validator::Name),
      Setting::required(compose_keys::ADMIN_LAST_NAME, "Admin last name", Validator::Name),
    ],
  )
}

/// debconf answers for `passbolt-ce-server`.
pub fn debian_schema() -> Schema {
  Schema::new(
    preseed::SCHEMA_NAME,
    vec![
      Setting::required(preseed_keys::MYSQL_ADMIN_USER, "MariaDB admin user", Validator::NonEmpty).with_default("root"),
      Setting::required(
        preseed_keys::MYSQL_ADMIN_PASSWORD,
        "MariaDB admin password",
        Validator::NonEmpty,
      )
      .secret(),
      Setting::required(preseed_keys::DB_USER, "Passbolt database user", Validator::NonEmpty)
        .with_default("passboltadmin"),
      Setting::required(
        preseed_keys::DB_PASSWORD,
        "Passbolt database password",
        Validator::Password { min: MIN_PASSWORD_LEN },
      )
      .secret(),
      Setting::required(preseed_keys::DB_NAME, "Passbolt database name", Validator::NonEmpty)
        .with_default("passboltdb"),
      Setting::required(preseed_keys::DOMAIN, "Domain name for nginx", Validator::Hostname),
    ],
  )
}

/// The package pathway only asks questions on Debian; elsewhere
/// `passbolt-configure` runs its own interactive setup.
pub fn packages_schema(family: DistributionFamily) -> Schema {
  match family {
    DistributionFamily::Debian => debian_schema(),
    DistributionFamily::RhelLike | DistributionFamily::Suse | DistributionFamily::Unknown => {
      Schema::new("packages", Vec::new())
    }
  }
}
