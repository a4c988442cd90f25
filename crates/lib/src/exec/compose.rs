//! Compose tooling.
//!
//! Detects which compose front-end is installed and injects the collected
//! configuration into the upstream manifest's service environments. Both
//! `environment:` forms are handled: a mapping (`KEY: value`) and a list of
//! `KEY=value` strings.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use serde_yaml::{Mapping, Value as Yaml};
use tokio::time::Instant;
use tracing::{debug, info};

use super::ExecutionError;
use super::runner::{CommandRunner, Invocation, succeeds};
use crate::config::ConfigurationRecord;
use crate::consts::{CAKE_BIN, DB_SERVICE, DEFAULT_SMTP_PORT, PASSBOLT_SERVICE, READY_POLL_INTERVAL};

/// Configuration keys, named after the variables they become.
pub mod keys {
  pub const DB_HOST: &str = "DATASOURCES_DEFAULT_HOST";
  pub const DB_NAME: &str = "DATASOURCES_DEFAULT_DATABASE";
  pub const DB_USER: &str = "DATASOURCES_DEFAULT_USERNAME";
  pub const DB_PASSWORD: &str = "DATASOURCES_DEFAULT_PASSWORD";
  pub const BASE_URL: &str = "APP_FULL_BASE_URL";
  pub const EMAIL_FROM: &str = "EMAIL_DEFAULT_FROM";
  pub const SMTP_HOST: &str = "EMAIL_TRANSPORT_DEFAULT_HOST";
  pub const SMTP_PORT: &str = "EMAIL_TRANSPORT_DEFAULT_PORT";
  pub const SMTP_USER: &str = "EMAIL_TRANSPORT_DEFAULT_USERNAME";
  pub const SMTP_PASSWORD: &str = "EMAIL_TRANSPORT_DEFAULT_PASSWORD";
  pub const SMTP_TLS: &str = "EMAIL_TRANSPORT_DEFAULT_TLS";
  pub const DB_ROOT_PASSWORD: &str = "MYSQL_ROOT_PASSWORD";
  pub const ADMIN_EMAIL: &str = "ADMIN_EMAIL";
  pub const ADMIN_FIRST_NAME: &str = "ADMIN_FIRST_NAME";
  pub const ADMIN_LAST_NAME: &str = "ADMIN_LAST_NAME";
}

/// Settings copied verbatim into the passbolt service.
const PASSBOLT_ENV: &[&str] = &[
  keys::DB_HOST,
  keys::DB_NAME,
  keys::DB_USER,
  keys::DB_PASSWORD,
  keys::BASE_URL,
  keys::EMAIL_FROM,
  keys::SMTP_HOST,
  keys::SMTP_USER,
  keys::SMTP_PASSWORD,
  keys::SMTP_TLS,
];

/// Database service variables and the settings that feed them.
const DB_ENV: &[(&str, &str)] = &[
  ("MYSQL_DATABASE", keys::DB_NAME),
  ("MYSQL_USER", keys::DB_USER),
  ("MYSQL_PASSWORD", keys::DB_PASSWORD),
  ("MYSQL_ROOT_PASSWORD", keys::DB_ROOT_PASSWORD),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComposeTool {
  /// The legacy `docker-compose` binary.
  Standalone,
  /// The `docker compose` CLI plugin.
  Plugin,
}

impl ComposeTool {
  fn base(self) -> Invocation {
    match self {
      Self::Standalone => Invocation::new("docker-compose"),
      Self::Plugin => Invocation::new("docker").arg("compose"),
    }
  }

  pub fn version_probe(self) -> Invocation {
    match self {
      Self::Standalone => self.base().arg("--version"),
      Self::Plugin => self.base().arg("version"),
    }
  }

  /// `<compose> -f <file>`, ready for a subcommand.
  pub fn with_file(self, file: &Path) -> Invocation {
    self.base().arg("-f").arg(file.to_string_lossy())
  }

  pub fn up(self, file: &Path) -> Invocation {
    self.with_file(file).args(["up", "-d"]).streamed()
  }

  /// Names of services currently running.
  pub fn running_services(self, file: &Path) -> Invocation {
    self.with_file(file).args(["ps", "--services", "--filter", "status=running"])
  }

  /// Register the first administrator inside the passbolt container.
  pub fn register_admin(self, file: &Path, email: &str, first_name: &str, last_name: &str) -> Invocation {
    self
      .with_file(file)
      .args(["exec", "-T", "-u", "www-data", PASSBOLT_SERVICE, CAKE_BIN, "passbolt", "register_user"])
      .args(["-u", email, "-f", first_name, "-l", last_name, "-r", "admin"])
  }
}

/// Which container tools are present on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerTools {
  pub docker: bool,
  pub compose: Option<ComposeTool>,
}

impl ContainerTools {
  pub fn ready(&self) -> Option<ComposeTool> {
    if self.docker { self.compose } else { None }
  }
}

pub fn docker_probe() -> Invocation {
  Invocation::new("docker").arg("--version")
}

/// Probe for docker and a compose front-end; the standalone binary wins
/// when both exist.
pub async fn detect<R: CommandRunner>(runner: &R) -> ContainerTools {
  let docker = succeeds(runner, &docker_probe()).await;
  let compose = if succeeds(runner, &ComposeTool::Standalone.version_probe()).await {
    Some(ComposeTool::Standalone)
  } else if succeeds(runner, &ComposeTool::Plugin.version_probe()).await {
    Some(ComposeTool::Plugin)
  } else {
    None
  };
  debug!(docker, compose = ?compose, "container tools detected");
  ContainerTools { docker, compose }
}

/// Poll until every service in `services` is running.
///
/// Checks at least once, even with a zero timeout.
pub async fn wait_until_running<R: CommandRunner>(
  runner: &R,
  tool: ComposeTool,
  file: &Path,
  services: &[&str],
  timeout: Duration,
) -> Result<(), ExecutionError> {
  let deadline = Instant::now() + timeout;
  let probe = tool.running_services(file);
  loop {
    let output = runner.run(&probe).await?;
    let running: Vec<&str> = if output.success() {
      output.stdout.lines().map(str::trim).collect()
    } else {
      Vec::new()
    };
    let pending: Vec<String> = services
      .iter()
      .filter(|service| !running.contains(service))
      .map(|service| service.to_string())
      .collect();

    if pending.is_empty() {
      info!(services = ?services, "services running");
      return Ok(());
    }

    let now = Instant::now();
    if now >= deadline {
      return Err(ExecutionError::NotReady {
        services: pending,
        timeout,
      });
    }
    debug!(pending = ?pending, "waiting for services");
    tokio::time::sleep(READY_POLL_INTERVAL.min(deadline - now)).await;
  }
}

/// Inject `record` into the upstream manifest.
///
/// Optional settings that were left blank keep whatever the manifest
/// already says, except the SMTP port which falls back to
/// [`DEFAULT_SMTP_PORT`].
pub fn render(manifest: &str, record: &ConfigurationRecord) -> Result<String, ExecutionError> {
  let mut document: Yaml = serde_yaml::from_str(manifest).map_err(|e| render_error(e.to_string()))?;

  let passbolt_vars = PASSBOLT_ENV
    .iter()
    .filter_map(|key| record.value(key).map(|value| (*key, value)))
    .chain(std::iter::once((
      keys::SMTP_PORT,
      record.value(keys::SMTP_PORT).unwrap_or(DEFAULT_SMTP_PORT),
    )));
  set_environment(&mut document, PASSBOLT_SERVICE, passbolt_vars)?;

  let db_vars = DB_ENV
    .iter()
    .filter_map(|(var, key)| record.value(key).map(|value| (*var, value)));
  set_environment(&mut document, DB_SERVICE, db_vars)?;

  serde_yaml::to_string(&document).map_err(|e| render_error(e.to_string()))
}

fn render_error(message: String) -> ExecutionError {
  ExecutionError::Render {
    what: "compose manifest",
    message,
  }
}

fn set_environment<'a>(
  document: &mut Yaml,
  service: &str,
  vars: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<(), ExecutionError> {
  let service_def = document
    .get_mut("services")
    .and_then(|services| services.get_mut(service))
    .and_then(Yaml::as_mapping_mut)
    .ok_or_else(|| render_error(format!("service '{service}' not found")))?;

  let env_key = Yaml::from("environment");
  let environment = service_def
    .entry(env_key)
    .or_insert_with(|| Yaml::Mapping(Mapping::new()));
  if environment.is_null() {
    *environment = Yaml::Mapping(Mapping::new());
  }

  match environment {
    Yaml::Mapping(map) => {
      for (key, value) in vars {
        map.insert(Yaml::from(key), Yaml::from(escape_interpolation(value)));
      }
    }
    Yaml::Sequence(list) => {
      for (key, value) in vars {
        let entry = Yaml::from(format!("{key}={}", escape_interpolation(value)));
        let existing = list.iter_mut().find(|item| {
          item
            .as_str()
            .is_some_and(|s| s.split_once('=').map_or(s, |(k, _)| k) == key)
        });
        match existing {
          Some(item) => *item = entry,
          None => list.push(entry),
        }
      }
    }
    _ => {
      return Err(render_error(format!(
        "environment of service '{service}' is neither a mapping nor a list"
      )));
    }
  }
  Ok(())
}

/// Compose substitutes `$VAR` and `${VAR}` in the manifest; `$$` is a literal `$`.
fn escape_interpolation(value: &str) -> String {
  value.replace('$', "$$")
}

/// Pull the first URL out of the registration command's output.
pub fn registration_link(output: &str) -> Option<String> {
  output
    .split_whitespace()
    .find(|token| token.starts_with("https://") || token.starts_with("http://"))
    .map(|token| token.trim_end_matches(['.', ',', ')', '"', '\'']).to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{Collected, collect};
  use crate::sequencer::pathway::docker_schema;
  use crate::util::testutil::{RecordingRunner, ScriptedPrompter, docker_answers};

  const MAP_MANIFEST: &str = r#"
services:
  db:
    image: mariadb:10.11
    environment:
      MYSQL_RANDOM_ROOT_PASSWORD: "true"
      MYSQL_DATABASE: "passbolt"
      MYSQL_USER: "passbolt"
      MYSQL_PASSWORD: "P4ssb0lt"
  passbolt:
    image: passbolt/passbolt:latest-ce
    environment:
      APP_FULL_BASE_URL: https://passbolt.local
      DATASOURCES_DEFAULT_HOST: "db"
"#;

  const LIST_MANIFEST: &str = r#"
services:
  db:
    image: mariadb:10.11
    environment:
      - MYSQL_DATABASE=passbolt
  passbolt:
    image: passbolt/passbolt:latest-ce
    environment:
      - APP_FULL_BASE_URL=https://passbolt.local
      - DATASOURCES_DEFAULT_HOST=db
"#;

  fn record() -> ConfigurationRecord {
    let mut prompter = ScriptedPrompter::new(docker_answers());
    match collect(&docker_schema(), &mut prompter).unwrap() {
      Collected::Record(record) => record,
      Collected::Cancelled { .. } => panic!("unexpected cancel"),
    }
  }

  fn env_of(rendered: &str, service: &str) -> Yaml {
    let doc: Yaml = serde_yaml::from_str(rendered).unwrap();
    doc["services"][service]["environment"].clone()
  }

  #[test]
  fn injects_into_mapping_environment() {
    let rendered = render(MAP_MANIFEST, &record()).unwrap();

    let passbolt = env_of(&rendered, "passbolt");
    assert_eq!(passbolt["APP_FULL_BASE_URL"], "https://passbolt.example.com");
    assert_eq!(passbolt["DATASOURCES_DEFAULT_PASSWORD"], "db-secret-123");
    assert_eq!(passbolt["EMAIL_TRANSPORT_DEFAULT_HOST"], "smtp.example.com");
    assert_eq!(passbolt["EMAIL_TRANSPORT_DEFAULT_PORT"], "587");

    let db = env_of(&rendered, "db");
    assert_eq!(db["MYSQL_DATABASE"], "passboltdb");
    assert_eq!(db["MYSQL_USER"], "passboltadmin");
    assert_eq!(db["MYSQL_PASSWORD"], "db-secret-123");
    // Untouched upstream values survive.
    assert_eq!(db["MYSQL_RANDOM_ROOT_PASSWORD"], "true");
  }

  #[test]
  fn injects_into_list_environment() {
    let rendered = render(LIST_MANIFEST, &record()).unwrap();

    let passbolt: Vec<String> = serde_yaml::from_value(env_of(&rendered, "passbolt")).unwrap();
    assert!(passbolt.contains(&"APP_FULL_BASE_URL=https://passbolt.example.com".to_string()));
    assert_eq!(
      passbolt.iter().filter(|e| e.starts_with("APP_FULL_BASE_URL=")).count(),
      1
    );

    let db: Vec<String> = serde_yaml::from_value(env_of(&rendered, "db")).unwrap();
    assert!(db.contains(&"MYSQL_DATABASE=passboltdb".to_string()));
    assert!(db.contains(&"MYSQL_USER=passboltadmin".to_string()));
  }

  #[test]
  fn dollar_signs_survive_interpolation() {
    let mut answers = docker_answers();
    answers[3] = "pa$word${X}1";
    let mut prompter = ScriptedPrompter::new(answers);
    let record = match collect(&docker_schema(), &mut prompter).unwrap() {
      Collected::Record(record) => record,
      Collected::Cancelled { .. } => panic!("unexpected cancel"),
    };

    let rendered = render(MAP_MANIFEST, &record).unwrap();
    assert_eq!(env_of(&rendered, "db")["MYSQL_PASSWORD"], "pa$$word$${X}1");
    assert_eq!(env_of(&rendered, "passbolt")["DATASOURCES_DEFAULT_PASSWORD"], "pa$$word$${X}1");

    let rendered = render(LIST_MANIFEST, &record).unwrap();
    let db: Vec<String> = serde_yaml::from_value(env_of(&rendered, "db")).unwrap();
    assert!(db.contains(&"MYSQL_PASSWORD=pa$$word$${X}1".to_string()));
    assert!(!rendered.contains("pa$word"));
  }

  #[test]
  fn missing_service_is_an_error() {
    let manifest = "services:\n  passbolt:\n    image: x\n";
    assert!(matches!(render(manifest, &record()), Err(ExecutionError::Render { .. })));
  }

  #[test]
  fn service_without_environment_gets_one() {
    let manifest = "services:\n  db:\n    image: m\n  passbolt:\n    image: p\n";
    let rendered = render(manifest, &record()).unwrap();
    assert_eq!(env_of(&rendered, "db")["MYSQL_USER"], "passboltadmin");
  }

  #[test]
  fn extracts_registration_link() {
    let output = "User saved successfully.\nTo start registration follow the link provided in your mailbox or here:\nhttps://passbolt.example.com/setup/start/abc/def.\n";
    assert_eq!(
      registration_link(output).as_deref(),
      Some("https://passbolt.example.com/setup/start/abc/def")
    );
    assert_eq!(registration_link("no link"), None);
  }

  #[test]
  fn register_admin_uses_argv() {
    let invocation = ComposeTool::Plugin.register_admin(Path::new("/srv/c.yaml"), "a@b.io", "Ada; rm", "Love");
    assert_eq!(invocation.program(), "docker");
    assert!(invocation.get_args().contains(&"Ada; rm".to_string()));
    assert_eq!(invocation.get_args()[0..3], ["compose", "-f", "/srv/c.yaml"]);
  }

  #[tokio::test]
  async fn waits_for_running_services() {
    let file = Path::new("/srv/c.yaml");
    let runner = RecordingRunner::new().respond("docker compose -f /srv/c.yaml ps", "db\npassbolt\n");
    wait_until_running(&runner, ComposeTool::Plugin, file, &["db", "passbolt"], Duration::ZERO)
      .await
      .unwrap();

    let runner = RecordingRunner::new().respond("docker compose -f /srv/c.yaml ps", "db");
    let err = wait_until_running(&runner, ComposeTool::Plugin, file, &["db", "passbolt"], Duration::ZERO)
      .await
      .unwrap_err();
    match err {
      ExecutionError::NotReady { services, .. } => assert_eq!(services, ["passbolt"]),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn prefers_standalone_compose() {
    let runner = RecordingRunner::new();
    assert_eq!(
      detect(&runner).await,
      ContainerTools {
        docker: true,
        compose: Some(ComposeTool::Standalone)
      }
    );

    let runner = RecordingRunner::new().missing("docker-compose");
    assert_eq!(detect(&runner).await.ready(), Some(ComposeTool::Plugin));

    let runner = RecordingRunner::new().missing("docker-compose").missing("docker");
    assert_eq!(detect(&runner).await.ready(), None);
  }
}
