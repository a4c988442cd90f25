//! Test doubles for passbolt-setup-lib.
//!
//! Scripted stand-ins for the three outside boundaries of the engine: the
//! network ([`StaticTransport`]), subprocesses ([`RecordingRunner`]) and the
//! operator ([`ScriptedPrompter`]).

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use reqwest::Url;

use crate::config::{Answer, PromptError, Prompter, Setting, ValidationError};
use crate::exec::runner::{CommandOutput, CommandRunner, Invocation, RunError};
use crate::fetch::{FetchError, Transport};

/// Serves fixed bodies by URL; anything else is a 404.
#[derive(Debug, Default)]
pub struct StaticTransport {
  bodies: HashMap<String, Vec<u8>>,
  requests: Mutex<Vec<String>>,
}

impl StaticTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, url: &str, body: Vec<u8>) -> Self {
    self.bodies.insert(url.to_string(), body);
    self
  }

  /// Every URL requested so far, in order.
  pub fn requests(&self) -> Vec<String> {
    self.requests.lock().unwrap().clone()
  }
}

impl Transport for StaticTransport {
  async fn get(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
    self.requests.lock().unwrap().push(url.to_string());
    self.bodies.get(url.as_str()).cloned().ok_or(FetchError::Status {
      url: url.to_string(),
      status: 404,
    })
  }
}

#[derive(Debug, Clone)]
enum Reply {
  Exit { code: i32, stdout: String },
  Missing,
}

/// Records every invocation and answers from a rule list.
///
/// Rules match a command line exactly or as a whole-word prefix, later rules
/// winning. Unmatched commands exit 0 with empty output, except `dpkg-query`
/// which reports the package as installed.
#[derive(Debug, Default)]
pub struct RecordingRunner {
  rules: Vec<(String, Reply)>,
  calls: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail(mut self, command: &str, code: i32) -> Self {
    self.rules.push((
      command.to_string(),
      Reply::Exit {
        code,
        stdout: String::new(),
      },
    ));
    self
  }

  pub fn respond(mut self, command: &str, stdout: &str) -> Self {
    self.rules.push((
      command.to_string(),
      Reply::Exit {
        code: 0,
        stdout: stdout.to_string(),
      },
    ));
    self
  }

  /// Make `program` fail to spawn.
  pub fn missing(mut self, program: &str) -> Self {
    self.rules.push((program.to_string(), Reply::Missing));
    self
  }

  /// Report `packages` as not installed to both dpkg-query and rpm.
  pub fn absent<'a>(mut self, packages: impl IntoIterator<Item = &'a str>) -> Self {
    for package in packages {
      self = self
        .fail(&format!("dpkg-query -W -f=${{Status}} {package}"), 1)
        .fail(&format!("rpm -q {package}"), 1);
    }
    self
  }

  /// Command lines run so far, in order.
  pub fn calls(&self) -> Vec<String> {
    self.invocations().iter().map(Invocation::command_line).collect()
  }

  pub fn invocations(&self) -> Vec<Invocation> {
    self.calls.lock().unwrap().clone()
  }

  fn reply(&self, invocation: &Invocation) -> Reply {
    let line = invocation.command_line();
    let rule = self.rules.iter().rev().find(|(prefix, _)| {
      line == *prefix || line.strip_prefix(prefix.as_str()).is_some_and(|rest| rest.starts_with(' '))
    });
    match rule {
      Some((_, reply)) => reply.clone(),
      None if invocation.program() == "dpkg-query" => Reply::Exit {
        code: 0,
        stdout: "install ok installed".to_string(),
      },
      None => Reply::Exit {
        code: 0,
        stdout: String::new(),
      },
    }
  }
}

impl CommandRunner for RecordingRunner {
  async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunError> {
    self.calls.lock().unwrap().push(invocation.clone());
    match self.reply(invocation) {
      Reply::Exit { code, stdout } => Ok(CommandOutput {
        code: Some(code),
        stdout,
        stderr: String::new(),
      }),
      Reply::Missing => Err(RunError::Spawn {
        program: invocation.program().to_string(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
      }),
    }
  }
}

/// Replays canned answers. Running out of answers behaves like a closed
/// terminal.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
  answers: VecDeque<Answer>,
  confirms: VecDeque<bool>,
  asked: Vec<&'static str>,
  rejections: Vec<(&'static str, ValidationError)>,
  confirmations: Vec<String>,
}

impl ScriptedPrompter {
  pub fn new<'a>(answers: impl IntoIterator<Item = &'a str>) -> Self {
    Self::from_answers(answers.into_iter().map(|a| Answer::Value(a.to_string())))
  }

  pub fn from_answers(answers: impl IntoIterator<Item = Answer>) -> Self {
    Self {
      answers: answers.into_iter().collect(),
      ..Self::default()
    }
  }

  /// Queue answers for yes/no questions.
  pub fn with_confirms(mut self, confirms: impl IntoIterator<Item = bool>) -> Self {
    self.confirms.extend(confirms);
    self
  }

  /// Keys asked, once per prompt shown.
  pub fn asked(&self) -> &[&'static str] {
    &self.asked
  }

  pub fn rejections(&self) -> &[(&'static str, ValidationError)] {
    &self.rejections
  }

  /// Yes/no questions shown so far.
  pub fn confirmations(&self) -> &[String] {
    &self.confirmations
  }
}

impl Prompter for ScriptedPrompter {
  fn ask(&mut self, setting: &Setting) -> Result<Answer, PromptError> {
    self.asked.push(setting.key);
    self.answers.pop_front().ok_or(PromptError::NotInteractive)
  }

  fn reject(&mut self, setting: &Setting, error: &ValidationError) {
    self.rejections.push((setting.key, error.clone()));
  }

  fn confirm(&mut self, message: &str) -> Result<bool, PromptError> {
    self.confirmations.push(message.to_string());
    self.confirms.pop_front().ok_or(PromptError::NotInteractive)
  }
}

/// Answers for the docker pathway schema, blank where a default applies.
pub fn docker_answers() -> Vec<&'static str> {
  vec![
    "",
    "passboltdb",
    "passboltadmin",
    "db-secret-123",
    "",
    "https://passbolt.example.com",
    "passbolt@example.com",
    "smtp.example.com",
    "",
    "",
    "",
    "",
    "admin@example.com",
    "Ada",
    "Lovelace",
  ]
}

/// Answers for the Debian package pathway schema.
pub fn debian_answers() -> Vec<&'static str> {
  vec!["", "root-secret", "", "db-secret-123", "", "passbolt.example.com"]
}

/// A repository setup script large enough to pass the fallback check.
pub fn shell_script() -> Vec<u8> {
  let mut script = String::from("#!/usr/bin/env bash\nset -euo pipefail\n\n");
  for i in 0..40 {
    script.push_str(&format!("# step {i}: configure the package repository\n"));
  }
  script.push_str("echo \"repository configured\"\n");
  script.into_bytes()
}

/// A compose manifest shaped like the upstream one, with list-form
/// environments.
pub fn compose_manifest() -> String {
  let mut manifest = String::from(
    r#"services:
  db:
    image: mariadb:10.11
    restart: unless-stopped
    environment:
      - MYSQL_RANDOM_ROOT_PASSWORD=true
      - MYSQL_DATABASE=passbolt
      - MYSQL_USER=passbolt
      - MYSQL_PASSWORD=P4ssb0lt
    volumes:
      - database_volume:/var/lib/mysql

  passbolt:
    image: passbolt/passbolt:latest-ce
    restart: unless-stopped
    depends_on:
      - db
    environment:
      - APP_FULL_BASE_URL=https://passbolt.local
      - DATASOURCES_DEFAULT_HOST=db
      - DATASOURCES_DEFAULT_USERNAME=passbolt
      - DATASOURCES_DEFAULT_PASSWORD=P4ssb0lt
      - DATASOURCES_DEFAULT_DATABASE=passbolt
    volumes:
      - gpg_volume:/etc/passbolt/gpg
      - jwt_volume:/etc/passbolt/jwt
    command:
      [
        "/usr/bin/wait-for.sh",
        "-t",
        "0",
        "db:3306",
        "--",
        "/docker-entrypoint.sh",
      ]
    ports:
      - 80:80
      - 443:443

volumes:
  database_volume:
  gpg_volume:
  jwt_volume:
"#,
  );
  while manifest.len() < 1200 {
    manifest.push_str("# padding\n");
  }
  manifest
}
