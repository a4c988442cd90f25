//! debconf answers for `passbolt-ce-server`.
//!
//! Preseeding lets `apt-get install` run non-interactively: the package's
//! questions about the local database and nginx vhost are answered up front
//! through `debconf-set-selections`.

use std::fmt::Write as _;

use super::ExecutionError;
use crate::config::{ConfigurationRecord, MissingSettingError};
use crate::consts::SERVER_PACKAGE;

pub mod keys {
  pub const MYSQL_ADMIN_USER: &str = "MYSQL_ADMIN_USER";
  pub const MYSQL_ADMIN_PASSWORD: &str = "MYSQL_ADMIN_PASSWORD";
  pub const DB_USER: &str = "PASSBOLT_DB_USER";
  pub const DB_PASSWORD: &str = "PASSBOLT_DB_PASSWORD";
  pub const DB_NAME: &str = "PASSBOLT_DB_NAME";
  pub const DOMAIN: &str = "PASSBOLT_DOMAIN";
}

pub const SCHEMA_NAME: &str = "debian packages";

enum Kind {
  Boolean,
  Text,
  Password,
  Select,
}

impl Kind {
  fn as_str(&self) -> &'static str {
    match self {
      Kind::Boolean => "boolean",
      Kind::Text => "string",
      Kind::Password => "password",
      Kind::Select => "select",
    }
  }
}

/// Render the selections file content for `record`.
pub fn render(record: &ConfigurationRecord) -> Result<String, ExecutionError> {
  let required = |key: &'static str| {
    record.value(key).ok_or(MissingSettingError {
      schema: SCHEMA_NAME,
      key,
    })
  };

  let db_password = required(keys::DB_PASSWORD)?;
  let answers = [
    ("mysql-configuration", Kind::Boolean, "true"),
    ("mysql-username", Kind::Text, required(keys::MYSQL_ADMIN_USER)?),
    ("mysql-password", Kind::Password, required(keys::MYSQL_ADMIN_PASSWORD)?),
    ("mysql-passbolt-username", Kind::Text, required(keys::DB_USER)?),
    ("mysql-passbolt-password", Kind::Password, db_password),
    ("mysql-passbolt-password-repeat", Kind::Password, db_password),
    ("mysql-passbolt-dbname", Kind::Text, required(keys::DB_NAME)?),
    ("nginx-configuration", Kind::Boolean, "true"),
    ("nginx-configuration-three-choices", Kind::Select, "none"),
    ("nginx-domain", Kind::Text, required(keys::DOMAIN)?),
  ];

  let mut out = String::new();
  for (question, kind, value) in answers {
    if value.contains(['\n', '\r']) {
      return Err(ExecutionError::Render {
        what: "debconf preseed",
        message: format!("answer to '{question}' spans multiple lines"),
      });
    }
    // Infallible for String.
    let _ = writeln!(out, "{SERVER_PACKAGE} passbolt/{question} {} {value}", kind.as_str());
  }
  Ok(out)
}
