//! The validated configuration record.

use std::fmt;

use thiserror::Error;

use super::schema::Schema;

/// A value that must not be displayed or logged.
///
/// `Debug` and `Display` are redacted; [`SecretValue::expose`] is the only
/// way to read it.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for SecretValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("SecretValue(***)")
  }
}

impl fmt::Display for SecretValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("********")
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
  Plain(String),
  Secret(SecretValue),
}

impl Value {
  /// The raw value, secret or not. Callers decide where it may go.
  pub fn expose(&self) -> &str {
    match self {
      Self::Plain(value) => value,
      Self::Secret(secret) => secret.expose(),
    }
  }

  pub fn is_secret(&self) -> bool {
    matches!(self, Self::Secret(_))
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Plain(value) => f.write_str(value),
      Self::Secret(secret) => secret.fmt(f),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("required setting '{key}' is missing from the {schema} configuration")]
pub struct MissingSettingError {
  pub schema: &'static str,
  pub key: &'static str,
}

/// Ordered, immutable mapping from setting key to validated value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationRecord {
  entries: Vec<(&'static str, Value)>,
}

impl ConfigurationRecord {
  /// Only the collector assembles records.
  pub(crate) fn insert(&mut self, key: &'static str, value: Value) {
    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some((_, existing)) => *existing = value,
      None => self.entries.push((key, value)),
    }
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
  }

  /// The exposed value for `key`, if present.
  pub fn value(&self, key: &str) -> Option<&str> {
    self.get(key).map(Value::expose)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.get(key).is_some()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
    self.entries.iter().map(|(k, v)| (*k, v))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Check that every required key of `schema` is present and non-empty.
  pub fn check_complete(&self, schema: &Schema) -> Result<(), MissingSettingError> {
    for key in schema.required_keys() {
      if self.value(key).is_none_or(str::is_empty) {
        return Err(MissingSettingError {
          schema: schema.name(),
          key,
        });
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::schema::Setting;
  use crate::config::validate::Validator;

  #[test]
  fn secrets_are_redacted_in_debug_and_display() {
    let mut record = ConfigurationRecord::default();
    record.insert("DB_PASSWORD", Value::Secret(SecretValue::new("hunter2hunter2")));
    record.insert("DB_USER", Value::Plain("passbolt".to_string()));

    let debug = format!("{record:?}");
    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("passbolt"));
    assert_eq!(record.get("DB_PASSWORD").unwrap().to_string(), "********");
    assert_eq!(record.value("DB_PASSWORD"), Some("hunter2hunter2"));
  }

  #[test]
  fn insertion_order_is_kept() {
    let mut record = ConfigurationRecord::default();
    record.insert("B", Value::Plain("1".into()));
    record.insert("A", Value::Plain("2".into()));
    record.insert("B", Value::Plain("3".into()));

    let keys: Vec<_> = record.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, ["B", "A"]);
    assert_eq!(record.value("B"), Some("3"));
  }

  #[test]
  fn completeness_check_names_missing_key() {
    let schema = Schema::new(
      "test",
      vec![
        Setting::required("HOST", "Host", Validator::Hostname),
        Setting::optional("PORT", "Port", Validator::Port),
      ],
    );
    let record = ConfigurationRecord::default();
    assert_eq!(
      record.check_complete(&schema),
      Err(MissingSettingError { schema: "test", key: "HOST" })
    );

    let mut record = ConfigurationRecord::default();
    record.insert("HOST", Value::Plain("db".into()));
    assert!(record.check_complete(&schema).is_ok());
  }
}
