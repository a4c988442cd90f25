//! Configuration schemas.

use super::validate::Validator;

/// One question in a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
  pub key: &'static str,
  pub prompt: &'static str,
  pub help: Option<&'static str>,
  pub validator: Validator,
  pub required: bool,
  /// Hidden while typed, redacted in the record and never logged.
  pub secret: bool,
  /// Used when the answer is left blank.
  pub default: Option<&'static str>,
}

impl Setting {
  pub const fn required(key: &'static str, prompt: &'static str, validator: Validator) -> Self {
    Self {
      key,
      prompt,
      help: None,
      validator,
      required: true,
      secret: false,
      default: None,
    }
  }

  pub const fn optional(key: &'static str, prompt: &'static str, validator: Validator) -> Self {
    Self {
      required: false,
      ..Self::required(key, prompt, validator)
    }
  }

  pub const fn secret(mut self) -> Self {
    self.secret = true;
    self
  }

  pub const fn with_default(mut self, default: &'static str) -> Self {
    self.default = Some(default);
    self
  }

  pub const fn with_help(mut self, help: &'static str) -> Self {
    self.help = Some(help);
    self
  }
}

/// An ordered list of settings for one pathway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
  name: &'static str,
  settings: Vec<Setting>,
}

impl Schema {
  pub fn new(name: &'static str, settings: Vec<Setting>) -> Self {
    Self { name, settings }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn settings(&self) -> &[Setting] {
    &self.settings
  }

  pub fn required_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.settings.iter().filter(|s| s.required).map(|s| s.key)
  }
}
