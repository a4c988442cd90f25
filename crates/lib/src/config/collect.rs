//! The question/answer loop.
//!
//! Each setting runs through a small state machine:
//!
//! ```text
//! Asking --answer--> Validating --ok--> Accepted
//!   ^                    |
//!   +------Rejected<-----+--err
//! Asking --"exit"/cancel--> Cancelled
//! ```
//!
//! Rejections loop back to the same question without limit; nothing advances
//! on a bad answer.

use tracing::debug;

use super::prompt::{Answer, PromptError, Prompter};
use super::record::{ConfigurationRecord, SecretValue, Value};
use super::schema::{Schema, Setting};
use super::validate::ValidationError;

/// Typing this at any prompt abandons the whole sequence.
pub const CANCEL_KEYWORD: &str = "exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collected {
  Record(ConfigurationRecord),
  /// Cancelled while asking for `key`; nothing was recorded.
  Cancelled { key: &'static str },
}

enum Step {
  Asking,
  Validating(String),
  Rejected(ValidationError),
  Accepted(Option<String>),
  Cancelled,
}

/// Run `schema` against `prompter`.
pub fn collect<P: Prompter>(schema: &Schema, prompter: &mut P) -> Result<Collected, PromptError> {
  let mut record = ConfigurationRecord::default();

  for setting in schema.settings() {
    match ask_until_valid(setting, prompter)? {
      Some(Some(value)) => {
        let value = if setting.secret {
          Value::Secret(SecretValue::new(value))
        } else {
          Value::Plain(value)
        };
        record.insert(setting.key, value);
      }
      Some(None) => debug!(key = setting.key, "optional setting left blank"),
      None => {
        debug!(key = setting.key, schema = schema.name(), "configuration cancelled");
        return Ok(Collected::Cancelled { key: setting.key });
      }
    }
  }

  debug!(schema = schema.name(), settings = record.len(), "configuration collected");
  Ok(Collected::Record(record))
}

/// `Some(value)` when accepted (value `None` for a blank optional), `None`
/// when cancelled.
fn ask_until_valid<P: Prompter>(setting: &Setting, prompter: &mut P) -> Result<Option<Option<String>>, PromptError> {
  let mut step = Step::Asking;
  loop {
    step = match step {
      Step::Asking => match prompter.ask(setting)? {
        Answer::Cancel => Step::Cancelled,
        Answer::Value(input) if input.trim().eq_ignore_ascii_case(CANCEL_KEYWORD) => Step::Cancelled,
        Answer::Value(input) => Step::Validating(input),
      },
      Step::Validating(input) => match evaluate(setting, &input) {
        Ok(value) => Step::Accepted(value),
        Err(error) => Step::Rejected(error),
      },
      Step::Rejected(error) => {
        debug!(key = setting.key, error = %error, "answer rejected");
        prompter.reject(setting, &error);
        Step::Asking
      }
      Step::Accepted(value) => return Ok(Some(value)),
      Step::Cancelled => return Ok(None),
    };
  }
}

/// Validate one raw answer against `setting`.
///
/// Blank input takes the setting's default; without one it is an error for
/// required settings and `Ok(None)` for optional ones. Secrets keep their
/// surrounding whitespace, everything else is trimmed.
pub fn evaluate(setting: &Setting, input: &str) -> Result<Option<String>, ValidationError> {
  let input = if setting.secret { input } else { input.trim() };

  if input.is_empty() {
    return match (setting.default, setting.required) {
      (Some(default), _) => setting.validator.validate(default).map(Some),
      (None, true) => Err(ValidationError::Required),
      (None, false) => Ok(None),
    };
  }

  setting.validator.validate(input).map(Some)
}
