//! The terminal boundary of the collector.

use thiserror::Error;

use super::schema::Setting;
use super::validate::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
  Value(String),
  /// The operator backed out (Esc, Ctrl-C, end of input).
  Cancel,
}

#[derive(Debug, Error)]
pub enum PromptError {
  #[error("terminal interaction failed: {0}")]
  Terminal(String),

  #[error("no interactive terminal available")]
  NotInteractive,
}

/// Renders questions and reads answers.
///
/// Implementations must hide input for secret settings.
pub trait Prompter {
  fn ask(&mut self, setting: &Setting) -> Result<Answer, PromptError>;

  /// Tell the operator why the last answer was refused.
  fn reject(&mut self, setting: &Setting, error: &ValidationError);

  /// Ask a yes/no question. `false` when the operator declines or cancels.
  fn confirm(&mut self, message: &str) -> Result<bool, PromptError>;
}
