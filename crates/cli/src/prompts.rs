//! Terminal prompts backed by inquire.

use anyhow::{Result, bail};
use inquire::{Confirm, InquireError, Password, PasswordDisplayMode, Text};

use passbolt_setup_lib::config::{Answer, CANCEL_KEYWORD, PromptError, Prompter, Setting, ValidationError};

use crate::output::print_warning;

/// Asks schema questions on the controlling terminal.
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
  fn ask(&mut self, setting: &Setting) -> Result<Answer, PromptError> {
    let label = format!("{}:", setting.prompt);
    let help = help_message(setting);

    let result = if setting.secret {
      Password::new(&label)
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_help_message(&help)
        .prompt()
    } else {
      let mut prompt = Text::new(&label).with_help_message(&help);
      if let Some(default) = setting.default {
        prompt = prompt.with_placeholder(default);
      }
      prompt.prompt()
    };

    match result {
      Ok(value) => Ok(Answer::Value(value)),
      Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(Answer::Cancel),
      Err(e) => Err(prompt_error(e)),
    }
  }

  fn reject(&mut self, setting: &Setting, error: &ValidationError) {
    print_warning(&format!("{}: {error}", setting.prompt));
  }

  fn confirm(&mut self, message: &str) -> Result<bool, PromptError> {
    match Confirm::new(message).with_default(false).prompt() {
      Ok(answer) => Ok(answer),
      Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
      Err(e) => Err(prompt_error(e)),
    }
  }
}

fn help_message(setting: &Setting) -> String {
  let mut parts = Vec::new();
  if let Some(help) = setting.help {
    parts.push(help.to_string());
  }
  match (setting.default, setting.required) {
    (Some(default), _) => parts.push(format!("Enter for '{default}'")),
    (None, false) => parts.push("Enter to skip".to_string()),
    (None, true) => {}
  }
  parts.push(format!("'{CANCEL_KEYWORD}' to cancel"));
  parts.join(", ")
}

fn prompt_error(err: InquireError) -> PromptError {
  match err {
    InquireError::NotTTY => PromptError::NotInteractive,
    other => PromptError::Terminal(other.to_string()),
  }
}

/// Read one line for the main menu. `None` when the operator backs out.
pub fn read_menu_choice() -> Result<Option<String>> {
  match Text::new("Select an option:").prompt() {
    Ok(choice) => Ok(Some(choice)),
    Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
    Err(InquireError::NotTTY) => bail!("the installer needs an interactive terminal"),
    Err(e) => Err(e.into()),
  }
}
