//! The interactive installer menu.
//!
//! Each menu choice runs one pathway through the sequencer. A cancelled run
//! comes back to the menu; success or failure ends the process with the
//! run's exit code.

use anyhow::{Context, Result};
use tracing::debug;

use passbolt_setup_lib::exec::SystemRunner;
use passbolt_setup_lib::fetch::HttpTransport;
use passbolt_setup_lib::sequencer::{Completion, Outcome, Pathway, Sequencer};
use passbolt_setup_lib::settings::Settings;

use crate::output::{print_error, print_info, print_link, print_stat, print_success, print_warning};
use crate::prompts::{InquirePrompter, read_menu_choice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
  Run(Pathway),
  Exit,
}

fn parse_choice(input: &str) -> Option<MenuChoice> {
  match input.trim() {
    "1" => Some(MenuChoice::Run(Pathway::Docker)),
    "2" => Some(MenuChoice::Run(Pathway::Packages)),
    "0" => Some(MenuChoice::Exit),
    _ => None,
  }
}

fn print_menu() {
  println!();
  println!("Passbolt CE installer");
  println!("  1) Install with Docker");
  println!("  2) Install native packages");
  println!("  0) Exit");
}

/// Execute the interactive installer. Returns the process exit code.
pub fn cmd_install() -> Result<u8> {
  let settings = Settings::from_env().context("Invalid settings")?;
  let transport = HttpTransport::new(settings.fetch_timeout).context("Failed to create HTTP client")?;
  let runner = SystemRunner::new(settings.command_timeout);
  let mut sequencer = Sequencer::new(settings, transport, runner, InquirePrompter);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  loop {
    print_menu();
    let Some(input) = read_menu_choice()? else {
      return Ok(0);
    };
    let pathway = match parse_choice(&input) {
      Some(MenuChoice::Run(pathway)) => pathway,
      Some(MenuChoice::Exit) => return Ok(0),
      None => {
        print_warning(&format!("'{}' is not a menu option", input.trim()));
        continue;
      }
    };

    debug!(pathway = %pathway, "menu selection");
    let report = rt.block_on(sequencer.run(pathway));
    match &report.outcome {
      Outcome::Success(completion) => {
        print_completion(completion, sequencer.settings());
        return Ok(report.exit_code());
      }
      Outcome::Failed(failure) => {
        print_error(&failure.to_string());
        return Ok(report.exit_code());
      }
      Outcome::Cancelled { state } => {
        print_info(&format!("Cancelled during {state}, nothing was changed."));
      }
    }
  }
}

fn print_completion(completion: &Completion, settings: &Settings) {
  print_success(&format!("Passbolt CE installed ({} pathway)", completion.pathway));
  if let Some(file) = &completion.compose_file {
    print_stat("Compose file", &file.display().to_string());
  }
  match (&completion.registration_link, completion.pathway) {
    (Some(link), _) => print_link("Finish the admin registration at", link),
    (None, Pathway::Docker) => {
      print_warning("No registration link was printed; check the passbolt container logs.");
    }
    (None, Pathway::Packages) => {
      print_info("Open the server's address in a browser to finish the setup.");
    }
  }
  if completion.pathway == Pathway::Docker {
    print_stat("Install directory", &settings.install_dir.display().to_string());
  }
}
