//! Answer validators.
//!
//! Each validator either rejects the input or returns its normalised form.

use std::net::IpAddr;

use reqwest::Url;
use thiserror::Error;

/// Why an answer was rejected. Handled inside the collector by asking again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("a value is required")]
  Required,

  #[error("'{0}' is not a valid hostname")]
  Hostname(String),

  #[error("'{0}' must be a service name, not localhost or an IP address")]
  ServiceHost(String),

  #[error("'{0}' is not a valid email address")]
  Email(String),

  #[error("'{0}' is not a port number between 1 and 65535")]
  Port(String),

  #[error("'{value}' is not a valid URL: {reason}")]
  Url { value: String, reason: String },

  #[error("'{0}' is not true or false")]
  Boolean(String),

  #[error("must be at least {min} characters long")]
  TooShort { min: usize },

  #[error("must be at most {max} characters long")]
  TooLong { max: usize },

  #[error("control characters are not allowed")]
  ControlCharacters,

  #[error("must not start with '-'")]
  LeadingDash,

  #[error("'{value}' is not one of: {}", allowed.join(", "))]
  NotOneOf { value: String, allowed: &'static [&'static str] },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
  /// Any non-empty text without control characters.
  NonEmpty,
  /// A person's name. It is passed as a command argument, so it may not
  /// look like an option.
  Name,
  Hostname,
  /// A hostname that names a service: rejects `localhost` and IP literals.
  ServiceHost,
  Email,
  Port,
  /// An absolute `http` or `https` URL; a trailing slash is dropped.
  BaseUrl,
  Boolean,
  /// A password of at least `min` characters.
  Password { min: usize },
  OneOf(&'static [&'static str]),
}

const MAX_NAME_LEN: usize = 64;
const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

impl Validator {
  /// Validate non-empty `input`, returning the value to record.
  pub fn validate(&self, input: &str) -> Result<String, ValidationError> {
    if input.is_empty() {
      return Err(ValidationError::Required);
    }
    if input.chars().any(char::is_control) {
      return Err(ValidationError::ControlCharacters);
    }

    match self {
      Self::NonEmpty => Ok(input.to_string()),
      Self::Name => {
        if input.chars().count() > MAX_NAME_LEN {
          Err(ValidationError::TooLong { max: MAX_NAME_LEN })
        } else if input.starts_with('-') {
          Err(ValidationError::LeadingDash)
        } else {
          Ok(input.to_string())
        }
      }
      Self::Hostname => hostname(input),
      Self::ServiceHost => service_host(input),
      Self::Email => email(input),
      Self::Port => match input.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port.to_string()),
        _ => Err(ValidationError::Port(input.to_string())),
      },
      Self::BaseUrl => base_url(input),
      Self::Boolean => match input.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" => Ok("true".to_string()),
        "false" | "no" | "n" => Ok("false".to_string()),
        _ => Err(ValidationError::Boolean(input.to_string())),
      },
      Self::Password { min } => {
        if input.chars().count() < *min {
          Err(ValidationError::TooShort { min: *min })
        } else {
          Ok(input.to_string())
        }
      }
      Self::OneOf(allowed) => {
        let lowered = input.to_ascii_lowercase();
        allowed
          .iter()
          .find(|candidate| **candidate == lowered)
          .map(|candidate| (*candidate).to_string())
          .ok_or(ValidationError::NotOneOf {
            value: input.to_string(),
            allowed,
          })
      }
    }
  }
}

fn hostname(input: &str) -> Result<String, ValidationError> {
  let host = input.trim_end_matches('.').to_ascii_lowercase();
  let valid = !host.is_empty()
    && host.len() <= MAX_HOSTNAME_LEN
    && host.split('.').all(|label| {
      !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
  if valid { Ok(host) } else { Err(ValidationError::Hostname(input.to_string())) }
}

fn service_host(input: &str) -> Result<String, ValidationError> {
  if input.parse::<IpAddr>().is_ok() {
    return Err(ValidationError::ServiceHost(input.to_string()));
  }
  let host = hostname(input)?;
  // Dotted all-digit labels are address fragments, not service names.
  if host == "localhost" || host.split('.').any(|label| label.chars().all(|c| c.is_ascii_digit())) {
    return Err(ValidationError::ServiceHost(input.to_string()));
  }
  Ok(host)
}

fn email(input: &str) -> Result<String, ValidationError> {
  let invalid = || ValidationError::Email(input.to_string());
  let (local, domain) = input.split_once('@').ok_or_else(invalid)?;
  if local.is_empty() || local.chars().any(char::is_whitespace) || domain.contains('@') || !domain.contains('.') {
    return Err(invalid());
  }
  let domain = hostname(domain).map_err(|_| invalid())?;
  Ok(format!("{local}@{domain}"))
}

fn base_url(input: &str) -> Result<String, ValidationError> {
  let url = Url::parse(input).map_err(|e| ValidationError::Url {
    value: input.to_string(),
    reason: e.to_string(),
  })?;
  if !matches!(url.scheme(), "http" | "https") {
    return Err(ValidationError::Url {
      value: input.to_string(),
      reason: "scheme must be http or https".to_string(),
    });
  }
  if url.host_str().is_none_or(str::is_empty) {
    return Err(ValidationError::Url {
      value: input.to_string(),
      reason: "missing host".to_string(),
    });
  }
  Ok(input.trim_end_matches('/').to_string())
}
