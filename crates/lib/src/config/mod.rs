//! Interactive configuration collection.
//!
//! A [`Schema`] lists the settings a pathway needs. [`collect`] walks it with a
//! [`Prompter`], validating every answer on the spot and re-asking until it is
//! acceptable, and produces an immutable [`ConfigurationRecord`].

pub mod collect;
pub mod prompt;
pub mod record;
pub mod schema;
pub mod validate;

pub use collect::{CANCEL_KEYWORD, Collected, collect, evaluate};
pub use prompt::{Answer, PromptError, Prompter};
pub use record::{ConfigurationRecord, MissingSettingError, SecretValue, Value};
pub use schema::{Schema, Setting};
pub use validate::{ValidationError, Validator};
