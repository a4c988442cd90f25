//! passbolt-setup-lib: installation orchestration engine for Passbolt CE.
//!
//! The crate is organised leaf-first:
//! - `host`: classifies the running distribution and its package manager
//! - `fetch`: downloads upstream artifacts and verifies their integrity
//! - `config`: interactive, validated collection of installation settings
//! - `deps`: idempotent host package installation
//! - `exec`: argument-vector subprocesses, compose and preseed rendering
//! - `sequencer`: the state machine tying the pathways together
//!
//! Running two instances against the same host at once is not supported; the
//! engine takes no lock on the package database.

pub mod config;
pub mod consts;
pub mod deps;
pub mod error;
pub mod exec;
pub mod fetch;
pub mod host;
pub mod sequencer;
pub mod settings;
pub mod util;
