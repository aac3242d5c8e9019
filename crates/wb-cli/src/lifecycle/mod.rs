//! Lifecycle management for session daemons.
//!
//! The module is split into focused submodules:
//! - [`types`] holds the context and listing models.
//! - [`error`] captures the error surface exposed to the CLI.
//! - [`spawning`] resolves and launches the `wbd` binary.
//! - [`monitoring`] reads health snapshots and polls for readiness.
//! - [`shutdown`] waits for daemons to exit and signals stragglers.
//! - [`socket`] checks whether session sockets accept connections.
//! - [`utils`] opens session artefacts.
//! - [`controller`] implements ensure, delete, and list.

mod controller;
mod error;
mod monitoring;
#[cfg(test)]
mod monitoring_tests;
mod shutdown;
mod socket;
mod spawning;
mod types;
mod utils;

pub(crate) use controller::SystemLifecycle;
pub(crate) use error::LifecycleError;
pub(crate) use types::{LifecycleContext, SessionStatus};
