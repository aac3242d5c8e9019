//! Test suites for the browser session daemon.

mod bootstrap_behaviour;
pub(crate) mod support;
