//! Test suites for the `wb` client.

pub(crate) mod support;
