//! Separates configuration flags from command tokens.
//!
//! Both binaries accept `ortho_config` flags ahead of their own arguments. The
//! split here hands the leading configuration flags to the loader and leaves
//! the remaining tokens for the binary's own `clap` parser.

use std::ffi::{OsStr, OsString};

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of [`crate::Config`].
pub const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--sessions-dir",
    "--log-filter",
    "--log-format",
    "--browser",
    "--driver-program",
    "--lightpanda-program",
    "--request-timeout-secs",
    "--startup-timeout-secs",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

/// Result of splitting an argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigArgumentSplit {
    /// Program name followed by the configuration flags and their values.
    pub config_arguments: Vec<OsString>,
    /// Index of the first command token in the original vector.
    pub command_start: usize,
}

impl ConfigArgumentSplit {
    /// Program name followed by the command tokens, ready for `clap`.
    #[must_use]
    pub fn command_arguments(&self, args: &[OsString]) -> Vec<OsString> {
        let mut command = Vec::with_capacity(args.len());
        if let Some(first) = args.first() {
            command.push(first.clone());
        }
        command.extend(args.iter().skip(self.command_start).cloned());
        command
    }
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Skip;
    }
    let (flag, has_inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (&*text, false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Skip
    }
}

/// Splits leading configuration flags from the command tokens.
///
/// Configuration flags must appear before any command token; a flag after the
/// first command token belongs to the command.
#[must_use]
pub fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some(program) = args.first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut filtered = vec![program.clone()];
    let mut command_start = 1usize;
    let mut pending_value = false;

    for argument in args.iter().skip(1) {
        if pending_value {
            filtered.push(argument.clone());
            pending_value = false;
            command_start += 1;
            continue;
        }
        match classify(argument) {
            FlagAction::Include { needs_value } => {
                filtered.push(argument.clone());
                command_start += 1;
                pending_value = needs_value;
            }
            FlagAction::Skip => break,
        }
    }

    ConfigArgumentSplit {
        config_arguments: filtered,
        command_start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case::inline("--log-filter=debug", FlagAction::Include { needs_value: false })]
    #[case::separate("--log-filter", FlagAction::Include { needs_value: true })]
    #[case::command("tab", FlagAction::Skip)]
    #[case::unknown("--session", FlagAction::Skip)]
    fn classifies_flags(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(classify(OsStr::new(argument)), expected);
    }

    #[test]
    fn splits_leading_configuration_flags() {
        let args = os(&[
            "wb",
            "--sessions-dir",
            "/tmp/s",
            "--browser=lightpanda",
            "tab",
            "list",
        ]);
        let split = split_config_arguments(&args);
        assert_eq!(
            split.config_arguments,
            os(&["wb", "--sessions-dir", "/tmp/s", "--browser=lightpanda"])
        );
        assert_eq!(split.command_arguments(&args), os(&["wb", "tab", "list"]));
    }

    #[test]
    fn flags_after_command_tokens_stay_with_the_command() {
        let args = os(&["wb", "go", "--log-filter", "debug"]);
        let split = split_config_arguments(&args);
        assert_eq!(split.config_arguments, os(&["wb"]));
        assert_eq!(split.command_arguments(&args), args);
    }

    #[test]
    fn empty_arguments_split_to_nothing() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert_eq!(split.command_start, 0);
    }
}
