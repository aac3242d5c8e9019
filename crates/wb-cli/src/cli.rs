//! Command-line grammar for `wb`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use wb_config::SessionName;

use crate::output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "wb",
    version,
    about = "Drive a persistent browser session from the shell",
    propagate_version = true
)]
pub(crate) struct Cli {
    /// Session to operate on.
    #[arg(long, short = 's', global = true, default_value_t = SessionName::default())]
    pub(crate) session: SessionName,
    /// Output format; `auto` prints human output on a terminal and JSON otherwise.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Auto)]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum CliCommand {
    /// Manage sessions.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Seconds since the session started.
    Runtime,
    /// Print a window of the current tab's content.
    Dump(DumpArgs),
    /// Navigate the current tab.
    Go {
        /// Destination URL.
        url: String,
    },
    /// Carry out natural-language instructions on the current tab.
    Interact {
        /// Instructions; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        instructions: Vec<String>,
    },
    /// Manage tabs.
    Tab {
        #[command(subcommand)]
        action: TabAction,
    },
    /// Record the current tab's network traffic.
    Network {
        #[command(subcommand)]
        action: NetworkAction,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum SessionAction {
    /// List sessions and whether their daemon is running.
    List,
    /// Start a session's daemon if it is not already running.
    Create {
        /// Session name; defaults to `--session`.
        name: Option<SessionName>,
        /// Launch the browser headed.
        #[arg(long)]
        debug: bool,
        /// JSON file holding an array of cookies to inject once ready.
        #[arg(long, value_name = "FILE")]
        cookies: Option<PathBuf>,
    },
    /// Stop a session's daemon and remove its directory.
    Delete {
        /// Session name; defaults to `--session`.
        name: Option<SessionName>,
    },
}

#[derive(Debug, Args)]
pub(crate) struct DumpArgs {
    /// Dump raw HTML instead of text.
    #[arg(long)]
    pub(crate) html: bool,
    /// Character offset of the window.
    #[arg(long, short = 'o', default_value_t = 0)]
    pub(crate) offset: usize,
}

#[derive(Debug, Subcommand)]
pub(crate) enum TabAction {
    /// Open a tab.
    New {
        /// Tab name.
        name: String,
        /// Initial URL.
        url: String,
    },
    /// Close a tab.
    Close {
        /// Tab name.
        name: String,
    },
    /// List open tabs.
    List,
    /// Show the current tab.
    Current,
    /// Make a tab current.
    SetCurrent {
        /// Tab name.
        name: String,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub(crate) enum NetworkAction {
    /// Start recording, discarding any previous log.
    Start,
    /// Stop recording and print the log.
    Stop,
}
