//! Command-line arguments accepted by `wbd`.

use clap::Parser;
use wb_config::SessionName;

use crate::process::DaemonOptions;

/// Browser session daemon.
///
/// Configuration flags such as `--sessions-dir` or `--browser` precede these
/// arguments and are resolved separately.
#[derive(Debug, Parser)]
#[command(name = "wbd", version, about = "Serve one named browser session")]
pub struct DaemonArgs {
    /// Session served by this daemon.
    #[arg(long, default_value_t = SessionName::default())]
    pub session: SessionName,
    /// Show the browser window instead of running headless.
    #[arg(long)]
    pub debug: bool,
}

impl From<DaemonArgs> for DaemonOptions {
    fn from(args: DaemonArgs) -> Self {
        Self {
            session: args.session,
            debug: args.debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_to_the_default_session() {
        let args = DaemonArgs::try_parse_from(["wbd"]).expect("parse");
        let options = DaemonOptions::from(args);
        assert_eq!(options.session.as_str(), "default");
        assert!(!options.debug);
    }

    #[rstest]
    fn accepts_session_and_debug() {
        let args =
            DaemonArgs::try_parse_from(["wbd", "--session", "work", "--debug"]).expect("parse");
        assert_eq!(args.session.as_str(), "work");
        assert!(args.debug);
    }

    #[rstest]
    fn rejects_invalid_session_names() {
        assert!(DaemonArgs::try_parse_from(["wbd", "--session", "../escape"]).is_err());
    }
}
