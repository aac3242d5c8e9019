//! Translation of parsed arguments into the work the CLI performs.

use std::path::PathBuf;

use wb_config::SessionName;
use wb_protocol::SessionRequest;

use crate::cli::{Cli, CliCommand, NetworkAction, SessionAction, TabAction};

/// What one invocation of `wb` does.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Invocation {
    ListSessions,
    CreateSession {
        session: SessionName,
        debug: bool,
        cookies: Option<PathBuf>,
    },
    DeleteSession {
        session: SessionName,
    },
    /// Send one request to the session's daemon, starting it when needed.
    Request {
        session: SessionName,
        request: SessionRequest,
    },
}

impl From<Cli> for Invocation {
    fn from(cli: Cli) -> Self {
        let session = cli.session;
        let request = match cli.command {
            CliCommand::Session { action } => {
                return match action {
                    SessionAction::List => Self::ListSessions,
                    SessionAction::Create {
                        name,
                        debug,
                        cookies,
                    } => Self::CreateSession {
                        session: name.unwrap_or(session),
                        debug,
                        cookies,
                    },
                    SessionAction::Delete { name } => Self::DeleteSession {
                        session: name.unwrap_or(session),
                    },
                };
            }
            CliCommand::Runtime => SessionRequest::RuntimeSeconds,
            CliCommand::Dump(args) => SessionRequest::Dump {
                html: args.html,
                offset: args.offset,
            },
            CliCommand::Go { url } => SessionRequest::Go { url },
            CliCommand::Interact { instructions } => SessionRequest::Interact {
                instructions: instructions.join(" "),
            },
            CliCommand::Tab { action } => match action {
                TabAction::New { name, url } => SessionRequest::NewTab {
                    tab_name: name,
                    url,
                },
                TabAction::Close { name } => SessionRequest::CloseTab { tab_name: name },
                TabAction::List => SessionRequest::ListTabs,
                TabAction::Current => SessionRequest::GetCurrentTab,
                TabAction::SetCurrent { name } => SessionRequest::SetCurrentTab { tab_name: name },
            },
            CliCommand::Network { action } => match action {
                NetworkAction::Start => SessionRequest::StartNetworkRecord,
                NetworkAction::Stop => SessionRequest::StopNetworkRecord,
            },
        };
        Self::Request { session, request }
    }
}
