//! Subcommands and the interactive console's command language.

use std::fmt;
use std::str::FromStr;

use clap::Subcommand;
use devlaunch_core::Role;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Start all servers and stream their output until Ctrl-C
    Up,

    /// Start all servers and accept commands interactively
    Console,

    /// Probe each role's ports and show where it would be reachable
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the URL a role is (or would be) served on
    Url {
        /// frontend, backend or combined
        role: Role,
    },

    /// Stop leftover node/npm processes listening on the development ports
    Clean,
}

/// One line of console input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start(Role),
    Stop(Role),
    Restart,
    StartAll,
    StopAll,
    Status,
    Url(Role),
    Clean,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Usage lines for `help`.
    pub const USAGE: &'static [(&'static str, &'static str)] = &[
        ("start <role>", "start frontend, backend or combined"),
        ("stop <role>", "stop one role"),
        ("restart", "stop everything, then start everything"),
        ("start-all", "combined launch, falling back to separate servers"),
        ("stop-all", "stop everything and clean up stray listeners"),
        ("status", "show every role"),
        ("url <role>", "resolve a role's URL"),
        ("clean", "stop stray node/npm listeners on the dev ports"),
        ("help", "show this help"),
        ("quit", "stop everything and exit"),
    ];
}

/// Why a console line was not understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleParseError(pub String);

impl fmt::Display for ConsoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConsoleParseError {}

impl FromStr for ConsoleCommand {
    type Err = ConsoleParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(ConsoleParseError("empty command".to_string()));
        };
        let argument = words.next();
        if words.next().is_some() {
            return Err(ConsoleParseError(format!("too many arguments to '{verb}'")));
        }

        let role = |verb: &str| -> Result<Role, ConsoleParseError> {
            let name = argument
                .ok_or_else(|| ConsoleParseError(format!("'{verb}' needs a role")))?;
            name.parse()
                .map_err(|e: devlaunch_core::ParseRoleError| ConsoleParseError(e.to_string()))
        };
        let bare = |command: Self| match argument {
            None => Ok(command),
            Some(_) => Err(ConsoleParseError(format!("'{verb}' takes no arguments"))),
        };

        match verb.to_lowercase().as_str() {
            "start" => role("start").map(Self::Start),
            "stop" => role("stop").map(Self::Stop),
            "url" => role("url").map(Self::Url),
            "restart" => bare(Self::Restart),
            "start-all" | "up" => bare(Self::StartAll),
            "stop-all" | "down" => bare(Self::StopAll),
            "status" | "ps" => bare(Self::Status),
            "clean" => bare(Self::Clean),
            "help" | "?" => bare(Self::Help),
            "quit" | "exit" | "q" => bare(Self::Quit),
            other => Err(ConsoleParseError(format!("unknown command '{other}'"))),
        }
    }
}
