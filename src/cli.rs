use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum Command {
    /// live timeline (default)
    Timeline,
    /// compose a post in $EDITOR
    Post,
    /// print notifications
    Notifications,
    /// list the available interface languages
    Languages,
    /// end the server session
    Logout,
}

#[derive(Parser, Debug, Default)]
#[command(about = concat!(env!("CARGO_CRATE_NAME"), " - terminal client for the connect social network"))]
pub struct Flags {
    /// what to do
    #[arg(default_value = None)]
    pub command: Option<Command>,

    /// config file (defaults to <config dir>/connectui/config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// force the interface language, e.g. "fr"
    #[arg(long, value_name = "CODE")]
    pub locale: Option<String>,
}

impl Flags {
    /// Parse from `std::env::args_os()`, [exit][clap::Error::exit] on error.
    pub fn from_args() -> Self {
        Self::parse()
    }

    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Timeline)
    }
}
