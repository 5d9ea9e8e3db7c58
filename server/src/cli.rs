use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start the server
    Start,
    /// Print version information
    Version,
    /// Create a user, prompting for the password
    CreateUser {
        username: String,
    },
    /// Send a single SMS notification
    Notify {
        message: String,
    },
}

pub(crate) fn parse() -> Cli {
    Cli::parse()
}
