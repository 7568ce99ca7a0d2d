use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

use crate::{actions::Reply, config::Config, error::Error};

/// The command line interface for the gateway.
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a configuration file
    pub config: Option<PathBuf>,

    /// Overrides the log level of the configuration
    #[arg(long)]
    pub log_level: Option<Level>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Commands available in the command line interface.
#[derive(Subcommand)]
pub enum Commands {
    /// Examples for user convenience.
    #[clap(subcommand)]
    Examples(Examples),
}

/// Helpful examples for users.
#[derive(Subcommand, Clone)]
pub enum Examples {
    /// Show an example of a configuration file's contents.
    Config,

    /// Show an example JSON response to a successful action.
    ValueResponse,

    /// Show an example JSON response to a request which could not be routed.
    ErrorResponse,
}

fn to_json(reply: &Reply) -> Result<String, Error> {
    serde_json::to_string_pretty(reply).map_err(|e| Error::BadConfig(e.to_string()))
}

/// Produce the output of a subcommand.
pub fn handle_command(command: Commands) -> Result<String, Error> {
    match command {
        Commands::Examples(example) => match example {
            Examples::Config => Config::example().serialize_pretty(),
            Examples::ValueResponse => to_json(&Reply::example_value()),
            Examples::ErrorResponse => to_json(&Reply::example_error()),
        },
    }
}
