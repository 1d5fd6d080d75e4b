//! Command line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Mixing station hardware bridge
#[derive(Parser, Debug)]
#[command(
    name = "mix-station",
    version,
    about = "Scale driver and virtual printer bridge for the paint mixing station."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the scale driver and virtual printer until Ctrl-C (default)
    Run,
    /// List serial ports a scale could be attached to
    Ports,
    /// Parse a spool file and print the recipe as JSON
    Parse {
        /// Spool file written by the mixing software
        file: PathBuf,
    },
    /// Send a captured print job to a virtual printer
    Replay {
        /// Captured print stream
        file: PathBuf,
        /// Printer address
        #[arg(long, env = "REPLAY_ADDR", default_value = "127.0.0.1:9100")]
        addr: String,
    },
}
