use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

pub fn parse() -> Cli {
    Cli::parse()
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Turn console logging on
    #[arg(short, long)]
    pub console: bool,

    /// Log to a file
    #[arg(short, long, value_name = "FILE", default_value = "shades.log")]
    pub log_file: PathBuf,

    /// Verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the mobile sensors until interrupted
    Run {
        /// Print the sensor readings as JSON once ready and exit
        #[arg(long)]
        once: bool,

        /// Override the poll interval
        #[arg(short, long, value_name = "SECS")]
        poll_secs: Option<u64>,
    },

    /// Create or update the sensor data schema on the shades database
    Migrate {},
}
