//! CLI argument parsing for callsift

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "callsift")]
#[command(version)]
#[command(about = "First-call function tracing core and coverage reporter", long_about = None)]
pub struct Cli {
    /// Enable debug logging to stderr (honors RUST_LOG)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate coverage reports from call logs
    Report {
        /// Directory of .log files, or a comma-separated list of log files
        #[arg(value_name = "LOGDIR|LOG1,LOG2")]
        logs: String,

        /// Comma-separated list of formats: html,xml,txt,json
        #[arg(value_name = "FORMATS")]
        formats: String,

        /// Output directory for report files
        #[arg(long, value_name = "DIR", default_value = ".")]
        outdir: PathBuf,
    },

    /// Print the symbol names that would be traced (reads stdin when no names are given)
    Filter {
        /// Symbol names to check
        names: Vec<String>,

        /// Print every name with its verdict instead of only relevant ones
        #[arg(long)]
        explain: bool,
    },

    /// Print the effective tracer configuration (file + environment)
    Config {
        /// Tracer configuration file (TOML)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}
