//! CLI argument definitions using clap

use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// OptiRoute - pick the right optimization backend for a problem
#[derive(Parser)]
#[command(name = "optiroute")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short = 'o', long, global = true, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Router configuration file (yaml, toml, json, ini, ron, json5)
    #[arg(short = 'c', long, global = true, env = "OPTIROUTE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the built-in solver catalog
    Catalog,

    /// Derive problem characteristics from a JSON problem spec
    Analyze {
        /// Problem spec file
        file: PathBuf,
    },

    /// Probe backends, then select a solver and synthesize its parameters
    Select {
        /// Problem spec file
        file: PathBuf,

        /// Try this solver first if it is usable
        #[arg(short, long)]
        preferred: Option<String>,
    },

    /// Probe every registered backend and print availability
    Probe,

    /// Show breaker states, health and the current degradation level
    Status {
        /// Number of recent degradation events to include
        #[arg(long, default_value_t = 10)]
        events: usize,
    },
}
