//! OptiRoute CLI - inspect the solver catalog and plan solves from the shell

mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use optiroute_foundation::SolverRouter;
use optiroute_kernel::config::RouterConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays parseable
    let default_filter = if cli.verbose {
        "optiroute=debug"
    } else {
        "optiroute=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_command_async(cli))
}

async fn run_command_async(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let router = SolverRouter::with_builtin_catalog(config)?;
    let format = cli.output;

    match cli.command {
        Commands::Catalog => commands::catalog::run(&router, format)?,
        Commands::Analyze { file } => commands::analyze::run(&router, &file, format)?,
        Commands::Select { file, preferred } => {
            commands::select::run(&router, &file, preferred.as_deref(), format).await?
        }
        Commands::Probe => commands::probe::run(&router, format).await?,
        Commands::Status { events } => commands::status::run(&router, events, format).await?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RouterConfig> {
    let config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading router config");
            RouterConfig::load(&path.to_string_lossy())?
        }
        None => RouterConfig::from_env()?,
    };
    Ok(config)
}
