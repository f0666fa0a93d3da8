//! CLI entry point - the composition root.
//!
//! Parses arguments, wires the supervisor via bootstrap, and dispatches to
//! handlers. Errors are mapped to exit codes here and nowhere else.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use devlaunch_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

/// Diagnostics go to stderr; supervisor events are printed by the handlers.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::from_cli(&cli)?;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = bootstrap(&config)?;

    match command {
        Commands::Up => handlers::up::execute(&ctx).await?,
        Commands::Console => handlers::console::execute(&ctx).await?,
        Commands::Status { json } => handlers::status::execute(&ctx, json).await?,
        Commands::Url { role } => handlers::url::execute(&ctx, role).await?,
        Commands::Clean => handlers::clean::execute(&ctx).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before parsing so env-backed flags see it
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}
