//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Launch and supervise a project's frontend and backend dev servers.
#[derive(Parser)]
#[command(name = "devlaunch")]
#[command(about = "Launch and supervise local frontend/backend dev servers")]
#[command(version)]
pub struct Cli {
    /// Project root containing package.json
    #[arg(long = "project-dir", env = "DEVLAUNCH_PROJECT_DIR", global = true)]
    pub project_dir: Option<PathBuf>,

    /// Backend directory (defaults to <project-dir>/backend)
    #[arg(long = "backend-dir", env = "DEVLAUNCH_BACKEND_DIR", global = true)]
    pub backend_dir: Option<PathBuf>,

    /// Liveness sweep interval in milliseconds
    #[arg(
        long = "sweep-interval-ms",
        env = "DEVLAUNCH_SWEEP_INTERVAL_MS",
        global = true
    )]
    pub sweep_interval_ms: Option<u64>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
