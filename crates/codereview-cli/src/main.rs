//! Code review CLI entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use codereview_cli::cli::Cli;
use codereview_cli::commands;

fn main() {
    // Load .env.local if it exists (CODEREVIEW_STATE_DIR, CODEREVIEW_USER)
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    fmt().with_env_filter(filter).with_target(false).init();

    let state_dir = cli.state_dir();
    let user = cli.user.clone();

    if let Err(e) = commands::execute(cli.command, &state_dir, user.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
