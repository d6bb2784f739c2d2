// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand};

use chief::command;

/// Command-line client for Chief Tools.
#[derive(Parser)]
#[command(name = "chief", version, about)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CHIEF_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage authentication with a Chief Tools account
    #[command(subcommand)]
    Auth(command::auth::AuthCommand),

    /// Manage domains through Domain Chief
    #[command(subcommand)]
    Domain(command::domain::DomainCommand),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(&cli.log_level);

    let code = match cli.command {
        Commands::Auth(command) => command::auth::run(command).await,
        Commands::Domain(command) => command::domain::run(command).await,
    };

    std::process::exit(code);
}

fn init_tracing(level: &str) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
