use anyhow::Result;
use clap::Parser;
use meetsync::cli::{handle_stats_command, handle_sync_command, Cli, CliCommand};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        CliCommand::Version => {
            println!("meetsync {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliCommand::Stats(args) => handle_stats_command(args),
        CliCommand::Sync(args) => handle_sync_command(args).await,
    }
}
