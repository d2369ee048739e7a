use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "meetsync")]
#[command(about = "Sync recorded meetings into your workspace", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run a synchronization pass
    Sync(SyncCliArgs),
    /// Show synchronization history and statistics
    Stats(StatsCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct SyncCliArgs {
    /// Process meetings once and exit
    #[arg(long, conflicts_with = "schedule")]
    pub once: bool,
    /// Keep running, repeating the sync on the configured interval
    #[arg(long)]
    pub schedule: bool,
}

#[derive(ClapArgs, Debug)]
pub struct StatsCliArgs {
    /// How many days of sessions and errors to show
    #[arg(short, long, default_value = "7")]
    pub days: i64,
}
