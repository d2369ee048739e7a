mod args;
mod stats;
mod sync;

pub use args::{Cli, CliCommand, StatsCliArgs, SyncCliArgs};
pub use stats::{display_stats, handle_stats_command};
pub use sync::handle_sync_command;
