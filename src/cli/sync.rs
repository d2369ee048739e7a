use anyhow::{bail, Result};
use tracing::info;

use crate::app::App;

use super::args::SyncCliArgs;
use super::stats::display_stats;

pub async fn handle_sync_command(args: SyncCliArgs) -> Result<()> {
    let app = App::build()?;

    if args.once {
        info!("Running in single-run mode");
        let report = app.run_once().await;
        display_stats(app.store(), 7);

        if report.errors > 0 {
            bail!("Sync completed with {} error(s)", report.errors);
        }
        return Ok(());
    }

    if args.schedule {
        return app.run_scheduled().await;
    }

    bail!("Specify either --once or --schedule. Use --help for more information.")
}
