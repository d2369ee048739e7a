//! Wiring: build the collaborators from config and drive the run modes.

use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

use crate::config::Config;
use crate::db::StateStore;
use crate::global;
use crate::limit::{RateLimitedInvoker, RateLimiter, RetryPolicy};
use crate::publish::WorkspaceApiClient;
use crate::source::ProviderApiClient;
use crate::sync::{RunReport, SyncOrchestrator};

pub struct App {
    store: Arc<StateStore>,
    orchestrator: SyncOrchestrator,
    schedule_interval: Duration,
}

impl App {
    pub fn build() -> Result<Self> {
        let config = Config::load()?;

        let Some(source_key) = config.source.api_key.clone() else {
            bail!(
                "Missing provider API key: set source.api_key in the config \
                 or the MEETSYNC_SOURCE_API_KEY environment variable"
            );
        };
        let Some(workspace_key) = config.workspace.api_key.clone() else {
            bail!(
                "Missing workspace API key: set workspace.api_key in the config \
                 or the MEETSYNC_WORKSPACE_API_KEY environment variable"
            );
        };
        if config.workspace.meetings_db.is_empty() || config.workspace.tasks_db.is_empty() {
            bail!("Workspace database ids are not configured (workspace.meetings_db, workspace.tasks_db)");
        }

        let store = Arc::new(StateStore::open(global::db_file()?)?);

        let source = Arc::new(ProviderApiClient::new(
            config.source.api_endpoint.clone(),
            source_key,
        ));
        let workspace = Arc::new(WorkspaceApiClient::new(
            config.workspace.api_endpoint.clone(),
            workspace_key,
            config.workspace.meetings_db.clone(),
            config.workspace.tasks_db.clone(),
        ));

        let limiter = Arc::new(RateLimiter::new(
            config.limits.rate_limit_calls,
            Duration::from_millis(config.limits.rate_limit_window_ms),
        ));
        let invoker = RateLimitedInvoker::new(
            limiter,
            RetryPolicy::new(
                config.limits.retry_attempts,
                Duration::from_secs(config.limits.retry_base_delay_secs),
                Duration::from_secs(config.limits.retry_max_delay_secs),
            ),
        );

        let schedule_interval =
            Duration::from_secs(config.sync.schedule_interval_hours * 60 * 60);
        let orchestrator =
            SyncOrchestrator::new(source, workspace, store.clone(), invoker, config.sync);

        Ok(Self {
            store,
            orchestrator,
            schedule_interval,
        })
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub async fn run_once(&self) -> RunReport {
        self.orchestrator.run_once().await
    }

    /// Run immediately, then repeat on the configured interval. Ctrl-C is
    /// honored between ticks; a run in progress finishes first.
    pub async fn run_scheduled(&self) -> Result<()> {
        info!(
            "Running in scheduled mode (every {} hours)",
            self.schedule_interval.as_secs() / 3600
        );

        loop {
            self.run_once().await;

            tokio::select! {
                _ = sleep(self.schedule_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, exiting scheduling loop");
                    return Ok(());
                }
            }
        }
    }
}
