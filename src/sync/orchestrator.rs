use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use super::chunk::split_transcript;
use crate::config::SyncConfig;
use crate::db::StateStore;
use crate::extract::{ActionItem, ActionItemDetector};
use crate::limit::RateLimitedInvoker;
use crate::publish::{MeetingArtifact, WorkspacePublisher};
use crate::source::{MeetingSource, MeetingSummary};

/// Placeholder used when detail fields cannot be retrieved; the meeting
/// still publishes rather than aborting.
const NOT_PROVIDED: &str = "Not provided";

/// Aggregate counts for one run, mirrored into the session row.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub meetings_processed: i64,
    pub actions_created: i64,
    pub errors: i64,
}

/// Why one meeting's sub-flow stopped. The kind tags the error audit row.
#[derive(Debug, Error)]
#[error("{message}")]
struct MeetingFailure {
    kind: &'static str,
    message: String,
}

impl MeetingFailure {
    fn destination_write(message: impl Into<String>) -> Self {
        Self {
            kind: "destination_write_failure",
            message: message.into(),
        }
    }
}

/// Drives one synchronization run: list, filter, process each meeting,
/// record outcomes. A single meeting's failure never aborts the run, and
/// the session row is closed from every exit path.
pub struct SyncOrchestrator {
    source: Arc<dyn MeetingSource>,
    workspace: Arc<dyn WorkspacePublisher>,
    store: Arc<StateStore>,
    detector: ActionItemDetector,
    invoker: RateLimitedInvoker,
    settings: SyncConfig,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn MeetingSource>,
        workspace: Arc<dyn WorkspacePublisher>,
        store: Arc<StateStore>,
        invoker: RateLimitedInvoker,
        settings: SyncConfig,
    ) -> Self {
        let detector = ActionItemDetector::new(settings.default_owner.clone());
        Self {
            source,
            workspace,
            store,
            detector,
            invoker,
            settings,
        }
    }

    /// Execute one full run and return its accounting. Failures inside
    /// the run are absorbed into the report; the session is always closed.
    pub async fn run_once(&self) -> RunReport {
        info!("Starting meeting sync");

        let sync_id = self.store.start_session();
        let mut report = RunReport::default();

        if let Err(e) = self.run_session(sync_id, &mut report).await {
            error!("Sync run failed: {:#}", e);
            report.errors += 1;
            self.store
                .log_error(sync_id, "sync_session", "run_error", &format!("{:#}", e));
        }

        self.store.end_session(
            sync_id,
            report.meetings_processed,
            report.actions_created,
            report.errors,
        );
        info!(
            "Sync session completed: {} meetings processed, {} actions created, {} errors",
            report.meetings_processed, report.actions_created, report.errors
        );

        report
    }

    async fn run_session(&self, sync_id: Option<i64>, report: &mut RunReport) -> Result<()> {
        let limit = self.settings.max_meetings;
        let meetings = self
            .invoker
            .invoke("list meetings", || self.source.list_meetings(limit))
            .await?;
        info!("Retrieved {} candidate meetings", meetings.len());

        let unprocessed: Vec<MeetingSummary> = meetings
            .into_iter()
            .filter(|m| !self.store.is_processed(&m.id))
            .collect();
        info!("Found {} unprocessed meetings", unprocessed.len());

        for meeting in &unprocessed {
            info!("Processing meeting: {} ({})", meeting.title, meeting.id);

            match self.process_meeting(meeting).await {
                Ok(actions_created) => {
                    report.meetings_processed += 1;
                    report.actions_created += actions_created;
                    info!("Successfully processed meeting: {}", meeting.title);
                }
                Err(failure) => {
                    report.errors += 1;
                    warn!("Failed to process meeting {}: {}", meeting.title, failure);
                    self.store
                        .log_error(sync_id, &meeting.id, failure.kind, &failure.message);
                }
            }
        }

        Ok(())
    }

    /// One meeting's sub-flow: fetch details, extract, merge, publish,
    /// record. Returns the number of action artifacts created.
    async fn process_meeting(&self, meeting: &MeetingSummary) -> Result<i64, MeetingFailure> {
        // Detail fetch failures degrade to placeholders instead of
        // aborting the meeting.
        let details = match self
            .invoker
            .invoke("fetch meeting details", || {
                self.source.meeting_details(&meeting.id)
            })
            .await
        {
            Ok(details) => Some(details),
            Err(e) => {
                warn!(
                    "Could not fetch details for meeting {}: {:#}",
                    meeting.id, e
                );
                None
            }
        };

        let (transcript, summary, insights, provider_actions) = match details {
            Some(d) => (
                d.transcript
                    .map(|t| t.flatten())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| NOT_PROVIDED.to_string()),
                d.summary.unwrap_or_else(|| NOT_PROVIDED.to_string()),
                d.insights
                    .map(|i| i.flatten())
                    .filter(|i| !i.is_empty())
                    .unwrap_or_else(|| NOT_PROVIDED.to_string()),
                d.action_items
                    .into_iter()
                    .map(|text| ActionItem::new(text, self.settings.default_owner.clone()))
                    .collect(),
            ),
            None => (
                NOT_PROVIDED.to_string(),
                NOT_PROVIDED.to_string(),
                NOT_PROVIDED.to_string(),
                Vec::new(),
            ),
        };
        info!(
            "Retrieved transcript: {} characters, {} provider action items",
            transcript.len(),
            provider_actions.len()
        );

        let extracted = self.detector.detect(&transcript);
        info!("Detected {} action items in transcript", extracted.len());

        let actions = merge_actions(provider_actions, extracted);
        info!("Total unique action items: {}", actions.len());

        let transcript_chunks = split_transcript(&transcript, self.settings.chunk_size);
        info!("Split transcript into {} chunks", transcript_chunks.len());

        let artifact = MeetingArtifact {
            title: format!("{} - {} {}", meeting.title, meeting.date, meeting.time),
            date: meeting.date.clone(),
            summary,
            insights,
            transcript_chunks,
            actions: actions.clone(),
        };

        let page_id = match self
            .invoker
            .invoke("publish meeting page", || {
                self.workspace.publish_meeting(&artifact)
            })
            .await
        {
            Ok(Some(id)) => id,
            // The meeting is deliberately NOT marked processed on a write
            // failure, so the next run retries it.
            Ok(None) => {
                return Err(MeetingFailure::destination_write(
                    "publish returned no artifact reference",
                ))
            }
            Err(e) => return Err(MeetingFailure::destination_write(format!("{:#}", e))),
        };
        info!("Created meeting page: {}", page_id);

        let mut actions_created = 0;
        for action in &actions {
            match self
                .invoker
                .invoke("publish action item", || {
                    self.workspace.publish_action(&page_id, action)
                })
                .await
            {
                Ok(Some(_)) => actions_created += 1,
                Ok(None) => warn!("Workspace rejected action item: {}", action.text),
                Err(e) => warn!("Failed to create action item '{}': {:#}", action.text, e),
            }
        }
        info!(
            "Created {} tasks out of {} action items",
            actions_created,
            actions.len()
        );

        self.store.mark_processed(
            &meeting.id,
            Some(&meeting.title),
            Some(&meeting.date),
            Some(&page_id),
            actions_created,
        );

        Ok(actions_created)
    }
}

/// Merge provider-supplied and extracted action items, provider first.
/// Duplicates are dropped on a trimmed, case-folded text key, so the
/// provider's form of an action wins over the extractor's.
pub fn merge_actions(provider: Vec<ActionItem>, extracted: Vec<ActionItem>) -> Vec<ActionItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for action in provider.into_iter().chain(extracted) {
        let key = action.text.trim().to_lowercase();
        if key.is_empty() || !seen.insert(key) {
            continue;
        }
        merged.push(action);
    }

    merged
}
