//! Destination collaborator: the workspace that receives meeting pages
//! and task records.

use anyhow::Result;
use async_trait::async_trait;

use crate::extract::ActionItem;

mod workspace_api;

pub use workspace_api::WorkspaceApiClient;

/// The derived meeting record written to the workspace. Transcript is
/// pre-chunked so no single write exceeds the destination payload limit.
#[derive(Debug, Clone)]
pub struct MeetingArtifact {
    pub title: String,
    pub date: String,
    pub summary: String,
    pub insights: String,
    pub transcript_chunks: Vec<String>,
    pub actions: Vec<ActionItem>,
}

/// A `None` artifact reference signals a non-fatal write failure the
/// orchestrator handles per meeting; transport errors surface as `Err`
/// so the retry layer can see them.
#[async_trait]
pub trait WorkspacePublisher: Send + Sync {
    async fn publish_meeting(&self, artifact: &MeetingArtifact) -> Result<Option<String>>;

    async fn publish_action(
        &self,
        meeting_ref: &str,
        action: &ActionItem,
    ) -> Result<Option<String>>;
}
