use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use super::{MeetingArtifact, WorkspacePublisher};
use crate::extract::ActionItem;

/// Hard limit on a single rich-text block accepted by the workspace API.
const MAX_BLOCK_SIZE: usize = 2000;

/// HTTP client for the workspace REST API, writing into two databases:
/// one for meeting pages, one for task pages.
pub struct WorkspaceApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    meetings_db: String,
    tasks_db: String,
}

impl WorkspaceApiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        meetings_db: impl Into<String>,
        tasks_db: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        info!("Initialized workspace client with endpoint: {}", base_url);

        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            meetings_db: meetings_db.into(),
            tasks_db: tasks_db.into(),
        }
    }

    async fn create_page(&self, payload: Value) -> Result<Option<String>> {
        let url = format!("{}/pages", self.base_url);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to send request to workspace API")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read workspace response body")?;

        if !status.is_success() {
            anyhow::bail!(
                "Workspace API request failed with status {}: {}",
                status,
                body
            );
        }

        let parsed: Value =
            serde_json::from_str(&body).context("Failed to parse workspace response")?;

        match parsed.get("id").and_then(Value::as_str) {
            Some(id) => Ok(Some(id.to_string())),
            None => {
                error!("Workspace accepted the page but returned no identifier");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl WorkspacePublisher for WorkspaceApiClient {
    async fn publish_meeting(&self, artifact: &MeetingArtifact) -> Result<Option<String>> {
        let mut children = vec![
            heading_block("Meeting Summary"),
            paragraph_block(&artifact.summary),
            divider_block(),
            heading_block("Action Items"),
        ];

        if artifact.actions.is_empty() {
            children.push(paragraph_block(
                "No action items were identified for this meeting.",
            ));
        } else {
            for action in &artifact.actions {
                let due = action
                    .due_date
                    .as_deref()
                    .map(|d| format!(" (Due: {})", d))
                    .unwrap_or_default();
                for chunk in clamp_blocks(&format!(
                    "{} - Assigned to: {}{}",
                    action.text, action.owner, due
                )) {
                    children.push(to_do_block(&chunk));
                }
            }
        }

        children.push(divider_block());
        children.push(heading_block("Insights"));
        for line in artifact.insights.split('\n').filter(|l| !l.trim().is_empty()) {
            for chunk in clamp_blocks(line) {
                children.push(paragraph_block(&chunk));
            }
        }

        children.push(divider_block());
        children.push(heading_block("Transcript"));
        for chunk in &artifact.transcript_chunks {
            for sub in clamp_blocks(chunk) {
                children.push(paragraph_block(&sub));
            }
        }

        let payload = json!({
            "parent": {"database_id": self.meetings_db},
            "properties": {
                "Name": {"title": [{"text": {"content": clamp_blocks(&artifact.title).into_iter().next().unwrap_or_default()}}]},
                "Date": {"date": {"start": artifact.date}},
            },
            "children": children,
        });

        let page_id = self.create_page(payload).await?;
        if let Some(id) = &page_id {
            info!("Created meeting page: {}", id);
        }
        Ok(page_id)
    }

    async fn publish_action(
        &self,
        meeting_ref: &str,
        action: &ActionItem,
    ) -> Result<Option<String>> {
        // Tasks without an explicit due date default to one week out.
        let due_date = action
            .due_date
            .clone()
            .unwrap_or_else(|| (Utc::now() + Duration::days(7)).format("%Y-%m-%d").to_string());

        let description = action.origin_note.clone().unwrap_or_default();

        let payload = json!({
            "parent": {"database_id": self.tasks_db},
            "properties": {
                "Name": {"title": [{"text": {"content": clamp_blocks(&action.text).into_iter().next().unwrap_or_default()}}]},
                "Owner": {"rich_text": [{"text": {"content": action.owner}}]},
                "Due Date": {"date": {"start": due_date}},
                "Status": {"select": {"name": "Not Started"}},
                "Meeting": {"relation": [{"id": meeting_ref}]},
            },
            "children": if description.is_empty() {
                Vec::new()
            } else {
                vec![paragraph_block(&description)]
            },
        });

        let task_id = self.create_page(payload).await?;
        if let Some(id) = &task_id {
            debug!("Created task page: {}", id);
        }
        Ok(task_id)
    }
}

/// Split `text` into pieces the block API will accept, measured in code
/// points. Empty input produces no blocks.
fn clamp_blocks(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(MAX_BLOCK_SIZE)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn heading_block(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "heading_1",
        "heading_1": {"rich_text": [{"type": "text", "text": {"content": text}}]},
    })
}

fn paragraph_block(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": {"rich_text": [{"type": "text", "text": {"content": text}}]},
    })
}

fn to_do_block(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "to_do",
        "to_do": {"rich_text": [{"type": "text", "text": {"content": text}}], "checked": false},
    })
}

fn divider_block() -> Value {
    json!({"object": "block", "type": "divider", "divider": {}})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_blocks_empty() {
        assert!(clamp_blocks("").is_empty());
    }

    #[test]
    fn test_clamp_blocks_under_limit() {
        let blocks = clamp_blocks("short");
        assert_eq!(blocks, vec!["short".to_string()]);
    }

    #[test]
    fn test_clamp_blocks_splits_on_code_points() {
        let text = "é".repeat(MAX_BLOCK_SIZE + 10);
        let blocks = clamp_blocks(&text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].chars().count(), MAX_BLOCK_SIZE);
        assert_eq!(blocks[1].chars().count(), 10);
        assert_eq!(blocks.concat(), text);
    }
}
