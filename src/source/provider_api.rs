use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{MeetingDetails, MeetingSource, MeetingSummary};

#[derive(Debug, Deserialize)]
struct MeetingListResponse {
    #[serde(default)]
    meetings: Vec<MeetingSummary>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
    code: Option<String>,
}

/// HTTP client for the transcription provider's REST API.
pub struct ProviderApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ProviderApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into();
        info!("Initialized provider client with endpoint: {}", base_url);

        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Failed to send request to provider API")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read provider response body")?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ErrorResponse>(&body) {
                anyhow::bail!(
                    "Provider API error: {} (code: {:?})",
                    err.error.message,
                    err.error.code
                );
            }
            anyhow::bail!("Provider API request failed with status {}: {}", status, body);
        }

        serde_json::from_str(&body).context("Failed to parse provider response")
    }
}

#[async_trait]
impl MeetingSource for ProviderApiClient {
    async fn list_meetings(&self, limit: usize) -> Result<Vec<MeetingSummary>> {
        let url = format!("{}/meetings?limit={}", self.base_url, limit);
        let response: MeetingListResponse = self.get_json(&url).await?;

        info!("Retrieved {} meetings from provider", response.meetings.len());
        Ok(response.meetings)
    }

    async fn meeting_details(&self, meeting_id: &str) -> Result<MeetingDetails> {
        let url = format!("{}/meetings/{}", self.base_url, meeting_id);
        let details: MeetingDetails = self.get_json(&url).await?;

        debug!(
            "Meeting {}: {} provider action items",
            meeting_id,
            details.action_items.len()
        );
        Ok(details)
    }
}
