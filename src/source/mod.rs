//! Source collaborator: the upstream transcription provider.
//!
//! One uniform async contract regardless of how a backend actually gets
//! its data; inherently blocking backends adapt behind the trait instead
//! of branching at call sites.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

mod provider_api;

pub use provider_api::ProviderApiClient;

/// A meeting as listed by the provider. Details are fetched separately.
#[derive(Debug, Clone, Deserialize)]
pub struct MeetingSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

/// Transcript payload: plain text or speaker-tagged segments, depending
/// on the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TranscriptData {
    Text(String),
    Segments(Vec<TranscriptSegment>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptSegment {
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// Insights payload: a single blob or a list of lines.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InsightsData {
    Text(String),
    List(Vec<String>),
}

impl TranscriptData {
    /// Flatten to one newline-joined text, dropping speaker tags.
    pub fn flatten(&self) -> String {
        match self {
            TranscriptData::Text(text) => text.clone(),
            TranscriptData::Segments(segments) => segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl InsightsData {
    pub fn flatten(&self) -> String {
        match self {
            InsightsData::Text(text) => text.clone(),
            InsightsData::List(lines) => lines.join("\n"),
        }
    }
}

/// Everything the provider knows about one meeting. Immutable snapshot,
/// fetched once per run.
#[derive(Debug, Clone, Deserialize)]
pub struct MeetingDetails {
    pub transcript: Option<TranscriptData>,
    #[serde(default)]
    pub summary: Option<String>,
    pub insights: Option<InsightsData>,
    #[serde(default)]
    pub action_items: Vec<String>,
}

#[async_trait]
pub trait MeetingSource: Send + Sync {
    async fn list_meetings(&self, limit: usize) -> Result<Vec<MeetingSummary>>;

    async fn meeting_details(&self, meeting_id: &str) -> Result<MeetingDetails>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_flatten_segments() {
        let transcript = TranscriptData::Segments(vec![
            TranscriptSegment {
                speaker: Some("Alice".to_string()),
                text: "Morning everyone".to_string(),
            },
            TranscriptSegment {
                speaker: None,
                text: "Let's get started".to_string(),
            },
        ]);
        assert_eq!(transcript.flatten(), "Morning everyone\nLet's get started");
    }

    #[test]
    fn test_insights_flatten_list() {
        let insights = InsightsData::List(vec!["One".to_string(), "Two".to_string()]);
        assert_eq!(insights.flatten(), "One\nTwo");
    }

    #[test]
    fn test_details_deserialize_both_shapes() {
        let as_text: MeetingDetails = serde_json::from_str(
            r#"{"transcript": "raw text", "summary": "s", "insights": "i", "action_items": ["a"]}"#,
        )
        .unwrap();
        assert_eq!(as_text.transcript.unwrap().flatten(), "raw text");

        let as_segments: MeetingDetails = serde_json::from_str(
            r#"{"transcript": [{"speaker": "A", "text": "hello"}], "insights": ["x", "y"]}"#,
        )
        .unwrap();
        assert_eq!(as_segments.transcript.unwrap().flatten(), "hello");
        assert_eq!(as_segments.insights.unwrap().flatten(), "x\ny");
        assert!(as_segments.summary.is_none());
    }
}
