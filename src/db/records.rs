/// A processed-meeting record: durable proof that a meeting was synced.
#[derive(Debug, Clone)]
pub struct ProcessedMeeting {
    pub meeting_id: String,
    pub title: Option<String>,
    pub meeting_date: Option<String>,
    pub processed_at: String,
    pub destination_ref: Option<String>,
    pub action_count: i64,
    pub status: String,
}

/// One sync session's aggregate statistics. `sync_end` is null while the
/// session is in flight.
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub sync_id: i64,
    pub sync_start: String,
    pub sync_end: Option<String>,
    pub meetings_processed: i64,
    pub actions_created: i64,
    pub errors_encountered: i64,
}

/// One entry from the append-only error audit trail, joined with the
/// meeting title when the meeting was recorded.
#[derive(Debug, Clone)]
pub struct SyncErrorRecord {
    pub error_id: i64,
    pub sync_id: Option<i64>,
    pub meeting_id: String,
    pub error_type: String,
    pub error_message: String,
    pub error_time: String,
    pub meeting_title: Option<String>,
}

/// All-time totals across the store.
#[derive(Debug, Clone, Default)]
pub struct TotalCounts {
    pub total_meetings: i64,
    pub total_actions: i64,
    pub total_errors: i64,
    pub total_syncs: i64,
}
