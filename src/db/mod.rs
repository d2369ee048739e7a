//! Durable sync state: processed meetings, sessions, and the error audit
//! trail. The store is the idempotency authority; everything else holds
//! meeting data only in memory.

mod records;
mod store;

pub use records::{ProcessedMeeting, SessionStats, SyncErrorRecord, TotalCounts};
pub use store::{StateStore, StatusUpdate};
