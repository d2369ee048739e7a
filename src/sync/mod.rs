//! The synchronization engine: one run turns a batch of candidate
//! meetings into destination writes under rate-limit and retry
//! discipline, with per-meeting error isolation and session accounting.

mod chunk;
mod orchestrator;

pub use chunk::split_transcript;
pub use orchestrator::{merge_actions, RunReport, SyncOrchestrator};
