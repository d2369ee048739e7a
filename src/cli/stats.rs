use anyhow::Result;
use chrono::DateTime;

use crate::db::StateStore;
use crate::global;

use super::args::StatsCliArgs;

pub fn handle_stats_command(args: StatsCliArgs) -> Result<()> {
    let store = StateStore::open(global::db_file()?)?;
    display_stats(&store, args.days);
    Ok(())
}

/// Print totals, recent sessions, and recent errors.
pub fn display_stats(store: &StateStore, days: i64) {
    let totals = store.total_counts();
    println!("=== Meeting Sync Statistics ===");
    println!("Total meetings processed: {}", totals.total_meetings);
    println!("Total action items created: {}", totals.total_actions);
    println!("Total errors encountered: {}", totals.total_errors);
    println!("Total sync sessions: {}", totals.total_syncs);

    let sessions = store.session_stats(days);
    if !sessions.is_empty() {
        println!("\nRecent sync sessions (last {} days):", days);
        for session in &sessions {
            match &session.sync_end {
                Some(end) => {
                    let duration = session_minutes(&session.sync_start, end)
                        .map(|m| format!(" in {:.1} minutes", m))
                        .unwrap_or_default();
                    println!(
                        "Session {}: {} - Processed {} meetings{}",
                        session.sync_id, session.sync_start, session.meetings_processed, duration
                    );
                }
                None => {
                    println!(
                        "Session {}: {} - IN PROGRESS",
                        session.sync_id, session.sync_start
                    );
                }
            }
        }
    }

    let errors = store.error_report(days);
    if !errors.is_empty() {
        println!("\nRecent errors (last {} days):", days);
        for error in &errors {
            let title = error
                .meeting_title
                .clone()
                .unwrap_or_else(|| format!("Meeting ID: {}", error.meeting_id));
            println!(
                "{} - {} - {}: {}",
                error.error_time,
                title,
                error.error_type,
                truncate(&error.error_message, 100)
            );
        }
    }
}

fn session_minutes(start: &str, end: &str) -> Option<f64> {
    let start = DateTime::parse_from_rfc3339(start).ok()?;
    let end = DateTime::parse_from_rfc3339(end).ok()?;
    Some((end - start).num_seconds() as f64 / 60.0)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text() {
        assert_eq!(truncate("short", 100), "short");
    }

    #[test]
    fn test_truncate_long_text() {
        let long = "x".repeat(150);
        let shown = truncate(&long, 100);
        assert_eq!(shown.chars().count(), 103);
        assert!(shown.ends_with("..."));
    }

    #[test]
    fn test_session_minutes() {
        let minutes = session_minutes(
            "2026-08-30T10:00:00+00:00",
            "2026-08-30T10:04:30+00:00",
        )
        .unwrap();
        assert!((minutes - 4.5).abs() < f64::EPSILON);
    }
}
