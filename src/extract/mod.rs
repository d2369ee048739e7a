//! Heuristic action-item extraction from transcript text.
//!
//! Pattern-based, not semantic: an ordered set of regexes flags
//! action-like sentences and an ignore-list suppresses common false
//! positives. Distinct overlapping captures from different patterns are
//! all emitted; cross-source dedup is the sync merge step's job.

use regex::Regex;
use tracing::debug;

/// A discrete task pulled out of a meeting, either by the provider or by
/// the detector. Lives in memory only until published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionItem {
    pub text: String,
    pub owner: String,
    pub due_date: Option<String>,
    /// Present when the transcript named a different assignee than the
    /// configured owner the item was reassigned to.
    pub origin_note: Option<String>,
}

impl ActionItem {
    pub fn new(text: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            owner: owner.into(),
            due_date: None,
            origin_note: None,
        }
    }
}

/// Detects action items in free text using ordered heuristic patterns.
pub struct ActionItemDetector {
    default_owner: String,
    action_patterns: Vec<Regex>,
    ignore_patterns: Vec<Regex>,
}

const MIN_ACTION_LEN: usize = 5;

impl ActionItemDetector {
    /// The detector reassigns every extracted item to `default_owner`;
    /// a transcript-named assignee is preserved in the origin note.
    pub fn new(default_owner: impl Into<String>) -> Self {
        let action_patterns = [
            // Explicit markers: "action item 3: ...", "task - ...", "to-do ..."
            r"(?i)(?:action item|task|to-?do|action)(?:\s*\d+)?(?:\s*:|\s*-|\s*\*|\s+is|\s+for)?\s*([^.!?]+)[.!?]",
            r"(?i)(?:need|needs)\s+to\s+([^.!?]+)[.!?]",
            r"(?i)(?:should|must|will|shall)\s+([^.!?]+)[.!?]",
            // Owner-carrying forms ("@sarah needs to", "John has to");
            // the named owner lands in the origin note.
            r"(?i)@?([A-Za-z]\w+)[,\s]+(?:needs?|has)\s+to\s+([^.!?]+)[.!?]",
            r"(?i)(?:assigned|assign)\s+to\s+(\w+)[,\s:]?\s*([^.!?]+)[.!?]",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("invalid action pattern"))
        .collect();

        let ignore_patterns = [
            r"(?i)^I need",
            r"(?i)^We need",
            r"(?i)^They need",
            r"(?i)^not an action",
            r"(?i)^no action",
            r"(?i)^future action",
            r"(?i)^action required$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("invalid ignore pattern"))
        .collect();

        Self {
            default_owner: default_owner.into(),
            action_patterns,
            ignore_patterns,
        }
    }

    /// Scan `text` for action items. Empty input yields an empty list.
    pub fn detect(&self, text: &str) -> Vec<ActionItem> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut actions: Vec<ActionItem> = Vec::new();

        for paragraph in text.split('\n') {
            if paragraph.trim().is_empty() {
                continue;
            }

            // Patterns stack: a sentence like "John needs to X" matches both
            // the bare "needs to" pattern and the owner-carrying one. An
            // identical captured phrase is emitted once per paragraph; a
            // later owner-carrying match upgrades the note on the first.
            let paragraph_start = actions.len();

            for pattern in &self.action_patterns {
                for caps in pattern.captures_iter(paragraph) {
                    let (action_text, origin_note) = if caps.len() == 2 {
                        (caps[1].trim().to_string(), None)
                    } else {
                        let owner_name = caps[1].trim().to_string();
                        let note = if !owner_name.eq_ignore_ascii_case(&self.default_owner) {
                            Some(format!("Originally assigned to: {}", owner_name))
                        } else {
                            None
                        };
                        (caps[2].trim().to_string(), note)
                    };

                    if action_text.len() < MIN_ACTION_LEN {
                        continue;
                    }

                    if self
                        .ignore_patterns
                        .iter()
                        .any(|ignore| ignore.is_match(&action_text))
                    {
                        continue;
                    }

                    let key = action_text.to_lowercase();
                    if let Some(existing) = actions[paragraph_start..]
                        .iter_mut()
                        .find(|a| a.text.to_lowercase() == key)
                    {
                        if existing.origin_note.is_none() {
                            existing.origin_note = origin_note;
                        }
                        continue;
                    }

                    actions.push(ActionItem {
                        text: action_text,
                        owner: self.default_owner.clone(),
                        due_date: None,
                        origin_note,
                    });
                }
            }
        }

        debug!("Detected {} action items in text", actions.len());
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ActionItemDetector {
        ActionItemDetector::new("Brian")
    }

    #[test]
    fn test_empty_input() {
        assert!(detector().detect("").is_empty());
    }

    #[test]
    fn test_named_assignee_reassigned_with_note() {
        let actions = detector().detect("John needs to send the report by Friday.");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].owner, "Brian");
        assert_eq!(actions[0].text, "send the report by Friday");
        assert_eq!(
            actions[0].origin_note.as_deref(),
            Some("Originally assigned to: John")
        );
    }

    #[test]
    fn test_default_owner_gets_no_origin_note() {
        let actions = detector().detect("@brian needs to review the budget numbers.");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].owner, "Brian");
        assert!(actions[0].origin_note.is_none());
    }

    #[test]
    fn test_explicit_action_marker() {
        let actions = detector().detect("Action item: schedule the follow-up call.");
        assert!(actions
            .iter()
            .any(|a| a.text == "schedule the follow-up call"));
    }

    #[test]
    fn test_assigned_to_captures_owner() {
        let actions = detector().detect("Assigned to Sarah: prepare the quarterly deck.");
        let item = actions
            .iter()
            .find(|a| a.origin_note.is_some())
            .expect("expected owner-carrying match");
        assert_eq!(item.owner, "Brian");
        assert_eq!(
            item.origin_note.as_deref(),
            Some("Originally assigned to: Sarah")
        );
    }

    #[test]
    fn test_short_candidates_discarded() {
        // "go" is under the minimum candidate length
        let actions = detector().detect("We will go.");
        assert!(actions.is_empty());
    }

    #[test]
    fn test_ignore_list_suppresses() {
        let actions = detector().detect("Action item: no action needed here.");
        assert!(actions.is_empty());
    }

    #[test]
    fn test_multiple_paragraphs() {
        let text = "Alice should draft the proposal today.\n\nTeam must finalize the vendor list.";
        let actions = detector().detect(text);
        assert!(actions.len() >= 2);
        assert!(actions.iter().all(|a| a.owner == "Brian"));
    }

    #[test]
    fn test_distinct_overlapping_captures_kept() {
        // Matches both the explicit-marker pattern and "should", with
        // different captured phrases; both are emitted.
        let actions = detector().detect("Task: we should update the onboarding doc.");
        assert!(actions.len() >= 2);
    }
}
