//! Transcript chunking for bounded destination writes.
//!
//! Chunks are measured in code points and concatenate back to the exact
//! original text: nothing dropped, nothing injected. Splits prefer the
//! last whitespace inside the window so words stay intact when possible.

/// Split `text` into chunks of at most `max_chars` code points.
pub fn split_transcript(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let window_end = (start + max_chars).min(chars.len());

        let split = if window_end < chars.len() {
            // Break after the last whitespace in the window; hard-split
            // mid-word only when the window holds none.
            chars[start..window_end]
                .iter()
                .rposition(|c| c.is_whitespace())
                .map(|i| start + i + 1)
                .unwrap_or(window_end)
        } else {
            window_end
        };

        chunks.push(chars[start..split].iter().collect());
        start = split;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_round_trip(text: &str, max: usize) {
        let chunks = split_transcript(text, max);
        assert_eq!(chunks.concat(), text);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= max);
        }
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(split_transcript("", 100).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = split_transcript("hello world", 100);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_splits_at_word_boundary() {
        let chunks = split_transcript("alpha beta gamma", 12);
        assert_eq!(chunks[0], "alpha beta ");
        assert_eq!(chunks[1], "gamma");
        assert_round_trip("alpha beta gamma", 12);
    }

    #[test]
    fn test_hard_split_without_whitespace() {
        let text = "a".repeat(25);
        let chunks = split_transcript(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert_round_trip(&text, 10);
    }

    #[test]
    fn test_round_trip_multibyte() {
        let text = "résumé déjà vu — ".repeat(50);
        assert_round_trip(&text, 16);
    }

    #[test]
    fn test_round_trip_newlines_preserved() {
        let text = "Speaker one says things.\nSpeaker two replies.\n\nLong pause.";
        assert_round_trip(text, 20);
    }

    #[test]
    fn test_max_of_one() {
        assert_round_trip("ab cd", 1);
    }
}
