//! Corpus Chunking
//!
//! Splits raw source text into overlapping fixed-width windows suitable for
//! embedding. Splitting is purely positional, with no sentence or paragraph
//! awareness, which keeps chunk boundaries deterministic and cheap.
//! Windows are measured in characters, not bytes, so multi-byte text never
//! splits inside a code point.

use crate::config::ChunkConfig;

/// Split `text` into overlapping windows.
///
/// The cursor advances by `chunk_size - chunk_overlap` per step and the
/// final partial window is included, so every character of the input is
/// covered and the last chunk ends exactly at the end of the text. Empty
/// input yields an empty vector.
///
/// `config` must satisfy `chunk_overlap < chunk_size`; `ChunkConfig::validate`
/// enforces this before the pipeline runs. Called directly with an invalid
/// overlap the stride is clamped to one character, so the cursor always
/// advances and the call terminates.
pub fn chunk(text: &str, config: &ChunkConfig) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let stride = config
        .chunk_size
        .saturating_sub(config.chunk_overlap)
        .max(1);
    let chunk_size = config.chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start += stride;
    }

    chunks
}

/// Split a plain-text knowledge file into independent entries.
///
/// Entries are separated by a literal `---`; blank entries are dropped and
/// surrounding whitespace is trimmed.
pub fn split_entries(content: &str) -> Vec<String> {
    content
        .split("---")
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkConfig {
        ChunkConfig {
            chunk_size,
            chunk_overlap,
        }
    }

    // =====================================================================
    // chunk() tests
    // =====================================================================

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk("", &config(2000, 200)).is_empty());
    }

    #[test]
    fn short_input_yields_single_chunk() {
        let chunks = chunk("hello", &config(2000, 200));
        assert_eq!(chunks, vec!["hello".to_string()]);
    }

    #[test]
    fn windows_overlap_by_configured_amount() {
        let text = "abcdefghij"; // 10 chars
        let chunks = chunk(text, &config(5, 2));
        // starts at 0, 3, 6, 9
        assert_eq!(chunks, vec!["abcde", "defgh", "ghij", "j"]);
    }

    #[test]
    fn last_chunk_ends_at_text_end() {
        let text: String = std::iter::repeat('x').take(4321).collect();
        let cfg = config(2000, 200);
        let chunks = chunk(&text, &cfg);
        let last = chunks.last().unwrap();
        assert!(text.ends_with(last.as_str()));
        assert!(last.chars().count() <= cfg.chunk_size);
    }

    #[test]
    fn every_character_position_is_covered() {
        // Property: for overlap < size, concatenated windows cover every
        // position of the input at least once.
        let text = "the quick brown fox jumps over the lazy dog, twice over";
        let cfg = config(7, 3);
        let chunks = chunk(text, &cfg);

        let stride = cfg.chunk_size - cfg.chunk_overlap;
        let mut covered = vec![false; text.chars().count()];
        for (i, c) in chunks.iter().enumerate() {
            let start = i * stride;
            for offset in 0..c.chars().count() {
                covered[start + offset] = true;
            }
        }
        assert!(covered.iter().all(|&seen| seen));
    }

    #[test]
    fn multibyte_text_chunks_on_char_boundaries() {
        let text = "보험 상담 코칭 지식 베이스 항목입니다";
        let chunks = chunk(text, &config(5, 1));
        for c in &chunks {
            assert!(c.chars().count() <= 5);
        }
        assert_eq!(chunks.first().unwrap(), "보험 상담");
    }

    #[test]
    fn zero_overlap_produces_disjoint_windows() {
        let chunks = chunk("abcdefgh", &config(4, 0));
        assert_eq!(chunks, vec!["abcd", "efgh"]);
    }

    #[test]
    fn overlap_at_or_above_size_still_terminates() {
        // Invalid configs are rejected by ChunkConfig::validate; a direct
        // call must still make progress instead of looping forever.
        let chunks = chunk("abcdef", &config(3, 3));
        assert_eq!(chunks.len(), 6);
        assert_eq!(chunks.first().unwrap(), "abc");
        assert_eq!(chunks.last().unwrap(), "f");

        let chunks = chunk("abc", &config(2, 5));
        assert_eq!(chunks.len(), 3);
    }

    // =====================================================================
    // split_entries() tests
    // =====================================================================

    #[test]
    fn entries_split_on_separator() {
        let content = "first entry\n---\nsecond entry\n---\nthird";
        let entries = split_entries(content);
        assert_eq!(entries, vec!["first entry", "second entry", "third"]);
    }

    #[test]
    fn blank_entries_are_dropped() {
        let content = "---\n\nonly entry\n---\n   \n---";
        let entries = split_entries(content);
        assert_eq!(entries, vec!["only entry"]);
    }

    #[test]
    fn no_separator_yields_whole_content() {
        let entries = split_entries("a single block of knowledge");
        assert_eq!(entries, vec!["a single block of knowledge"]);
    }
}
