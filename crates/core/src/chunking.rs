pub fn normalize_text(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if chunk_overlap >= chunk_size {
        return Vec::new();
    }

    let cleaned = normalize_text(text);
    if cleaned.is_empty() {
        return Vec::new();
    }

    // windows are measured in code points, not bytes
    let chars: Vec<char> = cleaned.chars().collect();
    if chars.len() <= chunk_size {
        return vec![cleaned];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();

        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= chars.len() {
            break;
        }

        start = end - chunk_overlap;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::{chunk_text, normalize_text};

    #[test]
    fn lines_are_right_trimmed_and_text_is_stripped() {
        let input = "  first line   \nsecond line\t\n\n";
        assert_eq!(normalize_text(input), "first line\nsecond line");
    }

    #[test]
    fn short_text_comes_back_as_a_single_trimmed_chunk() {
        let chunks = chunk_text("  hello world  ", 100, 10);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn chunking_is_idempotent_on_already_chunked_text() {
        let first = chunk_text("some short passage", 100, 10);
        let again = chunk_text(&first[0], 100, 10);
        assert_eq!(first, again);
    }

    #[test]
    fn overlap_not_smaller_than_size_yields_nothing() {
        assert!(chunk_text("abcdef", 4, 4).is_empty());
        assert!(chunk_text("abcdef", 4, 9).is_empty());
    }

    #[test]
    fn whitespace_only_text_yields_nothing() {
        assert!(chunk_text("   \n\t \n", 100, 10).is_empty());
    }

    #[test]
    fn every_chunk_fits_the_window_and_none_is_empty() {
        let text: String = "lorem ipsum dolor sit amet ".repeat(60);
        let chunks = chunk_text(&text, 200, 20);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 200);
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn consecutive_chunks_share_the_overlap_region() {
        // No leading/trailing whitespace near boundaries so window
        // trimming cannot eat into the overlap.
        let text: String = ('a'..='z').cycle().take(1000).collect();
        let chunks = chunk_text(&text, 300, 30);

        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(30).collect::<Vec<_>>().into_iter().rev().collect();
            assert!(pair[1].starts_with(&tail));
        }
    }

    #[test]
    fn twelve_hundred_chars_with_default_layout_gives_three_chunks() {
        let text: String = ('a'..='z').cycle().take(1200).collect();
        let chunks = chunk_text(&text, 500, 50);

        // Windows land at 0..500, 450..950, 900..1200.
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 500);
        assert_eq!(chunks[2].chars().count(), 300);
    }
}
