//! Byte-budget helpers for prompt assembly. Prompts carry scraped feed
//! content, so every slice has to respect UTF-8 boundaries.

/// Cut `s` down to at most `max_bytes` bytes without splitting a
/// multi-byte character. Returns the whole string when it already fits.
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let end = (0..=max_bytes)
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0);
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_passes_through_untouched() {
        assert_eq!(truncate_utf8("brief", 64), "brief");
        assert_eq!(truncate_utf8("", 0), "");
    }

    #[test]
    fn cut_lands_on_a_character_boundary() {
        // "né" is 3 bytes; a budget of 2 must not split the é.
        assert_eq!(truncate_utf8("né", 2), "n");
        assert_eq!(truncate_utf8("né", 3), "né");

        let mixed = "feed 日本語 content";
        for budget in 0..mixed.len() {
            let cut = truncate_utf8(mixed, budget);
            assert!(cut.len() <= budget);
            assert!(mixed.starts_with(cut));
        }
    }
}
