//! Character-budget truncation for text handed back to the model.

/// Keep at most `max_chars` characters of `content`.
///
/// Returns the kept prefix and whether anything was dropped. Counting is by
/// Unicode scalar value, so multi-byte text is never split mid-character.
/// Content of exactly `max_chars` characters is returned whole.
pub fn truncate_chars(content: &str, max_chars: usize) -> (&str, bool) {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => (&content[..cut], true),
        None => (content, false),
    }
}
