//! Bounded-size text splitting.
//!
//! Splits extracted text into chunks of at most `max_chunk_size` bytes for
//! the embedding backend. Splitting is content-preserving: concatenating the
//! chunks in order reproduces the input exactly, so no text is lost between
//! chunk boundaries. Boundaries prefer a paragraph break (`\n\n`) inside the
//! window, then a line break, then a space, and only then a hard split at a
//! UTF-8 character boundary.

/// Split `text` into ordered chunks of at most `max_chunk_size` bytes.
///
/// Empty text produces zero chunks; text no longer than the maximum produces
/// exactly one. A single oversized multi-byte character is emitted whole
/// rather than split mid-codepoint.
pub fn split_into_chunks(text: &str, max_chunk_size: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let max = max_chunk_size.max(1);

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        if rest.len() <= max {
            chunks.push(rest.to_string());
            break;
        }

        let window_end = snap_to_char_boundary(rest, max);
        let cut = if window_end == 0 {
            // max is smaller than the first character; emit it whole.
            rest.char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(rest.len())
        } else {
            let window = &rest[..window_end];
            window
                .rfind("\n\n")
                .map(|p| p + 2)
                .or_else(|| window.rfind('\n').map(|p| p + 1))
                .or_else(|| window.rfind(' ').map(|p| p + 1))
                .unwrap_or(window_end)
        };

        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }
    chunks
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
