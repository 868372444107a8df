//! Response chunking
//!
//! Oversized outbound bodies are re-cut into protocol-legal sizes before
//! they reach the backend. The limit is counted in characters, so a chunk
//! can never end inside a multi-byte character.

/// Split `text` into the minimum number of contiguous chunks of at most
/// `limit` characters, preferring to cut at whitespace. The whitespace
/// character a cut lands on is consumed by the cut.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 || text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while chars.len() - start > limit {
        let window_end = start + limit;
        let cut = if chars[window_end].is_whitespace() {
            // The window fits exactly up to a boundary.
            Some(window_end)
        } else {
            (start + 1..window_end)
                .rev()
                .find(|&i| chars[i].is_whitespace())
        };

        match cut {
            Some(ws) => {
                chunks.push(chars[start..ws].iter().collect());
                start = ws + 1;
            }
            None => {
                // No usable boundary, hard split at the limit.
                chunks.push(chars[start..window_end].iter().collect());
                start = window_end;
            }
        }
    }

    if start < chars.len() {
        chunks.push(chars[start..].iter().collect());
    }
    chunks
}
