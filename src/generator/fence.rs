//! Markdown fence stripping for generator output.

/// Extract code from a markdown-fenced answer.
///
/// The first fenced block wins; text outside it is dropped. An opening fence
/// may carry an info string (`rust`, `rs`). Unfenced text is returned
/// trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(open) = find_fence_line(trimmed) else {
        return trimmed;
    };

    let after_open = &trimmed[open + 3..];
    // the rest of the opening line is the info string
    let body_start = match after_open.find('\n') {
        Some(i) => i + 1,
        None => {
            // single-line form: ```code```
            let inner = after_open.strip_suffix("```").unwrap_or(after_open);
            return inner.trim();
        }
    };

    let body = &after_open[body_start..];
    let body = match find_fence_line(body) {
        Some(close) => &body[..close],
        None => body,
    };
    body.trim()
}

/// Byte offset of the fence marker on the first line that starts with one.
fn find_fence_line(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_start().starts_with("```") {
            return Some(offset + (line.len() - line.trim_start().len()));
        }
        offset += line.len();
    }
    None
}
