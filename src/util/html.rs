//! Utility helpers for escaping and stripping inline HTML in block text.

/// Escape a string for use as HTML text or attribute content.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Remove inline HTML tags from a string.
///
/// Everything from a `<` through the next `>` is dropped; a `<` with no
/// closing `>` drops the rest of the string. This mirrors how stored article
/// text has always been stripped for excerpts and speech, so derived text
/// stays stable for existing content.
pub fn strip_tags(input: &str) -> String {
    let mut stripped = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == '<' {
            for rest in chars.by_ref() {
                if rest == '>' {
                    break;
                }
            }
        } else {
            stripped.push(ch);
        }
    }
    stripped
}

/// Clip a string to at most `max` characters, respecting char boundaries.
pub fn clip_chars(input: &str, max: usize) -> &str {
    match input.char_indices().nth(max) {
        Some((index, _)) => &input[..index],
        None => input,
    }
}
