//! Derived text from a block tree.
//!
//! Excerpts, AI prompt context, speech playback, and reading time all draw
//! from the same narrow source: the text of header and paragraph blocks,
//! in document order. Other block types never contribute.

use crate::domain::blocks::ContentBlock;
use crate::util::html::{clip_chars, strip_tags};

/// Maximum excerpt length before the ellipsis is appended.
pub const EXCERPT_MAX_CHARS: usize = 150;

const WORDS_PER_MINUTE: f32 = 225.0;

/// Concatenate header/paragraph text in document order, space-joined.
pub fn plain_text(blocks: &[ContentBlock]) -> String {
    let parts: Vec<&str> = blocks
        .iter()
        .filter_map(|block| block.kind.primary_text())
        .collect();
    parts.join(" ")
}

/// Like [`plain_text`], but with inline HTML stripped from each block and
/// sentence-style `". "` joins so a text-to-speech engine gets breaks.
pub fn speech_text(blocks: &[ContentBlock]) -> String {
    let parts: Vec<String> = blocks
        .iter()
        .filter_map(|block| block.kind.primary_text())
        .map(strip_tags)
        .collect();
    parts.join(". ")
}

/// Tag-stripped plain text truncated to [`EXCERPT_MAX_CHARS`], with an
/// ellipsis appended only when truncation actually occurred.
pub fn excerpt(blocks: &[ContentBlock]) -> String {
    let stripped = strip_tags(&plain_text(blocks));
    let clipped = clip_chars(&stripped, EXCERPT_MAX_CHARS);
    if clipped.len() < stripped.len() {
        format!("{clipped}...")
    } else {
        stripped
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated reading time in whole minutes; zero only for empty text.
pub fn reading_time_minutes(words: usize) -> u32 {
    if words == 0 {
        return 0;
    }
    let minutes = (words as f32 / WORDS_PER_MINUTE).ceil() as u32;
    minutes.max(1)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::domain::blocks::ContentBlock;

    use super::*;

    fn block(value: serde_json::Value) -> ContentBlock {
        serde_json::from_value(value).expect("block decodes")
    }

    fn sample() -> Vec<ContentBlock> {
        vec![
            block(json!({"type": "header", "data": {"text": "The <em>Title</em>", "level": 2}})),
            block(json!({"type": "quote", "data": {"text": "ignored quote"}})),
            block(json!({"type": "paragraph", "data": {"text": "First <b>sentence</b>"}})),
            block(json!({"type": "list", "data": {"items": ["ignored item"]}})),
            block(json!({"type": "paragraph", "data": {"text": "Second"}})),
        ]
    }

    #[test]
    fn plain_text_joins_header_and_paragraph_only() {
        assert_eq!(
            plain_text(&sample()),
            "The <em>Title</em> First <b>sentence</b> Second"
        );
    }

    #[test]
    fn speech_text_strips_tags_and_joins_sentences() {
        assert_eq!(
            speech_text(&sample()),
            "The Title. First sentence. Second"
        );
    }

    #[test]
    fn extraction_is_deterministic() {
        let blocks = sample();
        assert_eq!(plain_text(&blocks), plain_text(&blocks));
        assert_eq!(speech_text(&blocks), speech_text(&blocks));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(plain_text(&[]), "");
        assert_eq!(speech_text(&[]), "");
        assert_eq!(excerpt(&[]), "");

        let non_text = vec![block(json!({"type": "delimiter", "data": {}}))];
        assert_eq!(plain_text(&non_text), "");
    }

    #[test]
    fn excerpt_appends_ellipsis_only_when_truncated() {
        let short = vec![ContentBlock::paragraph("Short enough.")];
        assert_eq!(excerpt(&short), "Short enough.");

        let long = vec![ContentBlock::paragraph("x".repeat(200))];
        let value = excerpt(&long);
        assert_eq!(value.chars().count(), EXCERPT_MAX_CHARS + 3);
        assert!(value.ends_with("..."));

        let exact = vec![ContentBlock::paragraph("y".repeat(EXCERPT_MAX_CHARS))];
        assert!(!excerpt(&exact).ends_with("..."));
    }

    #[test]
    fn reading_time_floors_at_one_minute_for_any_text() {
        assert_eq!(reading_time_minutes(0), 0);
        assert_eq!(reading_time_minutes(1), 1);
        assert_eq!(reading_time_minutes(225), 1);
        assert_eq!(reading_time_minutes(226), 2);
        assert_eq!(reading_time_minutes(900), 4);
    }
}
