//! Serialized block-tree document envelope.
//!
//! Stored articles carry their body as a JSON string with the layout
//! `{"time": <unix ms>, "blocks": [...], "version": "..."}`. Parsing fails
//! only when the top level is unparseable or `blocks` is not an array;
//! individual bad blocks are kept as opaque entries and degrade at render
//! time.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use super::blocks::ContentBlock;

/// Schema version stamped on documents this system produces, matching the
/// embedded editor's output so stored articles stay interchangeable.
pub const SCHEMA_VERSION: &str = "2.28.2";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("article content is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("article content has no `blocks` array")]
    MissingBlocks,
}

/// One article body: an ordered list of content blocks plus the envelope
/// metadata the editor stamps on save.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockDocument {
    /// Editor save time, unix milliseconds.
    pub time: Option<i64>,
    pub blocks: Vec<ContentBlock>,
    pub version: Option<String>,
}

impl BlockDocument {
    /// Build a freshly stamped document around `blocks`.
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            time: Some((now.unix_timestamp_nanos() / 1_000_000) as i64),
            blocks,
            version: Some(SCHEMA_VERSION.to_string()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Parse a stored document string.
    ///
    /// Fails only for unparseable JSON or a missing/non-array `blocks`
    /// field. Every array element becomes a block; elements that do not even
    /// look like blocks are preserved opaquely.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let mut root = match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            _ => return Err(ParseError::MissingBlocks),
        };

        let items = match root.remove("blocks") {
            Some(Value::Array(items)) => items,
            _ => return Err(ParseError::MissingBlocks),
        };

        let time = root.get("time").and_then(Value::as_i64);
        let version = root
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string);

        let blocks = items.iter().map(ContentBlock::deserialize_lenient).collect();

        Ok(Self {
            time,
            blocks,
            version,
        })
    }

    /// Serialize back to the stored wire form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for BlockDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        if let Some(time) = self.time {
            map.serialize_entry("time", &time)?;
        }
        map.serialize_entry("blocks", &self.blocks)?;
        if let Some(version) = &self.version {
            map.serialize_entry("version", version)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::blocks::BlockKind;
    use super::*;

    #[test]
    fn parse_accepts_a_full_envelope() {
        let raw = json!({
            "time": 1700000000000_i64,
            "blocks": [
                {"type": "header", "data": {"text": "Title", "level": 2}},
                {"type": "paragraph", "data": {"text": "Body"}}
            ],
            "version": "2.28.2"
        })
        .to_string();

        let document = BlockDocument::parse(&raw).expect("parses");
        assert_eq!(document.time, Some(1_700_000_000_000));
        assert_eq!(document.version.as_deref(), Some("2.28.2"));
        assert_eq!(document.blocks.len(), 2);
    }

    #[test]
    fn parse_rejects_only_structural_failures() {
        match BlockDocument::parse("not json") {
            Err(ParseError::Json(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        match BlockDocument::parse(r#"{"time": 1}"#) {
            Err(ParseError::MissingBlocks) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        match BlockDocument::parse(r#"{"blocks": "nope"}"#) {
            Err(ParseError::MissingBlocks) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        match BlockDocument::parse("[1, 2]") {
            Err(ParseError::MissingBlocks) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn parse_tolerates_junk_envelope_metadata() {
        let document =
            BlockDocument::parse(r#"{"time": "later", "blocks": [], "version": 7}"#).expect("parses");
        assert_eq!(document.time, None);
        assert_eq!(document.version, None);
        assert!(document.is_empty());
    }

    #[test]
    fn degenerate_block_entries_survive_opaquely() {
        let raw = json!({"blocks": [42, {"type": "paragraph", "data": {"text": "ok"}}]}).to_string();
        let document = BlockDocument::parse(&raw).expect("parses");
        assert_eq!(document.blocks.len(), 2);
        match &document.blocks[0].kind {
            BlockKind::Unknown { kind, data } => {
                assert!(kind.is_empty());
                assert_eq!(data, &json!(42));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        assert!(matches!(document.blocks[1].kind, BlockKind::Paragraph(_)));
    }

    #[test]
    fn round_trip_preserves_structure() {
        let raw = json!({
            "time": 1700000000123_i64,
            "blocks": [
                {"id": "a", "type": "header", "data": {"text": "T", "level": 1}},
                {"type": "list", "data": {"style": "ordered", "items": ["one", "two"]}},
                {"type": "checklist", "data": {"items": [{"text": "do", "checked": true}]}},
                {"type": "quote", "data": {"text": "q", "caption": "who"}},
                {"type": "warning", "data": {"title": "Careful", "message": "msg"}},
                {"type": "table", "data": {"withHeadings": false, "content": [["x"]]}},
                {"type": "delimiter", "data": {}},
                {"type": "code", "data": {"code": "let x = 1;"}},
                {"type": "raw", "data": {"html": "<hr>"}},
                {"type": "embed", "data": {"embed": "https://e.example/v", "caption": "clip"}},
                {"type": "image", "data": {"file": {"url": "https://i.example/p.png"}, "caption": "pic"}},
                {"type": "mystery", "data": {"keep": "me"}}
            ],
            "version": "2.28.2"
        })
        .to_string();

        let first = BlockDocument::parse(&raw).expect("parses");
        let encoded = first.to_json().expect("serializes");
        let second = BlockDocument::parse(&encoded).expect("reparses");
        assert_eq!(first, second);
    }

    #[test]
    fn new_documents_are_stamped() {
        let document = BlockDocument::new(vec![ContentBlock::paragraph("hi")]);
        assert!(document.time.is_some());
        assert_eq!(document.version.as_deref(), Some(SCHEMA_VERSION));
        assert!(!document.is_empty());
    }
}
