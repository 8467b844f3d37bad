//! Canonical article content blocks.
//!
//! An article body is a list of typed blocks with the wire layout
//! `{"id": ..., "type": ..., "data": {...}}`. The block list is lenient on
//! the way in: an unrecognized `type`, or a known `type` whose payload is
//! missing required fields, is preserved as [`BlockKind::Unknown`] and
//! renders as nothing. One corrupt block never rejects the article it sits
//! in.

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

/// One typed unit of article content.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    /// Stable key for list rendering; unique only within one article.
    pub id: Option<String>,
    pub kind: BlockKind,
}

impl ContentBlock {
    pub fn new(kind: BlockKind) -> Self {
        Self { id: None, kind }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn header(text: impl Into<String>, level: i64) -> Self {
        Self::new(BlockKind::Header(HeaderBlock {
            text: text.into(),
            level: Some(level),
        }))
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Paragraph(ParagraphBlock { text: text.into() }))
    }

    pub fn image(url: impl Into<String>, caption: Option<String>) -> Self {
        Self::new(BlockKind::Image(ImageBlock {
            file: ImageFile { url: url.into() },
            caption,
        }))
    }

    /// Wrap a raw value that did not even have the `{type, data}` shape.
    pub(crate) fn opaque(value: Value) -> Self {
        Self {
            id: None,
            kind: BlockKind::Unknown {
                kind: String::new(),
                data: value,
            },
        }
    }

    /// Decode a wire value, keeping anything unconvertible as an opaque
    /// entry instead of failing.
    pub fn deserialize_lenient(value: &Value) -> Self {
        match Self::deserialize(value) {
            Ok(block) => block,
            Err(reason) => {
                debug!(%reason, "opaque block entry");
                Self::opaque(value.clone())
            }
        }
    }
}

/// Block payloads, discriminated by the wire `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Header(HeaderBlock),
    Paragraph(ParagraphBlock),
    List(ListBlock),
    Checklist(ChecklistBlock),
    Quote(QuoteBlock),
    Warning(WarningBlock),
    Table(TableBlock),
    Delimiter,
    Code(CodeBlock),
    Raw(RawBlock),
    Embed(EmbedBlock),
    Image(ImageBlock),
    /// Transient pseudo-block produced by AI drafting; always resolved to an
    /// `Image` block before a document reaches canonical storage.
    ImageSuggestion(ImageSuggestionBlock),
    /// Unrecognized `type`, or a known `type` whose payload failed to parse.
    /// Carries the original wire data so re-serialization passes it through.
    Unknown { kind: String, data: Value },
}

impl BlockKind {
    /// The wire discriminant for this block.
    pub fn name(&self) -> &str {
        match self {
            BlockKind::Header(_) => "header",
            BlockKind::Paragraph(_) => "paragraph",
            BlockKind::List(_) => "list",
            BlockKind::Checklist(_) => "checklist",
            BlockKind::Quote(_) => "quote",
            BlockKind::Warning(_) => "warning",
            BlockKind::Table(_) => "table",
            BlockKind::Delimiter => "delimiter",
            BlockKind::Code(_) => "code",
            BlockKind::Raw(_) => "raw",
            BlockKind::Embed(_) => "embed",
            BlockKind::Image(_) => "image",
            BlockKind::ImageSuggestion(_) => "image_suggestion",
            BlockKind::Unknown { kind, .. } => kind,
        }
    }

    /// The primary text carried by this block, if its type has one.
    ///
    /// Only header and paragraph blocks contribute here; list, quote, and
    /// table text is deliberately excluded from derived-text sources.
    pub fn primary_text(&self) -> Option<&str> {
        match self {
            BlockKind::Header(block) => Some(block.text.as_str()),
            BlockKind::Paragraph(block) => Some(block.text.as_str()),
            _ => None,
        }
    }

    fn decode(kind: String, data: Value) -> Self {
        fn payload<T: DeserializeOwned>(data: &Value) -> Result<T, serde_json::Error> {
            T::deserialize(data)
        }

        let parsed = match kind.as_str() {
            "header" => payload(&data).map(BlockKind::Header),
            "paragraph" => payload(&data).map(BlockKind::Paragraph),
            "list" => payload(&data).map(BlockKind::List),
            "checklist" => payload(&data).map(BlockKind::Checklist),
            "quote" => payload(&data).map(BlockKind::Quote),
            "warning" => payload(&data).map(BlockKind::Warning),
            "table" => payload(&data).map(BlockKind::Table),
            "delimiter" => Ok(BlockKind::Delimiter),
            "code" => payload(&data).map(BlockKind::Code),
            "raw" => payload(&data).map(BlockKind::Raw),
            "embed" => payload(&data).map(BlockKind::Embed),
            "image" => payload(&data).map(BlockKind::Image),
            "image_suggestion" => payload(&data).map(BlockKind::ImageSuggestion),
            _ => {
                debug!(block_type = %kind, "unrecognized block type");
                return BlockKind::Unknown { kind, data };
            }
        };

        match parsed {
            Ok(block) => block,
            Err(reason) => {
                debug!(
                    block_type = %kind,
                    %reason,
                    "block payload failed to parse"
                );
                BlockKind::Unknown { kind, data }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderBlock {
    pub text: String,
    /// Heading level 1..4; out-of-range or absent values fall back to the
    /// default heading presentation at render time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphBlock {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStyle {
    Ordered,
    #[default]
    Unordered,
}

impl ListStyle {
    pub fn is_ordered(self) -> bool {
        matches!(self, ListStyle::Ordered)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListBlock {
    #[serde(default)]
    pub style: ListStyle,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistBlock {
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub text: String,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteBlock {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningBlock {
    /// Defaults to "Note" at render time when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    #[serde(default, rename = "withHeadings")]
    pub with_headings: bool,
    /// Rows of cells; row 0 renders as header cells iff `with_headings`.
    #[serde(default)]
    pub content: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedBlock {
    pub embed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub file: ImageFile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFile {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSuggestionBlock {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Wire shape of one block before the payload is interpreted.
#[derive(Debug, Deserialize)]
struct WireBlock {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = WireBlock::deserialize(deserializer)?;
        Ok(Self {
            id: wire.id,
            kind: BlockKind::decode(wire.kind, wire.data),
        })
    }
}

impl Serialize for ContentBlock {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        if let Some(id) = &self.id {
            map.serialize_entry("id", id)?;
        }
        map.serialize_entry("type", self.kind.name())?;
        match &self.kind {
            BlockKind::Header(block) => map.serialize_entry("data", block)?,
            BlockKind::Paragraph(block) => map.serialize_entry("data", block)?,
            BlockKind::List(block) => map.serialize_entry("data", block)?,
            BlockKind::Checklist(block) => map.serialize_entry("data", block)?,
            BlockKind::Quote(block) => map.serialize_entry("data", block)?,
            BlockKind::Warning(block) => map.serialize_entry("data", block)?,
            BlockKind::Table(block) => map.serialize_entry("data", block)?,
            BlockKind::Delimiter => map.serialize_entry("data", &Value::Object(Map::new()))?,
            BlockKind::Code(block) => map.serialize_entry("data", block)?,
            BlockKind::Raw(block) => map.serialize_entry("data", block)?,
            BlockKind::Embed(block) => map.serialize_entry("data", block)?,
            BlockKind::Image(block) => map.serialize_entry("data", block)?,
            BlockKind::ImageSuggestion(block) => map.serialize_entry("data", block)?,
            BlockKind::Unknown { data, .. } => map.serialize_entry("data", data)?,
        }
        map.end()
    }
}
