//! AI draft importer.
//!
//! Turns a best-effort model draft into a canonical block document. The
//! draft is untrusted: text fields may carry markdown emphasis markers
//! the prompt forbade, and images arrive as `image_suggestion`
//! pseudo-blocks that must be resolved before the document is canonical.
//! Suggestions are resolved strictly in document order; a failed
//! suggestion drops that one block, while a failed draft call fails the
//! whole import and leaves the caller's state alone.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::application::collaborators::{BlobStore, GenerationError};
use crate::application::curator::Curator;
use crate::domain::blocks::{BlockKind, ContentBlock, ImageSuggestionBlock};
use crate::domain::document::BlockDocument;

/// File name for uploaded suggestion images.
pub const SUGGESTION_IMAGE_FILENAME: &str = "ai_suggestion_image.png";

/// Remove literal `**` and `__` emphasis markers.
///
/// Plain substring removal, not markdown parsing; idempotent for the
/// marker pairs it targets.
pub fn strip_emphasis_markers(text: &str) -> String {
    text.replace("**", "").replace("__", "")
}

pub struct DraftImporter {
    curator: Arc<Curator>,
    blobs: Arc<dyn BlobStore>,
}

impl DraftImporter {
    pub fn new(curator: Arc<Curator>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { curator, blobs }
    }

    /// Ask the model for a whole draft about `topic` and import it.
    pub async fn generate(&self, topic: &str) -> Result<BlockDocument, GenerationError> {
        let raw = self.curator.draft(topic).await?;
        self.import(raw).await
    }

    /// Import a raw model draft shaped like `{"blocks": [...]}`.
    ///
    /// Fails only when the draft has no blocks array; individual blocks
    /// never fail the import.
    pub async fn import(&self, raw: Value) -> Result<BlockDocument, GenerationError> {
        let Some(entries) = raw.get("blocks").and_then(Value::as_array) else {
            return Err(GenerationError::Decode(
                "draft is missing a blocks array".into(),
            ));
        };

        let mut blocks = Vec::with_capacity(entries.len());
        for entry in entries {
            let block = ContentBlock::deserialize_lenient(entry);
            match block.kind {
                BlockKind::ImageSuggestion(suggestion) => {
                    if let Some(image) = self.resolve_suggestion(&suggestion).await {
                        blocks.push(ContentBlock {
                            id: block.id,
                            kind: image,
                        });
                    }
                }
                // A suggestion whose payload failed to parse cannot be
                // resolved, and the canonical block list must never carry
                // the type; drop it like a failed resolution.
                BlockKind::Unknown { ref kind, .. } if kind == "image_suggestion" => {
                    debug!("dropped malformed image suggestion");
                }
                kind => blocks.push(ContentBlock {
                    id: block.id,
                    kind: strip_emphasis(kind),
                }),
            }
        }

        Ok(BlockDocument::new(blocks))
    }

    /// Generate and upload one suggestion's image. `None` drops the block.
    async fn resolve_suggestion(&self, suggestion: &ImageSuggestionBlock) -> Option<BlockKind> {
        let image = match self.curator.suggestion_image(&suggestion.prompt).await {
            Ok(Some(image)) => image,
            Ok(None) => {
                warn!(
                    prompt = %suggestion.prompt,
                    "model produced no image for suggestion"
                );
                return None;
            }
            Err(reason) => {
                warn!(
                    prompt = %suggestion.prompt,
                    %reason,
                    "suggestion image generation failed"
                );
                return None;
            }
        };

        match self
            .blobs
            .upload(image.bytes, SUGGESTION_IMAGE_FILENAME, &image.mime_type)
            .await
        {
            Ok(file) => {
                debug!(
                    url = %file.url,
                    "resolved image suggestion"
                );
                let image = ContentBlock::image(file.url, suggestion.caption.clone());
                Some(image.kind)
            }
            Err(reason) => {
                warn!(
                    %reason,
                    "suggestion image upload failed"
                );
                None
            }
        }
    }
}

/// Strip emphasis markers from every field the draft rules call text.
fn strip_emphasis(kind: BlockKind) -> BlockKind {
    match kind {
        BlockKind::Header(mut header) => {
            header.text = strip_emphasis_markers(&header.text);
            BlockKind::Header(header)
        }
        BlockKind::Paragraph(mut paragraph) => {
            paragraph.text = strip_emphasis_markers(&paragraph.text);
            BlockKind::Paragraph(paragraph)
        }
        BlockKind::Quote(mut quote) => {
            quote.text = strip_emphasis_markers(&quote.text);
            BlockKind::Quote(quote)
        }
        BlockKind::Checklist(mut checklist) => {
            for item in &mut checklist.items {
                item.text = strip_emphasis_markers(&item.text);
            }
            BlockKind::Checklist(checklist)
        }
        other => other,
    }
}
