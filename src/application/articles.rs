//! Article lifecycle: publish pipeline, reading flow, seeding.
//!
//! Publishing derives everything the stored document needs from the block
//! tree (excerpt, tags, cover, summary) with per-step degradation rules:
//! AI enhancement failures soften to fallbacks, and only the final store
//! write can fail the publish. One schema mismatch is handled specially:
//! a store that predates the `summary` attribute rejects the create, and
//! the write is retried exactly once without that field.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::collaborators::{BlobStore, DocumentStore, StoreError};
use crate::application::curator::{AUTO_COVER_FILENAME, Curator, SUMMARY_FALLBACK};
use crate::application::render::block_renderer;
use crate::domain::blocks::{BlockKind, ContentBlock};
use crate::domain::document::{BlockDocument, ParseError};
use crate::domain::entities::{ArticleRecord, ProfileRecord};
use crate::domain::extract;
use crate::domain::seed::seed_articles;
use crate::domain::types::Collection;
use crate::util::html::{clip_chars, strip_tags};

/// File name for uploaded seed covers.
pub const SEED_COVER_FILENAME: &str = "seed_cover.png";

/// Store message identifying the one schema mismatch publish retries over.
const UNKNOWN_SUMMARY_ATTRIBUTE: &str = r#"Unknown attribute: "summary""#;

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("article title must not be empty")]
    MissingTitle,
    #[error("article body must contain at least one block")]
    EmptyBody,
    #[error(transparent)]
    Content(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything publish needs besides the author.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub title: String,
    /// Comma-separated topics as the author typed them.
    pub topics: String,
    pub cover_url: Option<String>,
    pub document: BlockDocument,
}

/// A fetched article prepared for display.
#[derive(Debug, Clone)]
pub struct ArticleView {
    pub article: ArticleRecord,
    pub document: BlockDocument,
    pub html: String,
    pub speech_text: String,
    pub word_count: usize,
    pub reading_time_minutes: u32,
}

pub struct ArticleService {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    curator: Arc<Curator>,
}

impl ArticleService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        curator: Arc<Curator>,
    ) -> Self {
        Self {
            store,
            blobs,
            curator,
        }
    }

    /// Run the full publish pipeline and create the article document.
    pub async fn publish(
        &self,
        author: &ProfileRecord,
        request: PublishRequest,
    ) -> Result<ArticleRecord, ArticleError> {
        if request.title.is_empty() {
            return Err(ArticleError::MissingTitle);
        }
        if request.document.is_empty() {
            return Err(ArticleError::EmptyBody);
        }

        let plain = extract::plain_text(&request.document.blocks);
        let excerpt = extract::excerpt(&request.document.blocks);

        let mut tags: Vec<String> = split_topics(&request.topics);
        if tags.is_empty() {
            let suggested = self.curator.suggest_tags(&request.title).await;
            if !suggested.is_empty() {
                tags = suggested;
            }
        }

        let cover = match request.cover_url {
            Some(url) => Some(url),
            None => {
                self.generate_cover(&request.title, &tags, &plain, AUTO_COVER_FILENAME)
                    .await
            }
        };

        let summary = match self.curator.summarize(&request.title, &plain).await {
            Ok(summary) => summary,
            Err(reason) => {
                warn!(
                    %reason,
                    "summary generation failed, publishing with the excerpt"
                );
                excerpt.clone()
            }
        };

        let content = request.document.to_json().map_err(ParseError::Json)?;
        let mut fields = json!({
            "title": request.title,
            "content": content,
            "coverImage": cover,
            "authorId": author.user_id,
            "authorName": author.name,
            "authorAvatar": author.avatar_url,
            "excerpt": excerpt,
            "summary": summary,
            "views": 0,
            "likesCount": 0,
            "tags": tags,
        });

        let id = Uuid::new_v4().to_string();
        let created = match self
            .store
            .create(Collection::Articles, &id, fields.clone())
            .await
        {
            Ok(document) => document,
            Err(StoreError::Rejected { ref message, .. })
                if message.contains(UNKNOWN_SUMMARY_ATTRIBUTE) =>
            {
                info!(
                    "store schema lacks `summary`, retrying the create without it"
                );
                if let Some(map) = fields.as_object_mut() {
                    map.remove("summary");
                }
                self.store.create(Collection::Articles, &id, fields).await?
            }
            Err(other) => return Err(other.into()),
        };

        info!(article_id = %created.id, "article published");
        Ok(ArticleRecord::from_parts(
            created.id,
            created.created_at,
            &created.fields,
        ))
    }

    /// Fetch one article by id.
    pub async fn fetch(&self, id: &str) -> Result<ArticleRecord, ArticleError> {
        let document = self.store.get(Collection::Articles, id).await?;
        Ok(ArticleRecord::from_parts(
            document.id,
            document.created_at,
            &document.fields,
        ))
    }

    /// Parse and render a fetched article for display.
    ///
    /// Fails only when the stored content is structurally unparseable;
    /// individual bad blocks degrade at render time.
    pub fn view(&self, article: ArticleRecord) -> Result<ArticleView, ArticleError> {
        let document = BlockDocument::parse(&article.content)?;
        let html = block_renderer().render_document(&document);
        let speech_text = extract::speech_text(&document.blocks);
        let words = extract::word_count(&strip_tags(&extract::plain_text(&document.blocks)));
        Ok(ArticleView {
            article,
            document,
            html,
            speech_text,
            word_count: words,
            reading_time_minutes: extract::reading_time_minutes(words),
        })
    }

    /// Bump the view counter, fire-and-forget. Failures are logged and
    /// swallowed; a miscounted view never disturbs the reading flow.
    pub async fn record_view(&self, article: &ArticleRecord) {
        let fields = json!({"views": article.views + 1});
        if let Err(reason) = self
            .store
            .update(Collection::Articles, &article.id, fields)
            .await
        {
            warn!(
                article_id = %article.id,
                %reason,
                "view counter update failed"
            );
        }
    }

    /// Publish the built-in sample set under `author`, sequentially.
    /// Stops at the first store failure.
    pub async fn seed(&self, author: &ProfileRecord) -> Result<Vec<ArticleRecord>, ArticleError> {
        let mut published = Vec::new();
        for seed in seed_articles() {
            let tags: Vec<String> = seed.tags.iter().map(|tag| tag.to_string()).collect();
            debug!(title = %seed.title, "seeding article");

            let cover = self
                .generate_cover(seed.title, &tags, "", SEED_COVER_FILENAME)
                .await;

            let plain = seed_text(&seed.document.blocks);
            let summary = match self.curator.summarize(seed.title, &plain).await {
                Ok(summary) => summary,
                Err(reason) => {
                    warn!(%reason, "seed summary failed");
                    SUMMARY_FALLBACK.to_string()
                }
            };

            let (views, likes) = seed_engagement();
            let content = seed.document.to_json().map_err(ParseError::Json)?;
            let fields = json!({
                "title": seed.title,
                "content": content,
                "coverImage": cover,
                "authorId": author.user_id,
                "authorName": author.name,
                "authorAvatar": author.avatar_url,
                "excerpt": format!("{}...", clip_chars(&plain, extract::EXCERPT_MAX_CHARS)),
                "summary": summary,
                "views": views,
                "likesCount": likes,
                "tags": tags,
            });

            let id = Uuid::new_v4().to_string();
            let created = self.store.create(Collection::Articles, &id, fields).await?;
            info!(title = %seed.title, "seeded article");
            published.push(ArticleRecord::from_parts(
                created.id,
                created.created_at,
                &created.fields,
            ));
        }
        Ok(published)
    }

    /// Generate and upload a cover; any failure means no cover.
    async fn generate_cover(
        &self,
        title: &str,
        tags: &[String],
        context: &str,
        filename: &str,
    ) -> Option<String> {
        let image = match self.curator.cover_image(title, tags, context).await {
            Ok(Some(image)) => image,
            Ok(None) => {
                warn!(%title, "model produced no cover image");
                return None;
            }
            Err(reason) => {
                warn!(%title, %reason, "cover generation failed");
                return None;
            }
        };
        match self
            .blobs
            .upload(image.bytes, filename, &image.mime_type)
            .await
        {
            Ok(file) => Some(file.url),
            Err(reason) => {
                warn!(%title, %reason, "cover upload failed");
                None
            }
        }
    }
}

fn split_topics(topics: &str) -> Vec<String> {
    topics
        .split(',')
        .map(str::trim)
        .filter(|topic| !topic.is_empty())
        .map(str::to_string)
        .collect()
}

/// Seed text joins every block's `text` payload field, empty for types
/// without one, so spacing mirrors what seeded instances always had.
fn seed_text(blocks: &[ContentBlock]) -> String {
    let parts: Vec<&str> = blocks
        .iter()
        .map(|block| match &block.kind {
            BlockKind::Header(header) => header.text.as_str(),
            BlockKind::Paragraph(paragraph) => paragraph.text.as_str(),
            BlockKind::Quote(quote) => quote.text.as_str(),
            _ => "",
        })
        .collect();
    parts.join(" ")
}

/// Randomized seed engagement: views in 50..=549, likes in 0..=49.
fn seed_engagement() -> (i64, i64) {
    let bytes = Uuid::new_v4().into_bytes();
    let noise = u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]);
    let views = 50 + (noise % 500) as i64;
    let likes = ((noise >> 32) % 50) as i64;
    (views, likes)
}
