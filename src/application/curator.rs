//! Generative-AI prompt surface.
//!
//! All prompts sent to the model live here, one builder per call, so the
//! exact prompt text stays auditable. The curator wraps the raw model
//! collaborator with the degradation rules each call wants: auxiliary
//! calls (summary, tags) fall back to canned values, image calls report
//! "no image" without failing the flow, and the whole-draft call is the
//! one place a generation failure is allowed to surface.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::application::collaborators::{
    AspectRatio, GeneratedImage, GenerationError, GenerativeModel,
};
use crate::util::html::clip_chars;

/// Summary used when the model answers with empty text.
pub const SUMMARY_FALLBACK: &str = "Read this amazing story on Pedium.";

/// File name for auto-generated publish covers.
pub const AUTO_COVER_FILENAME: &str = "ai_auto_cover.png";

/// File name for generated profile avatars.
pub const AVATAR_FILENAME: &str = "avatar.png";

const COVER_CONTEXT_MAX_CHARS: usize = 200;
const SUMMARY_CONTEXT_MAX_CHARS: usize = 1000;
const MAX_SUGGESTED_TAGS: usize = 5;

pub fn cover_prompt(title: &str, tags: &[String], context: &str) -> String {
    let tag_string = if tags.is_empty() {
        String::new()
    } else {
        format!("Tags: {}.", tags.join(", "))
    };
    let context_string = if context.is_empty() {
        String::new()
    } else {
        format!("Context: {}...", clip_chars(context, COVER_CONTEXT_MAX_CHARS))
    };
    format!(
        "high quality editorial illustration for blog post titled \"{title}\". \
         {tag_string} {context_string} modern, minimal, flat design, artistic, no text"
    )
}

pub fn avatar_prompt(name: &str) -> String {
    format!(
        "cute colorful flat vector avatar icon for user {name}, \
         minimal style, white background, circular"
    )
}

pub fn summary_prompt(title: &str, content: &str) -> String {
    format!(
        "Summarize this article in 1 short sentence (max 30 words). \
         Title: {title}. Content: {}",
        clip_chars(content, SUMMARY_CONTEXT_MAX_CHARS)
    )
}

pub fn tags_prompt(title: &str) -> String {
    format!(
        "Generate 3-5 comma-separated tags for article \"{title}\". \
         First tag must be one of: Programming, AI, Design, Psychology, Money, Business."
    )
}

pub fn draft_prompt(topic: &str) -> String {
    format!(
        "Write a comprehensive blog post about \"{topic}\".\n\
         Return strict JSON for Editor.js blocks.\n\
         \n\
         Rules:\n\
         1. NO Markdown formatting (no **bold**, no *italic*, no # headers) in text fields. Pure text only.\n\
         2. Include 6-10 blocks.\n\
         3. Use a mix of: 'header' (level 2), 'paragraph', 'list', 'quote', 'warning', 'delimiter', 'code'.\n\
         4. Include 1 or 2 'image_suggestion' blocks where an image would enhance the article.\n\
         Format for image suggestion: {{ \"type\": \"image_suggestion\", \"data\": {{ \"prompt\": \"Detailed visual description of image needed\", \"caption\": \"Image caption\" }} }}\n\
         \n\
         Structure:\n\
         {{\n\
             \"blocks\": [ ... ]\n\
         }}"
    )
}

pub struct Curator {
    model: Arc<dyn GenerativeModel>,
}

impl Curator {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// One-sentence article summary. An empty model answer degrades to
    /// [`SUMMARY_FALLBACK`]; a failed call is the caller's problem (the
    /// publish pipeline substitutes the excerpt).
    pub async fn summarize(&self, title: &str, content: &str) -> Result<String, GenerationError> {
        let text = self.model.generate_text(&summary_prompt(title, content)).await?;
        if text.trim().is_empty() {
            Ok(SUMMARY_FALLBACK.to_string())
        } else {
            Ok(text)
        }
    }

    /// Suggested tags for an untagged article, at most
    /// five. Any failure degrades to no suggestions.
    pub async fn suggest_tags(&self, title: &str) -> Vec<String> {
        match self.model.generate_text(&tags_prompt(title)).await {
            Ok(reply) => reply
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .take(MAX_SUGGESTED_TAGS)
                .map(str::to_string)
                .collect(),
            Err(reason) => {
                warn!(%reason, "tag suggestion failed");
                Vec::new()
            }
        }
    }

    /// 16:9 cover illustration for an article.
    pub async fn cover_image(
        &self,
        title: &str,
        tags: &[String],
        context: &str,
    ) -> Result<Option<GeneratedImage>, GenerationError> {
        self.model
            .generate_image(&cover_prompt(title, tags, context), AspectRatio::Widescreen)
            .await
    }

    /// Square avatar icon for a profile.
    pub async fn avatar(&self, name: &str) -> Result<Option<GeneratedImage>, GenerationError> {
        self.model
            .generate_image(&avatar_prompt(name), AspectRatio::Square)
            .await
    }

    /// Square in-article illustration for a resolved image suggestion.
    pub async fn suggestion_image(
        &self,
        prompt: &str,
    ) -> Result<Option<GeneratedImage>, GenerationError> {
        self.model.generate_image(prompt, AspectRatio::Square).await
    }

    /// Whole-draft generation: strict-JSON block document for `topic`.
    /// This is the one curator call whose failure surfaces to the caller.
    pub async fn draft(&self, topic: &str) -> Result<Value, GenerationError> {
        self.model.generate_json(&draft_prompt(topic)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;

    struct StubModel {
        text_reply: Result<String, ()>,
        recorded: Mutex<Vec<(String, Option<AspectRatio>)>>,
    }

    impl StubModel {
        fn replying(text: &str) -> Self {
            Self {
                text_reply: Ok(text.to_string()),
                recorded: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                text_reply: Err(()),
                recorded: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerativeModel for StubModel {
        async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
            self.recorded.lock().unwrap().push((prompt.to_string(), None));
            self.text_reply
                .clone()
                .map_err(|()| GenerationError::transport("model unavailable"))
        }

        async fn generate_json(&self, prompt: &str) -> Result<Value, GenerationError> {
            self.recorded.lock().unwrap().push((prompt.to_string(), None));
            Ok(serde_json::json!({"blocks": []}))
        }

        async fn generate_image(
            &self,
            prompt: &str,
            aspect: AspectRatio,
        ) -> Result<Option<GeneratedImage>, GenerationError> {
            self.recorded
                .lock()
                .unwrap()
                .push((prompt.to_string(), Some(aspect)));
            Ok(Some(GeneratedImage {
                bytes: Bytes::from_static(b"png"),
                mime_type: "image/png".into(),
            }))
        }
    }

    #[test]
    fn cover_prompt_includes_tags_and_clipped_context() {
        let tags = vec!["Rust".to_string(), "Design".to_string()];
        let prompt = cover_prompt("On Types", &tags, "ctx");
        assert_eq!(
            prompt,
            "high quality editorial illustration for blog post titled \"On Types\". \
             Tags: Rust, Design. Context: ctx... modern, minimal, flat design, artistic, no text"
        );

        let long_context = "x".repeat(500);
        let prompt = cover_prompt("T", &[], &long_context);
        assert!(prompt.contains(&format!("Context: {}...", "x".repeat(200))));
        assert!(!prompt.contains("Tags:"));
    }

    #[test]
    fn summary_prompt_clips_content_to_a_thousand_chars() {
        let content = "y".repeat(2000);
        let prompt = summary_prompt("T", &content);
        assert!(prompt.starts_with(
            "Summarize this article in 1 short sentence (max 30 words). Title: T. Content: "
        ));
        assert!(prompt.ends_with(&"y".repeat(1000)));
        assert_eq!(prompt.matches('y').count(), 1000);
    }

    #[test]
    fn tags_prompt_names_the_allowed_first_tags() {
        let prompt = tags_prompt("Borrowed Time");
        assert!(prompt.contains("3-5 comma-separated tags"));
        assert!(prompt.contains("Programming, AI, Design, Psychology, Money, Business"));
    }

    #[test]
    fn draft_prompt_demands_strict_block_json() {
        let prompt = draft_prompt("ownership");
        assert!(prompt.starts_with("Write a comprehensive blog post about \"ownership\"."));
        assert!(prompt.contains("Return strict JSON for Editor.js blocks."));
        assert!(prompt.contains("NO Markdown formatting"));
        assert!(prompt.contains("'image_suggestion'"));
        assert!(prompt.contains("\"blocks\": [ ... ]"));
    }

    #[tokio::test]
    async fn empty_summary_reply_degrades_to_the_canned_line() {
        let curator = Curator::new(Arc::new(StubModel::replying("   ")));
        assert_eq!(curator.summarize("T", "C").await.unwrap(), SUMMARY_FALLBACK);

        let curator = Curator::new(Arc::new(StubModel::replying("Short and sweet.")));
        assert_eq!(curator.summarize("T", "C").await.unwrap(), "Short and sweet.");
    }

    #[tokio::test]
    async fn failed_summary_call_surfaces_to_the_caller() {
        let curator = Curator::new(Arc::new(StubModel::failing()));
        assert!(curator.summarize("T", "C").await.is_err());
    }

    #[tokio::test]
    async fn tag_suggestions_are_trimmed_capped_and_fault_tolerant() {
        let curator = Curator::new(Arc::new(StubModel::replying(
            "Programming, rust , async,, tooling, extra, overflow",
        )));
        assert_eq!(
            curator.suggest_tags("T").await,
            vec!["Programming", "rust", "async", "tooling", "extra"]
        );

        let curator = Curator::new(Arc::new(StubModel::failing()));
        assert!(curator.suggest_tags("T").await.is_empty());
    }

    #[tokio::test]
    async fn image_calls_carry_their_aspect_ratios() {
        let model = Arc::new(StubModel::replying(""));
        let curator = Curator::new(model.clone());

        curator.cover_image("T", &[], "").await.unwrap();
        curator.avatar("ada").await.unwrap();
        curator.suggestion_image("a diagram").await.unwrap();

        let recorded = model.recorded.lock().unwrap();
        assert_eq!(recorded[0].1, Some(AspectRatio::Widescreen));
        assert_eq!(recorded[1].1, Some(AspectRatio::Square));
        assert_eq!(recorded[2].1, Some(AspectRatio::Square));
        assert_eq!(recorded[2].0, "a diagram");
    }
}
