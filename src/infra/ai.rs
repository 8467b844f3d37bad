//! Generative model client speaking the Gemini REST API.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use metrics::counter;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use crate::application::collaborators::{
    AspectRatio, GeneratedImage, GenerationError, GenerativeModel,
};
use crate::config::AiSettings;

use super::client::PlatformClient;
use super::error::InfraError;

const METRIC_AI_REQUESTS: &str = "pedium_ai_requests_total";
const KEY_HEADER: &str = "x-goog-api-key";
const DEFAULT_IMAGE_MIME: &str = "image/png";

// Image generation regularly takes longer than document store calls.
const GENERATION_TIMEOUT_SECS: u64 = 120;

pub struct GeminiClient {
    http: Client,
    base: String,
    api_key: Option<String>,
    text_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(settings: &AiSettings) -> Result<Self, InfraError> {
        let http = Client::builder()
            .user_agent(PlatformClient::user_agent())
            .timeout(Duration::from_secs(GENERATION_TIMEOUT_SECS))
            .build()
            .map_err(|err| {
                InfraError::configuration(format!("failed to build HTTP client: {err}"))
            })?;

        Ok(Self {
            http,
            base: settings.endpoint.as_str().trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            text_model: settings.text_model.clone(),
            image_model: settings.image_model.clone(),
        })
    }

    async fn invoke(
        &self,
        kind: &'static str,
        model: &str,
        body: Value,
    ) -> Result<Value, GenerationError> {
        let Some(key) = self.api_key.as_ref() else {
            return Err(GenerationError::Unconfigured);
        };

        debug!(kind, model, "calling generative model");
        counter!(METRIC_AI_REQUESTS, "kind" => kind).increment(1);

        let url = format!("{}/v1beta/models/{model}:generateContent", self.base);
        let response = self
            .http
            .post(url)
            .header(KEY_HEADER, key)
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| {
                    body.pointer("/error/message")
                        .and_then(Value::as_str)
                        .map(str::to_owned)
                })
                .unwrap_or(text);
            return Err(GenerationError::Rejected { status, message });
        }

        response
            .json()
            .await
            .map_err(|err| GenerationError::Decode(err.to_string()))
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = self
            .invoke("text", &self.text_model, prompt_body(prompt))
            .await?;
        candidate_text(&body).ok_or(GenerationError::Empty)
    }

    async fn generate_json(&self, prompt: &str) -> Result<Value, GenerationError> {
        let mut body = prompt_body(prompt);
        body["generationConfig"] = json!({ "responseMimeType": "application/json" });

        let response = self.invoke("json", &self.text_model, body).await?;
        let text = candidate_text(&response).ok_or(GenerationError::Empty)?;
        serde_json::from_str(&text).map_err(|err| GenerationError::Decode(err.to_string()))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect: AspectRatio,
    ) -> Result<Option<GeneratedImage>, GenerationError> {
        let mut body = prompt_body(prompt);
        body["generationConfig"] = json!({ "imageConfig": { "aspectRatio": aspect.as_str() } });

        let response = self.invoke("image", &self.image_model, body).await?;
        let Some(inline) = inline_data(&response) else {
            return Ok(None);
        };

        let encoded = inline
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| GenerationError::Decode("inline image has no `data`".to_string()))?;
        let bytes = BASE64
            .decode(encoded)
            .map_err(|err| GenerationError::Decode(err.to_string()))?;
        let mime_type = inline
            .get("mimeType")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_string();

        Ok(Some(GeneratedImage {
            bytes: Bytes::from(bytes),
            mime_type,
        }))
    }
}

fn prompt_body(prompt: &str) -> Value {
    json!({ "contents": [{ "parts": [{ "text": prompt }] }] })
}

/// Concatenated text parts of the first candidate, `None` when there are none.
fn candidate_text(body: &Value) -> Option<String> {
    let parts = body
        .pointer("/candidates/0/content/parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

/// First inline-data part of the first candidate, if any.
fn inline_data(body: &Value) -> Option<&Value> {
    body.pointer("/candidates/0/content/parts")?
        .as_array()?
        .iter()
        .find_map(|part| part.get("inlineData"))
}
