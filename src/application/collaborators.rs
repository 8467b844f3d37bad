//! Collaborator traits describing the external systems the core talks to.
//!
//! Persistence, file storage, identity, realtime events, and generation are
//! all delegated: the implementations live in `infra`, the rest of the
//! application only sees these narrow interfaces.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::types::Collection;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store transport error: {0}")]
    Transport(String),
    #[error("document store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("document not found")]
    NotFound,
    #[error("document store response could not be decoded: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("object storage transport error: {0}")]
    Transport(String),
    #[error("object storage rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("object storage response could not be decoded: {0}")]
    Decode(String),
}

impl UploadError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no generation credentials configured")]
    Unconfigured,
    #[error("generation transport error: {0}")]
    Transport(String),
    #[error("model rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("model returned no usable output")]
    Empty,
    #[error("model output could not be decoded: {0}")]
    Decode(String),
}

impl GenerationError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity transport error: {0}")]
    Transport(String),
    #[error("not authenticated")]
    Unauthorized,
    #[error("identity provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("identity response could not be decoded: {0}")]
    Decode(String),
}

/// One document as the external store hands it back.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub created_at: OffsetDateTime,
    pub fields: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub equals: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortOrder {
    pub field: String,
    pub direction: SortDirection,
}

/// Equality/order/limit query, the only primitives the store exposes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    pub filters: Vec<FieldFilter>,
    pub order: Option<SortOrder>,
    pub limit: Option<u32>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equal(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            equals: value.into(),
        });
        self
    }

    pub fn order_desc(mut self, field: impl Into<String>) -> Self {
        self.order = Some(SortOrder {
            field: field.into(),
            direction: SortDirection::Descending,
        });
        self
    }

    pub fn order_asc(mut self, field: impl Into<String>) -> Self {
        self.order = Some(SortOrder {
            field: field.into(),
            direction: SortDirection::Ascending,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<StoredDocument, StoreError>;

    async fn get(&self, collection: Collection, id: &str) -> Result<StoredDocument, StoreError>;

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<StoredDocument, StoreError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;

    async fn list(
        &self,
        collection: Collection,
        query: &DocumentQuery,
    ) -> Result<Vec<StoredDocument>, StoreError>;
}

/// A file accepted by object storage, addressable by public URL.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        payload: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<StoredFile, UploadError>;
}

/// Aspect ratios the image model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Square,
    Widescreen,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Widescreen => "16:9",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Bytes,
    pub mime_type: String,
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Strict-JSON generation. The returned value is best-effort and must be
    /// validated by the caller.
    async fn generate_json(&self, prompt: &str) -> Result<Value, GenerationError>;

    /// `Ok(None)` means the model answered but produced no image; callers
    /// treat that the same as a failed generation.
    async fn generate_image(
        &self,
        prompt: &str,
        aspect: AspectRatio,
    ) -> Result<Option<GeneratedImage>, GenerationError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub secret: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_account(&self) -> Result<Option<Account>, IdentityError>;

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, IdentityError>;

    async fn create_session(&self, email: &str, password: &str) -> Result<Session, IdentityError>;

    async fn delete_session(&self) -> Result<(), IdentityError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentAction {
    Created,
    Updated,
    Deleted,
}

/// One document-change event from the external pub/sub feed.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEvent {
    pub collection: Collection,
    pub action: DocumentAction,
    pub document: StoredDocument,
}

/// Passive consumption of the store's change feed.
pub trait RealtimeFeed: Send + Sync {
    fn subscribe(&self, collection: Collection) -> BoxStream<'static, DocumentEvent>;
}
