//! Editor session adapter.
//!
//! Bridges the block document model to an interactive editor surface.
//! Sessions are keyed by the holder they are mounted in; opening a session
//! for a holder that already has one tears the old session down first, and
//! closing is idempotent. Each session exposes a change feed that always
//! carries a full document snapshot and supports exactly one subscriber:
//! subscribing again replaces the previous subscription.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::application::collaborators::BlobStore;
use crate::domain::document::BlockDocument;

#[derive(Debug, Error)]
pub enum AuthoringError {
    #[error("no editor session for holder `{holder}`")]
    SessionNotFound { holder: String },
}

impl AuthoringError {
    pub fn session_not_found(holder: impl Into<String>) -> Self {
        Self::SessionNotFound {
            holder: holder.into(),
        }
    }
}

/// Editor-facing outcome of an inline image upload.
///
/// The editor protocol wants `{"success": 1, "file": {"url": ...}}` on
/// success and `{"success": 0}` on failure; upload error detail stays in
/// the logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineUploadOutcome {
    pub success: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<InlineUploadFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineUploadFile {
    pub url: String,
}

impl InlineUploadOutcome {
    pub fn accepted(url: impl Into<String>) -> Self {
        Self {
            success: 1,
            file: Some(InlineUploadFile { url: url.into() }),
        }
    }

    pub fn rejected() -> Self {
        Self {
            success: 0,
            file: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.success == 1
    }
}

struct EditorSession {
    document: BlockDocument,
    changes: watch::Sender<BlockDocument>,
}

impl EditorSession {
    fn new(document: BlockDocument) -> Self {
        let (changes, _initial) = watch::channel(document.clone());
        Self { document, changes }
    }
}

/// Holder-keyed registry of live editor sessions.
pub struct AuthoringService {
    blobs: Arc<dyn BlobStore>,
    sessions: DashMap<String, EditorSession>,
}

impl AuthoringService {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            sessions: DashMap::new(),
        }
    }

    /// Open a session for `holder`, seeded with `initial` or an empty
    /// document. An existing session for the same holder is torn down,
    /// closing its change feed.
    pub fn open_session(&self, holder: impl Into<String>, initial: Option<BlockDocument>) {
        let holder = holder.into();
        let document = initial.unwrap_or_else(BlockDocument::empty);
        let replaced = self
            .sessions
            .insert(holder.clone(), EditorSession::new(document));
        if replaced.is_some() {
            info!(%holder, "replaced existing editor session");
        } else {
            debug!(%holder, "opened editor session");
        }
    }

    /// Replace the session's document with a full snapshot and notify the
    /// change feed. Covers both programmatic loads and editor-driven edits.
    pub fn set_document(
        &self,
        holder: &str,
        document: BlockDocument,
    ) -> Result<(), AuthoringError> {
        let mut session = self
            .sessions
            .get_mut(holder)
            .ok_or_else(|| AuthoringError::session_not_found(holder))?;
        session.document = document.clone();
        session.changes.send_replace(document);
        Ok(())
    }

    /// Current full snapshot of the session's document.
    pub fn snapshot(&self, holder: &str) -> Result<BlockDocument, AuthoringError> {
        let session = self
            .sessions
            .get(holder)
            .ok_or_else(|| AuthoringError::session_not_found(holder))?;
        Ok(session.document.clone())
    }

    /// Subscribe to the session's change feed.
    ///
    /// The receiver starts at the current snapshot and then observes every
    /// full snapshot passed to [`set_document`](Self::set_document). Any
    /// previous subscription is disconnected.
    pub fn changes(&self, holder: &str) -> Result<watch::Receiver<BlockDocument>, AuthoringError> {
        let mut session = self
            .sessions
            .get_mut(holder)
            .ok_or_else(|| AuthoringError::session_not_found(holder))?;
        let (sender, receiver) = watch::channel(session.document.clone());
        session.changes = sender;
        Ok(receiver)
    }

    /// Upload an image dropped into the editor and answer in the editor's
    /// own result shape. Failures are logged and reported as `success: 0`.
    pub async fn upload_inline_image(&self, payload: Bytes, filename: &str) -> InlineUploadOutcome {
        let content_type = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string();
        match self.blobs.upload(payload, filename, &content_type).await {
            Ok(file) => {
                debug!(
                    %filename,
                    file_id = %file.id,
                    "inline image uploaded"
                );
                InlineUploadOutcome::accepted(file.url)
            }
            Err(reason) => {
                warn!(%filename, %reason, "inline image upload failed");
                InlineUploadOutcome::rejected()
            }
        }
    }

    /// Tear down the session for `holder`. Closing a holder with no open
    /// session is a no-op; returns whether a session existed.
    pub fn close_session(&self, holder: &str) -> bool {
        let existed = self.sessions.remove(holder).is_some();
        if existed {
            debug!(%holder, "closed editor session");
        }
        existed
    }
}
