//! Local on-disk state: draft autosave, viewed-article markers and the
//! persisted session token.
//!
//! Everything lives as one small file per key under the state directory,
//! written atomically via a temp file so a crash mid-write never leaves a
//! half-serialized draft behind.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::error::InfraError;

/// File holding the single autosaved draft.
const DRAFT_FILE: &str = "pedium_draft_v1.json";
/// File holding the persisted session credentials.
const SESSION_FILE: &str = "session.json";

/// A work-in-progress article captured by autosave and restored when
/// authoring resumes. `tags` stays in its raw comma-separated input form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub title: String,
    pub tags: String,
    pub content: Value,
    /// Capture time, unix milliseconds.
    pub timestamp: i64,
}

impl DraftSnapshot {
    pub fn new(title: String, tags: String, content: Value) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            title,
            tags,
            content,
            timestamp: (now.unix_timestamp_nanos() / 1_000_000) as i64,
        }
    }

    /// True when there is nothing worth saving: no title, no tags and no
    /// content blocks.
    pub fn is_empty(&self) -> bool {
        let no_blocks = self
            .content
            .pointer("/blocks")
            .and_then(Value::as_array)
            .map(Vec::is_empty)
            .unwrap_or(true);
        self.title.is_empty() && self.tags.is_empty() && no_blocks
    }
}

/// Session credentials surviving across process runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub id: String,
    pub secret: String,
}

/// File-per-key store rooted at the configured state directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: &Path) -> Result<Self, InfraError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn load_draft(&self) -> Result<Option<DraftSnapshot>, InfraError> {
        self.read_json(DRAFT_FILE)
    }

    pub fn save_draft(&self, draft: &DraftSnapshot) -> Result<(), InfraError> {
        debug!(title = %draft.title, "saving draft snapshot");
        self.write_json(DRAFT_FILE, draft)
    }

    pub fn clear_draft(&self) -> Result<(), InfraError> {
        self.remove(DRAFT_FILE)
    }

    /// Record that an article has been read from this machine. Returns
    /// `true` only the first time, so a view is counted at most once per
    /// state directory.
    pub fn mark_viewed(&self, article_id: &str) -> Result<bool, InfraError> {
        let path = self.dir.join(format!("viewed_article_{article_id}"));
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut marker) => {
                marker.write_all(b"true")?;
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub fn load_session(&self) -> Result<Option<PersistedSession>, InfraError> {
        self.read_json(SESSION_FILE)
    }

    pub fn save_session(&self, session: &PersistedSession) -> Result<(), InfraError> {
        self.write_json(SESSION_FILE, session)
    }

    pub fn clear_session(&self) -> Result<(), InfraError> {
        self.remove(SESSION_FILE)
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, InfraError> {
        let path = self.dir.join(name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(reason) => {
                // A corrupt state file is abandoned, not fatal.
                warn!(file = name, %reason, "discarding unreadable state file");
                Ok(None)
            }
        }
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), InfraError> {
        let payload = serde_json::to_vec_pretty(value)
            .map_err(|err| InfraError::state(format!("serializing {name}: {err}")))?;
        let mut file = tempfile::Builder::new().tempfile_in(&self.dir)?;
        file.write_all(&payload)?;
        file.flush()?;
        file.persist(self.dir.join(name))
            .map_err(|err| InfraError::Io(err.error))?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), InfraError> {
        match fs::remove_file(self.dir.join(name)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn store(dir: &TempDir) -> StateStore {
        StateStore::new(dir.path()).expect("state dir")
    }

    #[test]
    fn draft_round_trips_through_disk() {
        let dir = TempDir::new().expect("tempdir");
        let state = store(&dir);

        let draft = DraftSnapshot::new(
            "Unfinished thoughts".into(),
            "rust, databases".into(),
            json!({"blocks": [{"type": "paragraph", "data": {"text": "wip"}}]}),
        );
        state.save_draft(&draft).expect("save");

        let restored = state.load_draft().expect("load").expect("present");
        assert_eq!(restored, draft);
    }

    #[test]
    fn missing_and_cleared_drafts_load_as_none() {
        let dir = TempDir::new().expect("tempdir");
        let state = store(&dir);

        assert!(state.load_draft().expect("load").is_none());

        let draft = DraftSnapshot::new("t".into(), String::new(), json!({"blocks": []}));
        state.save_draft(&draft).expect("save");
        state.clear_draft().expect("clear");
        state.clear_draft().expect("clear twice");
        assert!(state.load_draft().expect("load").is_none());
    }

    #[test]
    fn corrupt_draft_is_discarded() {
        let dir = TempDir::new().expect("tempdir");
        let state = store(&dir);

        std::fs::write(dir.path().join(DRAFT_FILE), "{not json").expect("write");
        assert!(state.load_draft().expect("load").is_none());
    }

    #[test]
    fn empty_snapshot_detection_checks_blocks() {
        let blank = DraftSnapshot::new(String::new(), String::new(), json!({"blocks": []}));
        assert!(blank.is_empty());

        let titled = DraftSnapshot::new("T".into(), String::new(), json!({"blocks": []}));
        assert!(!titled.is_empty());

        let written = DraftSnapshot::new(
            String::new(),
            String::new(),
            json!({"blocks": [{"type": "paragraph", "data": {"text": "hi"}}]}),
        );
        assert!(!written.is_empty());
    }

    #[test]
    fn first_view_is_counted_once() {
        let dir = TempDir::new().expect("tempdir");
        let state = store(&dir);

        assert!(state.mark_viewed("article-1").expect("mark"));
        assert!(!state.mark_viewed("article-1").expect("mark again"));
        assert!(state.mark_viewed("article-2").expect("other article"));
    }

    #[test]
    fn session_persists_and_clears() {
        let dir = TempDir::new().expect("tempdir");
        let state = store(&dir);

        assert!(state.load_session().expect("load").is_none());
        let session = PersistedSession {
            id: "sess-1".into(),
            secret: "s3cret".into(),
        };
        state.save_session(&session).expect("save");
        assert_eq!(state.load_session().expect("load"), Some(session));

        state.clear_session().expect("clear");
        assert!(state.load_session().expect("load").is_none());
    }
}
