//! Registration and author profiles.
//!
//! Accounts live in the identity provider; everything user-facing (display
//! name, bio, avatar, follower count) is a profile document keyed by
//! `userId`. Registration provisions both, generating an avatar with the
//! model when it can and falling back to a deterministic placeholder URL
//! when it cannot.

use std::sync::Arc;

use bytes::Bytes;
use mime_guess::MimeGuess;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::form_urlencoded;
use uuid::Uuid;

use crate::application::collaborators::{
    Account, BlobStore, DocumentQuery, DocumentStore, IdentityError, IdentityProvider, Session,
    StoreError, UploadError,
};
use crate::application::curator::{Curator, AVATAR_FILENAME};
use crate::domain::entities::ProfileRecord;
use crate::domain::types::Collection;

/// Bio given to every fresh profile until the author writes their own.
pub const DEFAULT_BIO: &str = "Just another storyteller on Pedium.";

const AUTHORS_PAGE_SIZE: u32 = 20;

/// Placeholder avatar served by ui-avatars for accounts without a
/// generated or uploaded picture.
pub fn default_avatar_url(name: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();
    format!("https://ui-avatars.com/api/?name={encoded}")
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("no profile exists for user `{user_id}`")]
    NotFound { user_id: String },
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything a completed registration produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub account: Account,
    pub session: Session,
    pub profile: ProfileRecord,
}

/// A replacement avatar supplied by the author.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub payload: Bytes,
    pub filename: String,
}

pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    blobs: Arc<dyn BlobStore>,
    curator: Arc<Curator>,
}

impl ProfileService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        blobs: Arc<dyn BlobStore>,
        curator: Arc<Curator>,
    ) -> Self {
        Self {
            store,
            identity,
            blobs,
            curator,
        }
    }

    /// Registers an account, opens a session for it, and provisions the
    /// profile document.
    ///
    /// The avatar is best-effort: if the model declines or the upload fails
    /// the profile keeps the placeholder URL and registration still succeeds.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Registration, ProfileError> {
        let account = self.identity.create_account(email, password, name).await?;
        let session = self.identity.create_session(email, password).await?;
        info!(user_id = %account.id, "account registered");

        let mut avatar_url = default_avatar_url(name);
        match self.curator.avatar(name).await {
            Ok(Some(image)) => {
                match self
                    .blobs
                    .upload(image.bytes, AVATAR_FILENAME, &image.mime_type)
                    .await
                {
                    Ok(file) => avatar_url = file.url,
                    Err(err) => {
                        warn!(
                            error = %err,
                            "avatar upload failed, keeping placeholder"
                        );
                    }
                }
            }
            Ok(None) => {
                debug!("model produced no avatar, keeping placeholder");
            }
            Err(err) => {
                warn!(
                    error = %err,
                    "avatar generation failed, keeping placeholder"
                );
            }
        }

        let fields = json!({
            "userId": account.id,
            "name": name,
            "bio": DEFAULT_BIO,
            "avatarUrl": avatar_url,
            "followersCount": 0,
        });
        let doc = self
            .store
            .create(Collection::Profiles, &Uuid::new_v4().to_string(), fields)
            .await?;
        let profile = ProfileRecord::from_parts(doc.id, &doc.fields);

        Ok(Registration {
            account,
            session,
            profile,
        })
    }

    /// The profile for `user_id`, if one has been provisioned.
    pub async fn fetch(&self, user_id: &str) -> Result<Option<ProfileRecord>, StoreError> {
        let query = DocumentQuery::new().equal("userId", user_id);
        let docs = self.store.list(Collection::Profiles, &query).await?;
        Ok(docs
            .into_iter()
            .next()
            .map(|doc| ProfileRecord::from_parts(doc.id, &doc.fields)))
    }

    /// Like [`fetch`](Self::fetch), but a missing profile is an error.
    pub async fn require(&self, user_id: &str) -> Result<ProfileRecord, ProfileError> {
        self.fetch(user_id).await?.ok_or_else(|| ProfileError::NotFound {
            user_id: user_id.to_string(),
        })
    }

    /// Saves edited profile fields, replacing the avatar first when a new
    /// one was supplied. A failed avatar upload fails the whole save.
    pub async fn update(
        &self,
        profile: &ProfileRecord,
        name: &str,
        bio: &str,
        avatar: Option<AvatarUpload>,
    ) -> Result<ProfileRecord, ProfileError> {
        let avatar_url = match avatar {
            Some(upload) => {
                let content_type = MimeGuess::from_path(&upload.filename)
                    .first_or_octet_stream()
                    .to_string();
                let file = self
                    .blobs
                    .upload(upload.payload, &upload.filename, &content_type)
                    .await?;
                Some(file.url)
            }
            None => profile.avatar_url.clone(),
        };

        let fields = json!({
            "name": name,
            "bio": bio,
            "avatarUrl": avatar_url,
        });
        let doc = self
            .store
            .update(Collection::Profiles, &profile.id, fields)
            .await?;
        Ok(ProfileRecord::from_parts(doc.id, &doc.fields))
    }

    /// The authors directory, most followed first.
    pub async fn authors(&self) -> Result<Vec<ProfileRecord>, StoreError> {
        let query = DocumentQuery::new()
            .order_desc("followersCount")
            .limit(AUTHORS_PAGE_SIZE);
        let docs = self.store.list(Collection::Profiles, &query).await?;
        Ok(docs
            .into_iter()
            .map(|doc| ProfileRecord::from_parts(doc.id, &doc.fields))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;
    use time::OffsetDateTime;

    use super::*;
    use crate::application::collaborators::{
        AspectRatio, GeneratedImage, GenerationError, GenerativeModel, StoredDocument, StoredFile,
    };

    #[derive(Default)]
    struct RecordingStore {
        list_replies: Mutex<VecDeque<Vec<StoredDocument>>>,
        queries: Mutex<Vec<(Collection, DocumentQuery)>>,
        created: Mutex<Vec<(Collection, Value)>>,
        updated: Mutex<Vec<(Collection, String, Value)>>,
    }

    impl RecordingStore {
        fn reply_with(self, docs: Vec<StoredDocument>) -> Self {
            self.list_replies.lock().unwrap().push_back(docs);
            self
        }
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn create(
            &self,
            collection: Collection,
            id: &str,
            fields: Value,
        ) -> Result<StoredDocument, StoreError> {
            self.created.lock().unwrap().push((collection, fields.clone()));
            Ok(StoredDocument {
                id: id.to_string(),
                created_at: OffsetDateTime::UNIX_EPOCH,
                fields,
            })
        }

        async fn get(&self, _: Collection, _: &str) -> Result<StoredDocument, StoreError> {
            panic!("unexpected get");
        }

        async fn update(
            &self,
            collection: Collection,
            id: &str,
            fields: Value,
        ) -> Result<StoredDocument, StoreError> {
            self.updated
                .lock()
                .unwrap()
                .push((collection, id.to_string(), fields.clone()));
            Ok(StoredDocument {
                id: id.to_string(),
                created_at: OffsetDateTime::UNIX_EPOCH,
                fields,
            })
        }

        async fn delete(&self, _: Collection, _: &str) -> Result<(), StoreError> {
            panic!("unexpected delete");
        }

        async fn list(
            &self,
            collection: Collection,
            query: &DocumentQuery,
        ) -> Result<Vec<StoredDocument>, StoreError> {
            self.queries.lock().unwrap().push((collection, query.clone()));
            Ok(self
                .list_replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }
    }

    struct StubIdentity;

    #[async_trait]
    impl IdentityProvider for StubIdentity {
        async fn current_account(&self) -> Result<Option<Account>, IdentityError> {
            panic!("unexpected current_account");
        }

        async fn create_account(
            &self,
            email: &str,
            _password: &str,
            name: &str,
        ) -> Result<Account, IdentityError> {
            Ok(Account {
                id: "u1".into(),
                name: name.into(),
                email: email.into(),
            })
        }

        async fn create_session(&self, _: &str, _: &str) -> Result<Session, IdentityError> {
            Ok(Session {
                id: "s1".into(),
                secret: "token".into(),
            })
        }

        async fn delete_session(&self) -> Result<(), IdentityError> {
            panic!("unexpected delete_session");
        }
    }

    enum AvatarBehavior {
        Succeed,
        Missing,
        Fail,
    }

    struct StubModel {
        avatar: AvatarBehavior,
    }

    #[async_trait]
    impl GenerativeModel for StubModel {
        async fn generate_text(&self, _: &str) -> Result<String, GenerationError> {
            panic!("unexpected generate_text");
        }

        async fn generate_json(&self, _: &str) -> Result<Value, GenerationError> {
            panic!("unexpected generate_json");
        }

        async fn generate_image(
            &self,
            _prompt: &str,
            aspect: AspectRatio,
        ) -> Result<Option<GeneratedImage>, GenerationError> {
            assert_eq!(aspect, AspectRatio::Square);
            match self.avatar {
                AvatarBehavior::Succeed => Ok(Some(GeneratedImage {
                    bytes: Bytes::from_static(b"png"),
                    mime_type: "image/png".into(),
                })),
                AvatarBehavior::Missing => Ok(None),
                AvatarBehavior::Fail => Err(GenerationError::Empty),
            }
        }
    }

    struct StubBlobs {
        fail: bool,
        uploads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BlobStore for StubBlobs {
        async fn upload(
            &self,
            _payload: Bytes,
            filename: &str,
            _content_type: &str,
        ) -> Result<StoredFile, UploadError> {
            if self.fail {
                return Err(UploadError::transport("offline"));
            }
            self.uploads.lock().unwrap().push(filename.to_string());
            Ok(StoredFile {
                id: "f1".into(),
                url: format!("https://files.example/view/{filename}"),
            })
        }
    }

    fn service(
        store: RecordingStore,
        avatar: AvatarBehavior,
        fail_uploads: bool,
    ) -> (ProfileService, Arc<RecordingStore>, Arc<StubBlobs>) {
        let store = Arc::new(store);
        let blobs = Arc::new(StubBlobs {
            fail: fail_uploads,
            uploads: Mutex::new(Vec::new()),
        });
        let curator = Arc::new(Curator::new(Arc::new(StubModel { avatar })));
        let service = ProfileService::new(
            store.clone(),
            Arc::new(StubIdentity),
            blobs.clone(),
            curator,
        );
        (service, store, blobs)
    }

    fn profile_doc(id: &str, user_id: &str, name: &str, followers: i64) -> StoredDocument {
        StoredDocument {
            id: id.to_string(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            fields: serde_json::json!({
                "userId": user_id,
                "name": name,
                "bio": "hi",
                "avatarUrl": "https://files.example/view/a.png",
                "followersCount": followers,
            }),
        }
    }

    #[test]
    fn placeholder_avatar_url_is_percent_encoded() {
        assert_eq!(
            default_avatar_url("Jane Doe"),
            "https://ui-avatars.com/api/?name=Jane+Doe"
        );
    }

    #[tokio::test]
    async fn signup_provisions_account_session_and_profile() {
        let (service, store, blobs) =
            service(RecordingStore::default(), AvatarBehavior::Succeed, false);

        let registration = service
            .signup("jane@example.com", "secret", "Jane")
            .await
            .unwrap();

        assert_eq!(registration.account.id, "u1");
        assert_eq!(registration.session.secret, "token");
        assert_eq!(
            registration.profile.avatar_url.as_deref(),
            Some("https://files.example/view/avatar.png")
        );
        assert_eq!(blobs.uploads.lock().unwrap().as_slice(), ["avatar.png"]);

        let created = store.created.lock().unwrap();
        let (collection, fields) = &created[0];
        assert_eq!(*collection, Collection::Profiles);
        assert_eq!(fields["userId"], "u1");
        assert_eq!(fields["bio"], DEFAULT_BIO);
        assert_eq!(fields["followersCount"], 0);
    }

    #[tokio::test]
    async fn signup_keeps_placeholder_when_model_declines() {
        let (service, store, _) =
            service(RecordingStore::default(), AvatarBehavior::Missing, false);

        let registration = service.signup("j@e.com", "secret", "Jane Doe").await.unwrap();

        assert_eq!(
            registration.profile.avatar_url.as_deref(),
            Some("https://ui-avatars.com/api/?name=Jane+Doe")
        );
        assert_eq!(store.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn signup_keeps_placeholder_when_generation_fails() {
        let (service, _, _) = service(RecordingStore::default(), AvatarBehavior::Fail, false);

        let registration = service.signup("j@e.com", "secret", "Jane").await.unwrap();

        assert_eq!(
            registration.profile.avatar_url.as_deref(),
            Some("https://ui-avatars.com/api/?name=Jane")
        );
    }

    #[tokio::test]
    async fn signup_keeps_placeholder_when_upload_fails() {
        let (service, _, _) = service(RecordingStore::default(), AvatarBehavior::Succeed, true);

        let registration = service.signup("j@e.com", "secret", "Jane").await.unwrap();

        assert_eq!(
            registration.profile.avatar_url.as_deref(),
            Some("https://ui-avatars.com/api/?name=Jane")
        );
    }

    #[tokio::test]
    async fn fetch_maps_the_first_matching_profile() {
        let store = RecordingStore::default().reply_with(vec![profile_doc("p1", "u1", "Ann", 4)]);
        let (service, store, _) = service(store, AvatarBehavior::Fail, false);

        let profile = service.fetch("u1").await.unwrap().unwrap();
        assert_eq!(profile.id, "p1");
        assert_eq!(profile.name, "Ann");
        assert_eq!(profile.followers_count, 4);

        let queries = store.queries.lock().unwrap();
        let (collection, query) = &queries[0];
        assert_eq!(*collection, Collection::Profiles);
        assert_eq!(query.filters[0].field, "userId");
    }

    #[tokio::test]
    async fn require_surfaces_the_missing_profile() {
        let store = RecordingStore::default().reply_with(Vec::new());
        let (service, _, _) = service(store, AvatarBehavior::Fail, false);

        let err = service.require("ghost").await.unwrap_err();
        assert!(matches!(err, ProfileError::NotFound { user_id } if user_id == "ghost"));
    }

    #[tokio::test]
    async fn update_replaces_avatar_before_saving() {
        let (service, store, blobs) =
            service(RecordingStore::default(), AvatarBehavior::Fail, false);
        let profile = ProfileRecord::from_parts("p1".into(), &serde_json::json!({"userId": "u1"}));

        let updated = service
            .update(
                &profile,
                "Ann",
                "writes here",
                Some(AvatarUpload {
                    payload: Bytes::from_static(b"img"),
                    filename: "me.png".into(),
                }),
            )
            .await
            .unwrap();

        assert_eq!(blobs.uploads.lock().unwrap().as_slice(), ["me.png"]);
        assert_eq!(
            updated.avatar_url.as_deref(),
            Some("https://files.example/view/me.png")
        );
        let updates = store.updated.lock().unwrap();
        assert_eq!(updates[0].1, "p1");
        assert_eq!(updates[0].2["name"], "Ann");
        assert_eq!(updates[0].2["bio"], "writes here");
    }

    #[tokio::test]
    async fn update_keeps_the_current_avatar_without_a_new_upload() {
        let (service, store, blobs) =
            service(RecordingStore::default(), AvatarBehavior::Fail, false);
        let profile = ProfileRecord::from_parts(
            "p1".into(),
            &serde_json::json!({"userId": "u1", "avatarUrl": "https://files.example/view/old.png"}),
        );

        service.update(&profile, "Ann", "bio", None).await.unwrap();

        assert!(blobs.uploads.lock().unwrap().is_empty());
        let updates = store.updated.lock().unwrap();
        assert_eq!(updates[0].2["avatarUrl"], "https://files.example/view/old.png");
    }

    #[tokio::test]
    async fn authors_directory_orders_by_follower_count() {
        let store = RecordingStore::default().reply_with(vec![
            profile_doc("p2", "u2", "Bea", 9),
            profile_doc("p1", "u1", "Ann", 4),
        ]);
        let (service, store, _) = service(store, AvatarBehavior::Fail, false);

        let authors = service.authors().await.unwrap();
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].name, "Bea");

        let queries = store.queries.lock().unwrap();
        let (_, query) = &queries[0];
        assert_eq!(query.order.as_ref().unwrap().field, "followersCount");
        assert_eq!(query.limit, Some(20));
    }
}
