//! Follows, likes, and comments.
//!
//! Engagement is denormalized the way the store expects it: likes and
//! follows keep the counters on the parent article or profile in step, and
//! comments carry the author's display name and avatar from the moment of
//! posting. The like counter write-back and the follow notification are
//! best-effort; the records themselves are not.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::collaborators::{Account, DocumentQuery, DocumentStore, StoreError};
use crate::application::profiles::default_avatar_url;
use crate::domain::entities::{ArticleRecord, CommentRecord, FollowRecord, ProfileRecord};
use crate::domain::types::{Collection, NotificationKind};

#[derive(Debug, Error)]
pub enum EngagementError {
    #[error("comment text is empty")]
    EmptyComment,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a like toggle, with the counter as written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggle {
    pub liked: bool,
    pub likes_count: i64,
}

pub struct EngagementService {
    store: Arc<dyn DocumentStore>,
}

impl EngagementService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// The follow edge from `follower_id` to `following_id`, if present.
    pub async fn find_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<Option<FollowRecord>, StoreError> {
        let query = DocumentQuery::new()
            .equal("follower_id", follower_id)
            .equal("following_id", following_id);
        let docs = self.store.list(Collection::Follows, &query).await?;
        Ok(docs
            .into_iter()
            .next()
            .map(|doc| FollowRecord::from_parts(doc.id, &doc.fields)))
    }

    pub async fn is_following(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.find_follow(follower_id, following_id).await?.is_some())
    }

    /// Every author `user_id` follows.
    pub async fn following(&self, user_id: &str) -> Result<Vec<FollowRecord>, StoreError> {
        let query = DocumentQuery::new().equal("follower_id", user_id);
        let docs = self.store.list(Collection::Follows, &query).await?;
        Ok(docs
            .into_iter()
            .map(|doc| FollowRecord::from_parts(doc.id, &doc.fields))
            .collect())
    }

    /// Follows or unfollows, returning whether the edge now exists.
    ///
    /// The follower counter lives denormalized on the followed author's
    /// profile and is adjusted in the same pass; when that profile cannot be
    /// found the counter is left alone. The courtesy notification for a new
    /// follower is best-effort and never fails the toggle.
    pub async fn toggle_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, StoreError> {
        let existing = self.find_follow(follower_id, following_id).await?;
        let follower_profile = self.lookup_profile(follower_id).await;
        let following_profile = self.lookup_profile(following_id).await;

        if let Some(edge) = existing {
            self.store.delete(Collection::Follows, &edge.id).await?;
            if let Some(profile) = following_profile {
                let count = (profile.followers_count - 1).max(0);
                self.store
                    .update(
                        Collection::Profiles,
                        &profile.id,
                        json!({ "followersCount": count }),
                    )
                    .await?;
            }
            debug!(follower_id, following_id, "unfollowed");
            return Ok(false);
        }

        let fields = json!({
            "follower_id": follower_id,
            "following_id": following_id,
        });
        self.store
            .create(Collection::Follows, &Uuid::new_v4().to_string(), fields)
            .await?;
        if let Some(profile) = &following_profile {
            self.store
                .update(
                    Collection::Profiles,
                    &profile.id,
                    json!({ "followersCount": profile.followers_count + 1 }),
                )
                .await?;
        }

        let follower_name = follower_profile
            .as_ref()
            .map(|profile| profile.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("Someone");
        let notification = json!({
            "userId": following_id,
            "type": NotificationKind::Follow.as_str(),
            "message": format!("{follower_name} started following you"),
            "link": format!("/profile/{follower_id}"),
        });
        if let Err(err) = self
            .store
            .create(
                Collection::Notifications,
                &Uuid::new_v4().to_string(),
                notification,
            )
            .await
        {
            warn!(error = %err, "failed to create follow notification");
        }
        debug!(follower_id, following_id, "followed");
        Ok(true)
    }

    pub async fn has_liked(&self, article_id: &str, user_id: &str) -> Result<bool, StoreError> {
        let query = DocumentQuery::new()
            .equal("articleId", article_id)
            .equal("userId", user_id);
        Ok(!self.store.list(Collection::Likes, &query).await?.is_empty())
    }

    /// Likes or unlikes an article for `user_id`.
    ///
    /// The `likesCount` counter on the article is written back after the
    /// like record changes; a failed counter write leaves the like itself
    /// in place and only logs.
    pub async fn toggle_like(
        &self,
        article_id: &str,
        user_id: &str,
    ) -> Result<LikeToggle, StoreError> {
        let doc = self.store.get(Collection::Articles, article_id).await?;
        let article = ArticleRecord::from_parts(doc.id, doc.created_at, &doc.fields);

        let query = DocumentQuery::new()
            .equal("articleId", article_id)
            .equal("userId", user_id);
        let existing = self.store.list(Collection::Likes, &query).await?;

        let toggle = match existing.first() {
            Some(like) => {
                self.store.delete(Collection::Likes, &like.id).await?;
                LikeToggle {
                    liked: false,
                    likes_count: (article.likes_count - 1).max(0),
                }
            }
            None => {
                let fields = json!({ "articleId": article_id, "userId": user_id });
                self.store
                    .create(Collection::Likes, &Uuid::new_v4().to_string(), fields)
                    .await?;
                LikeToggle {
                    liked: true,
                    likes_count: article.likes_count + 1,
                }
            }
        };

        if let Err(err) = self
            .store
            .update(
                Collection::Articles,
                article_id,
                json!({ "likesCount": toggle.likes_count }),
            )
            .await
        {
            warn!(article_id, error = %err, "failed to write back likesCount");
        }
        Ok(toggle)
    }

    /// Comments on an article, newest first.
    pub async fn comments(&self, article_id: &str) -> Result<Vec<CommentRecord>, StoreError> {
        let query = DocumentQuery::new()
            .equal("articleId", article_id)
            .order_desc("$createdAt");
        let docs = self.store.list(Collection::Comments, &query).await?;
        Ok(docs
            .into_iter()
            .map(|doc| CommentRecord::from_parts(doc.id, doc.created_at, &doc.fields))
            .collect())
    }

    /// Posts a comment, denormalizing the commenter's current display name
    /// and avatar onto the document.
    pub async fn post_comment(
        &self,
        article_id: &str,
        account: &Account,
        content: &str,
    ) -> Result<CommentRecord, EngagementError> {
        if content.trim().is_empty() {
            return Err(EngagementError::EmptyComment);
        }

        let profile = self.lookup_profile(&account.id).await;
        let user_name = profile
            .as_ref()
            .map(|profile| profile.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(&account.name)
            .to_string();
        let user_avatar = profile
            .as_ref()
            .and_then(|profile| profile.avatar_url.clone())
            .filter(|url| url.starts_with("http"))
            .unwrap_or_else(|| default_avatar_url(&account.name));

        let fields = json!({
            "articleId": article_id,
            "userId": account.id,
            "userName": user_name,
            "userAvatar": user_avatar,
            "content": content,
        });
        let doc = self
            .store
            .create(Collection::Comments, &Uuid::new_v4().to_string(), fields)
            .await?;
        Ok(CommentRecord::from_parts(doc.id, doc.created_at, &doc.fields))
    }

    /// Profile lookups on engagement paths degrade to `None` instead of
    /// failing the write they decorate.
    async fn lookup_profile(&self, user_id: &str) -> Option<ProfileRecord> {
        let query = DocumentQuery::new().equal("userId", user_id);
        match self.store.list(Collection::Profiles, &query).await {
            Ok(docs) => docs
                .into_iter()
                .next()
                .map(|doc| ProfileRecord::from_parts(doc.id, &doc.fields)),
            Err(err) => {
                warn!(user_id, error = %err, "profile lookup failed");
                None
            }
        }
    }
}
