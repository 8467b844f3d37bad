//! Notifications and live story alerts.
//!
//! Two delivery paths coexist. Follow notifications are documents in the
//! store, listed and marked read here. New-story alerts are never
//! persisted: they are filtered out of the store's realtime feed while a
//! reader is connected and vanish with the connection.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::json;
use tracing::warn;

use crate::application::collaborators::{
    DocumentAction, DocumentQuery, DocumentStore, RealtimeFeed, StoreError,
};
use crate::domain::entities::{ArticleRecord, NotificationRecord};
use crate::domain::types::Collection;

const NOTIFICATIONS_PAGE_SIZE: u32 = 20;

/// A transient "someone you follow just published" alert.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryAlert {
    pub article_id: String,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub title: String,
    pub message: String,
    pub link: String,
}

impl StoryAlert {
    fn announce(article: &ArticleRecord) -> Self {
        Self {
            article_id: article.id.clone(),
            author_name: article.author_name.clone(),
            author_avatar: article.author_avatar.clone(),
            title: article.title.clone(),
            message: format!(
                "New story by {}: \"{}\"",
                article.author_name, article.title
            ),
            link: format!("/article/{}", article.id),
        }
    }
}

pub struct NoticeService {
    store: Arc<dyn DocumentStore>,
    realtime: Arc<dyn RealtimeFeed>,
}

impl NoticeService {
    pub fn new(store: Arc<dyn DocumentStore>, realtime: Arc<dyn RealtimeFeed>) -> Self {
        Self { store, realtime }
    }

    /// The newest page of notifications for `user_id`. Fetch errors degrade
    /// to an empty list so a broken notification pane never takes the rest
    /// of the session down with it.
    pub async fn notifications(&self, user_id: &str) -> Vec<NotificationRecord> {
        let query = DocumentQuery::new()
            .equal("userId", user_id)
            .order_desc("$createdAt")
            .limit(NOTIFICATIONS_PAGE_SIZE);
        match self.store.list(Collection::Notifications, &query).await {
            Ok(docs) => docs
                .into_iter()
                .map(|doc| NotificationRecord::from_parts(doc.id, doc.created_at, &doc.fields))
                .collect(),
            Err(err) => {
                warn!(user_id, error = %err, "notification fetch failed");
                Vec::new()
            }
        }
    }

    pub async fn unread_count(&self, user_id: &str) -> usize {
        self.notifications(user_id)
            .await
            .iter()
            .filter(|notification| !notification.read)
            .count()
    }

    /// Marks one notification read, writing the `isRead` spelling the
    /// collection has always stored. Failures only log.
    pub async fn mark_read(&self, notification_id: &str) -> bool {
        match self
            .store
            .update(
                Collection::Notifications,
                notification_id,
                json!({ "isRead": true }),
            )
            .await
        {
            Ok(_) => true,
            Err(err) => {
                warn!(notification_id, error = %err, "failed to mark notification read");
                false
            }
        }
    }

    /// Alerts for new articles by any author in `following`.
    ///
    /// Only create events pass the filter; edits and deletions stay silent.
    pub fn story_alerts(&self, following: HashSet<String>) -> BoxStream<'static, StoryAlert> {
        self.realtime
            .subscribe(Collection::Articles)
            .filter_map(move |event| {
                let alert = match event.action {
                    DocumentAction::Created => {
                        let article = ArticleRecord::from_parts(
                            event.document.id,
                            event.document.created_at,
                            &event.document.fields,
                        );
                        following
                            .contains(&article.author_id)
                            .then(|| StoryAlert::announce(&article))
                    }
                    _ => None,
                };
                future::ready(alert)
            })
            .boxed()
    }

    /// Loads who `user_id` follows, then streams their story alerts.
    pub async fn alerts_for(&self, user_id: &str) -> Result<BoxStream<'static, StoryAlert>, StoreError> {
        let query = DocumentQuery::new().equal("follower_id", user_id);
        let follows = self.store.list(Collection::Follows, &query).await?;
        let following: HashSet<String> = follows
            .into_iter()
            .filter_map(|doc| {
                doc.fields
                    .get("following_id")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
            })
            .collect();
        Ok(self.story_alerts(following))
    }
}
