//! Domain entities mirrored from the external document store.
//!
//! Store documents are loosely typed JSON; the `from_parts` constructors map
//! them leniently, defaulting absent or mistyped fields instead of failing,
//! since the backing collections evolved schema-first and older documents
//! may predate newer attributes (`summary` in particular).

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::domain::types::NotificationKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleRecord {
    pub id: String,
    pub title: String,
    /// Serialized block-tree document, parsed on demand.
    pub content: String,
    pub cover_image: Option<String>,
    pub author_id: String,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub excerpt: String,
    pub summary: Option<String>,
    pub views: i64,
    pub likes_count: i64,
    pub tags: Vec<String>,
    pub created_at: OffsetDateTime,
}

impl ArticleRecord {
    pub fn from_parts(id: String, created_at: OffsetDateTime, fields: &Value) -> Self {
        Self {
            id,
            title: str_field(fields, "title"),
            content: str_field(fields, "content"),
            cover_image: opt_str_field(fields, "coverImage"),
            author_id: str_field(fields, "authorId"),
            author_name: str_field(fields, "authorName"),
            author_avatar: opt_str_field(fields, "authorAvatar"),
            excerpt: str_field(fields, "excerpt"),
            summary: opt_str_field(fields, "summary"),
            views: i64_field(fields, "views"),
            likes_count: i64_field(fields, "likesCount"),
            tags: str_list_field(fields, "tags"),
            created_at,
        }
    }

    /// Case-insensitive match over title, tags, and raw content, the same
    /// fields the feed search has always looked at.
    pub fn matches_query(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&needle))
            || self.content.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub followers_count: i64,
}

impl ProfileRecord {
    pub fn from_parts(id: String, fields: &Value) -> Self {
        Self {
            id,
            user_id: str_field(fields, "userId"),
            name: str_field(fields, "name"),
            bio: opt_str_field(fields, "bio"),
            avatar_url: opt_str_field(fields, "avatarUrl"),
            followers_count: i64_field(fields, "followersCount"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: String,
    pub article_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub content: String,
    pub created_at: OffsetDateTime,
}

impl CommentRecord {
    pub fn from_parts(id: String, created_at: OffsetDateTime, fields: &Value) -> Self {
        Self {
            id,
            article_id: str_field(fields, "articleId"),
            user_id: str_field(fields, "userId"),
            user_name: str_field(fields, "userName"),
            user_avatar: opt_str_field(fields, "userAvatar"),
            content: str_field(fields, "content"),
            created_at,
        }
    }
}

/// One follow edge. The store keeps these attributes snake_cased, unlike
/// every other collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowRecord {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
}

impl FollowRecord {
    pub fn from_parts(id: String, fields: &Value) -> Self {
        Self {
            id,
            follower_id: str_field(fields, "follower_id"),
            following_id: str_field(fields, "following_id"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: String,
    pub kind: Option<NotificationKind>,
    pub message: String,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: OffsetDateTime,
}

impl NotificationRecord {
    pub fn from_parts(id: String, created_at: OffsetDateTime, fields: &Value) -> Self {
        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .and_then(|raw| NotificationKind::try_from(raw).ok());
        // Older documents wrote `isRead`, newer ones `read`.
        let read = fields
            .get("read")
            .or_else(|| fields.get("isRead"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Self {
            id,
            user_id: str_field(fields, "userId"),
            kind,
            message: str_field(fields, "message"),
            link: opt_str_field(fields, "link"),
            read,
            created_at,
        }
    }
}

fn str_field(fields: &Value, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn opt_str_field(fields: &Value, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn i64_field(fields: &Value, key: &str) -> i64 {
    fields.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn str_list_field(fields: &Value, key: &str) -> Vec<String> {
    fields
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn article_mapping_defaults_missing_fields() {
        let fields = json!({
            "title": "Hello",
            "content": "{\"blocks\":[]}",
            "authorId": "u1",
            "tags": ["rust", 7, "blocks"]
        });
        let record =
            ArticleRecord::from_parts("a1".into(), OffsetDateTime::UNIX_EPOCH, &fields);

        assert_eq!(record.title, "Hello");
        assert_eq!(record.cover_image, None);
        assert_eq!(record.summary, None);
        assert_eq!(record.views, 0);
        assert_eq!(record.tags, vec!["rust".to_string(), "blocks".to_string()]);
    }

    #[test]
    fn article_search_covers_title_tags_and_content() {
        let fields = json!({
            "title": "Systems Thinking",
            "content": "{\"blocks\":[{\"type\":\"paragraph\",\"data\":{\"text\":\"ownership\"}}]}",
            "tags": ["Programming"]
        });
        let record =
            ArticleRecord::from_parts("a1".into(), OffsetDateTime::UNIX_EPOCH, &fields);

        assert!(record.matches_query("systems"));
        assert!(record.matches_query("programming"));
        assert!(record.matches_query("OWNERSHIP"));
        assert!(record.matches_query(""));
        assert!(!record.matches_query("quantum"));
    }

    #[test]
    fn notification_mapping_accepts_both_read_spellings() {
        let fields = json!({"userId": "u1", "type": "follow", "message": "m", "isRead": true});
        let record =
            NotificationRecord::from_parts("n1".into(), OffsetDateTime::UNIX_EPOCH, &fields);
        assert!(record.read);
        assert_eq!(record.kind, Some(NotificationKind::Follow));

        let fields = json!({"userId": "u1", "type": "mystery", "message": "m"});
        let record =
            NotificationRecord::from_parts("n2".into(), OffsetDateTime::UNIX_EPOCH, &fields);
        assert!(!record.read);
        assert_eq!(record.kind, None);
    }
}
