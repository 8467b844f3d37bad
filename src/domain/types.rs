//! Shared domain enumerations aligned with the backing document store.

use serde::{Deserialize, Serialize};

/// Document collections owned by the external store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Profiles,
    Articles,
    Comments,
    Likes,
    Follows,
    Notifications,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Profiles => "profiles",
            Collection::Articles => "articles",
            Collection::Comments => "comments",
            Collection::Likes => "likes",
            Collection::Follows => "follows",
            Collection::Notifications => "notifications",
        }
    }
}

/// Storage buckets owned by the external store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Images,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Images => "images",
        }
    }
}

/// Kinds of persisted user notifications. New-story alerts are delivered
/// live over the realtime feed and never written to the store, so follows
/// are the only persisted kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Follow,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Follow => "follow",
        }
    }
}

impl TryFrom<&str> for NotificationKind {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "follow" => Ok(NotificationKind::Follow),
            _ => Err(()),
        }
    }
}
