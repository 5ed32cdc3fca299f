//! Relationship edges and the activity rows written alongside them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A like of a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    /// Who liked
    pub user_id: Uuid,
    /// What was liked
    pub post_id: Uuid,
    /// When
    pub created_at: DateTime<Utc>,
}

/// A follow of one actor by another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    /// Who follows
    pub follower_id: Uuid,
    /// Who is followed
    pub following_id: Uuid,
    /// When
    pub created_at: DateTime<Utc>,
}

/// A post saved into one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Save {
    /// Who saved
    pub user_id: Uuid,
    /// What was saved
    pub post_id: Uuid,
    /// Where it was saved
    pub collection_id: Uuid,
    /// When
    pub created_at: DateTime<Utc>,
}

/// Kind of relationship an activity row records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// A post was liked
    Like,
    /// An actor was followed
    Follow,
    /// A post was saved to a collection
    Save,
}

impl ActivityKind {
    /// Get kind as the stored string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Follow => "follow",
            Self::Save => "save",
        }
    }

    /// Get the emoji icon
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::Like => "♥",
            Self::Follow => "👤",
            Self::Save => "🔖",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A denormalized notification-feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Who acted
    pub actor_id: Uuid,
    /// Who is notified (post author or followed actor)
    pub target_user_id: Option<Uuid>,
    /// Post involved; null for follows
    pub post_id: Option<Uuid>,
    /// Collection involved; saves only
    #[serde(default)]
    pub collection_id: Option<Uuid>,
    /// What happened
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    /// When
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// Activity for a like of `post_id` written by `author_id`
    pub fn like(actor_id: Uuid, post_id: Uuid, author_id: Uuid) -> Self {
        Self {
            actor_id,
            target_user_id: Some(author_id),
            post_id: Some(post_id),
            collection_id: None,
            kind: ActivityKind::Like,
            created_at: Utc::now(),
        }
    }

    /// Activity for a follow; carries no post
    pub fn follow(actor_id: Uuid, target_id: Uuid) -> Self {
        Self {
            actor_id,
            target_user_id: Some(target_id),
            post_id: None,
            collection_id: None,
            kind: ActivityKind::Follow,
            created_at: Utc::now(),
        }
    }

    /// Activity for saving `post_id` into `collection_id`
    pub fn save(actor_id: Uuid, post_id: Uuid, author_id: Option<Uuid>, collection_id: Uuid) -> Self {
        Self {
            actor_id,
            target_user_id: author_id,
            post_id: Some(post_id),
            collection_id: Some(collection_id),
            kind: ActivityKind::Save,
            created_at: Utc::now(),
        }
    }
}
