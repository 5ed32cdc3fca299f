//! Collection model (named groups of saved posts)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

/// Name given to the collection every actor starts with
pub const DEFAULT_COLLECTION_NAME: &str = "Saved";

/// A collection owned by one actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Unique identifier
    pub id: Uuid,
    /// Owner
    pub user_id: Uuid,
    /// Display name
    pub name: String,
    /// Whether this is the owner's default collection
    #[serde(default)]
    pub is_default: bool,
    /// When the collection was created
    pub created_at: DateTime<Utc>,
}

impl Collection {
    /// Create a new, non-default collection
    pub fn new(user_id: Uuid, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.trim().to_string(),
            is_default: false,
            created_at: Utc::now(),
        }
    }

    /// Create the default collection for `user_id`
    pub fn default_for(user_id: Uuid) -> Self {
        Self {
            is_default: true,
            ..Self::new(user_id, DEFAULT_COLLECTION_NAME)
        }
    }
}

/// Collection names must contain something besides whitespace
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        Err(ValidationError::EmptyField("collection name"))
    } else {
        Ok(())
    }
}
