//! Actor (user profile) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

/// A user profile as stored in the `users` relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Unique identifier
    pub id: Uuid,
    /// Handle (unique, no whitespace)
    pub handle: String,
    /// Display name (for UI)
    pub display_name: String,
    /// Short bio
    #[serde(default)]
    pub bio: Option<String>,
    /// Avatar reference in object storage
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// When the profile was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// The subset of a profile embedded into feed rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSummary {
    /// Unique identifier
    pub id: Uuid,
    /// Handle
    pub handle: String,
    /// Display name
    #[serde(default)]
    pub display_name: String,
    /// Avatar reference
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Actor {
    /// Create a new profile
    pub fn new(handle: &str, display_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle: handle.to_string(),
            display_name: display_name.to_string(),
            bio: None,
            avatar_url: None,
            created_at: Utc::now(),
        }
    }

    /// Get the handle with a leading `@`
    pub fn full_handle(&self) -> String {
        format!("@{}", self.handle)
    }
}

/// Handles are non-empty and contain no whitespace
pub fn validate_handle(handle: &str) -> Result<(), ValidationError> {
    if handle.is_empty() {
        return Err(ValidationError::EmptyField("handle"));
    }
    if handle.chars().any(char::is_whitespace) {
        return Err(ValidationError::HandleWhitespace(handle.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_with_space_is_rejected() {
        assert_eq!(
            validate_handle("mira k"),
            Err(ValidationError::HandleWhitespace("mira k".to_string()))
        );
        assert!(validate_handle("").is_err());
        assert!(validate_handle("mira_k").is_ok());
    }

    #[test]
    fn full_handle_prefixes_at() {
        let actor = Actor::new("mira", "Mira");
        assert_eq!(actor.full_handle(), "@mira");
    }
}
