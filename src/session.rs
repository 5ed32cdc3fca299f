//! The signed-in actor, passed explicitly to everything that acts on their behalf

use uuid::Uuid;

use crate::models::Actor;

/// Current actor context
///
/// Built once at start-up and shared by reference (usually behind an `Arc`)
/// with fetchers and mutators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    actor: Actor,
    access_token: Option<String>,
}

impl Session {
    /// Session for `actor` using the project key only
    pub fn new(actor: Actor) -> Self {
        Self {
            actor,
            access_token: None,
        }
    }

    /// Attach the backend-issued access token
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// The acting user
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Shortcut for the acting user's id
    pub fn actor_id(&self) -> Uuid {
        self.actor.id
    }

    /// Access token, if any
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}
