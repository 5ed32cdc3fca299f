//! Data models for fitcheck

mod actor;
mod collection;
mod edge;
mod piece;
mod post;

pub use actor::{Actor, ActorSummary, validate_handle};
pub use collection::{Collection, DEFAULT_COLLECTION_NAME, validate_name};
pub use edge::{Activity, ActivityKind, Follow, Like, Save};
pub use piece::Piece;
pub use post::Post;

use thiserror::Error;

/// Rejected user input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required text field was blank
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// Handle contains whitespace
    #[error("handle {0:?} must not contain whitespace")]
    HandleWhitespace(String),

    /// One piece of a list is invalid
    #[error("piece {index}: {reason}")]
    Piece {
        /// Position in the list
        index: usize,
        /// What was wrong with it
        reason: Box<ValidationError>,
    },
}
