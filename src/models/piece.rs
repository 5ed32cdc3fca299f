//! Tagged clothing pieces attached to a post

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// A single piece of an outfit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    /// What the piece is ("Wool coat")
    pub name: String,
    /// Who made it
    pub brand: String,
    /// Optional shop link
    #[serde(default)]
    pub link: Option<String>,
}

impl Piece {
    /// Create a piece without a link
    pub fn new(name: impl Into<String>, brand: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            brand: brand.into(),
            link: None,
        }
    }

    /// Attach a shop link
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Name and brand must both be present
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("piece name"));
        }
        if self.brand.trim().is_empty() {
            return Err(ValidationError::EmptyField("piece brand"));
        }
        Ok(())
    }

    /// Validate a whole list, reporting the first offending position
    pub fn validate_all(pieces: &[Self]) -> Result<(), ValidationError> {
        for (index, piece) in pieces.iter().enumerate() {
            piece.validate().map_err(|e| ValidationError::Piece {
                index,
                reason: Box::new(e),
            })?;
        }
        Ok(())
    }

    /// Drop an empty link string so it is stored as null
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.brand = self.brand.trim().to_string();
        if self.link.as_deref().is_some_and(|l| l.trim().is_empty()) {
            self.link = None;
        }
        self
    }
}
