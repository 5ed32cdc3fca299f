//! Post model (an outfit photo with its tagged pieces)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActorSummary, Piece};

/// A post as stored in the `posts` relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier
    pub id: Uuid,
    /// Author of the post
    pub user_id: Uuid,
    /// Image reference in the backend's object storage
    #[serde(default)]
    pub image_url: Option<String>,
    /// Free-text caption
    #[serde(default)]
    pub caption: Option<String>,
    /// Tagged pieces, in the order the author listed them
    #[serde(default)]
    pub pieces: Vec<Piece>,
    /// When the post was created
    pub created_at: DateTime<Utc>,
    /// Author profile, present when the query embeds it
    #[serde(default, skip_serializing)]
    pub author: Option<ActorSummary>,
}

impl Post {
    /// Create a new post authored by `user_id`
    pub fn new(user_id: Uuid, image_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            image_url: Some(image_url.into()),
            caption: None,
            pieces: Vec::new(),
            created_at: Utc::now(),
            author: None,
        }
    }

    /// Author handle for display, falling back to the raw author id
    pub fn author_label(&self) -> String {
        self.author
            .as_ref()
            .map_or_else(|| self.user_id.to_string(), |a| format!("@{}", a.handle))
    }

    /// Get relative time string (e.g., "5m", "2h", "3d")
    pub fn relative_time(&self) -> String {
        let duration = Utc::now().signed_duration_since(self.created_at);

        if duration.num_seconds() < 60 {
            format!("{}s", duration.num_seconds().max(0))
        } else if duration.num_minutes() < 60 {
            format!("{}m", duration.num_minutes())
        } else if duration.num_hours() < 24 {
            format!("{}h", duration.num_hours())
        } else if duration.num_days() < 7 {
            format!("{}d", duration.num_days())
        } else {
            self.created_at.format("%b %d").to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_row_with_embedded_author() {
        let author_id = Uuid::new_v4();
        let row = json!({
            "id": Uuid::new_v4(),
            "user_id": author_id,
            "image_url": "posts/abc.jpg",
            "caption": "friday fit",
            "pieces": [{ "name": "Trench", "brand": "Burberry", "link": null }],
            "created_at": "2026-01-02T10:00:00Z",
            "author": { "id": author_id, "handle": "mira", "display_name": "Mira" }
        });

        let post: Post = serde_json::from_value(row).unwrap();
        assert_eq!(post.pieces.len(), 1);
        assert_eq!(post.author_label(), "@mira");
    }

    #[test]
    fn author_is_not_written_back() {
        let mut post = Post::new(Uuid::new_v4(), "posts/x.jpg");
        post.author = Some(ActorSummary {
            id: post.user_id,
            handle: "mira".to_string(),
            display_name: "Mira".to_string(),
            avatar_url: None,
        });

        let value = serde_json::to_value(&post).unwrap();
        assert!(value.get("author").is_none());
    }
}
