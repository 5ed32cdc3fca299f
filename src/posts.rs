//! Single-post reads and author edits

use serde_json::json;
use uuid::Uuid;

use crate::api::query::decode_rows;
use crate::api::{DataSource, Filter, Range, Relation, Select};
use crate::error::{Error, Result};
use crate::models::{Piece, Post};
use crate::session::Session;

fn owned(session: &Session, post_id: Uuid) -> [Filter; 2] {
    [
        Filter::id("id", post_id),
        Filter::id("user_id", session.actor_id()),
    ]
}

/// Fetch one post with its author embedded
pub async fn get_post<S: DataSource>(source: &S, post_id: Uuid) -> Result<Post> {
    let query = Select::from(Relation::Posts)
        .filter(Filter::id("id", post_id))
        .embed("author", Relation::Users, "user_id")
        .range(Range { offset: 0, limit: 1 });
    let posts: Vec<Post> = decode_rows(Relation::Posts, source.select(&query).await?)?;

    posts
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found("post", post_id))
}

/// Replace the tagged pieces of a post the current actor wrote
pub async fn update_pieces<S: DataSource>(
    source: &S,
    session: &Session,
    post_id: Uuid,
    pieces: Vec<Piece>,
) -> Result<Post> {
    let pieces: Vec<Piece> = pieces.into_iter().map(Piece::normalized).collect();
    Piece::validate_all(&pieces)?;

    let rows = source
        .update(Relation::Posts, json!({ "pieces": pieces }), &owned(session, post_id))
        .await?;
    let posts: Vec<Post> = decode_rows(Relation::Posts, rows)?;

    tracing::debug!("updated {} pieces on post {post_id}", pieces.len());
    posts
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found("post", post_id))
}

/// Delete a post the current actor wrote
pub async fn delete_post<S: DataSource>(source: &S, session: &Session, post_id: Uuid) -> Result<()> {
    let filters = owned(session, post_id);
    let query = Select::from(Relation::Posts)
        .filter(filters[0].clone())
        .filter(filters[1].clone());
    if source.select(&query).await?.is_empty() {
        return Err(Error::not_found("post", post_id));
    }

    source.delete(Relation::Posts, &filters).await?;
    tracing::info!("deleted post {post_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryStore;
    use crate::api::memory::Verb;
    use crate::models::{Actor, ValidationError};

    fn fixture() -> (MemoryStore, Session, Post) {
        let me = Actor::new("mira", "Mira");
        let store = MemoryStore::new();
        store.seed(Relation::Users, &[me.clone()]).unwrap();
        let post = Post::new(me.id, "posts/coat.jpg");
        store.seed(Relation::Posts, &[post.clone()]).unwrap();
        (store, Session::new(me), post)
    }

    #[tokio::test]
    async fn get_post_embeds_author() {
        let (store, _, post) = fixture();
        let fetched = get_post(&store, post.id).await.unwrap();
        assert_eq!(fetched.author_label(), "@mira");

        assert!(matches!(
            get_post(&store, Uuid::new_v4()).await,
            Err(Error::NotFound { kind: "post", .. })
        ));
    }

    #[tokio::test]
    async fn pieces_are_normalized_and_stored() {
        let (store, session, post) = fixture();
        let pieces = vec![Piece::new(" Wool coat ", "Toteme").with_link("")];

        let updated = update_pieces(&store, &session, post.id, pieces).await.unwrap();
        assert_eq!(updated.pieces, vec![Piece::new("Wool coat", "Toteme")]);
    }

    #[tokio::test]
    async fn invalid_piece_is_rejected_before_update() {
        let (store, session, post) = fixture();
        let pieces = vec![Piece::new("Coat", "Toteme"), Piece::new("", "Acne")];

        let err = update_pieces(&store, &session, post.id, pieces).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::Piece { index: 1, .. })));
        assert_eq!(store.count(Verb::Update, Relation::Posts), 0);
    }

    #[tokio::test]
    async fn others_cannot_edit_or_delete() {
        let (store, _, post) = fixture();
        let stranger = Session::new(Actor::new("sol", "Sol"));

        let err = update_pieces(&store, &stranger, post.id, Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert!(delete_post(&store, &stranger, post.id).await.is_err());
        assert_eq!(store.rows(Relation::Posts).len(), 1);
    }

    #[tokio::test]
    async fn author_deletes_own_post() {
        let (store, session, post) = fixture();
        delete_post(&store, &session, post.id).await.unwrap();
        assert!(store.rows(Relation::Posts).is_empty());
    }
}
