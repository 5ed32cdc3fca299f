//! Collection management for the current actor

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::query::{decode_rows, encode_row};
use crate::api::{DataSource, Filter, Order, Range, Relation, Select, StoreError};
use crate::error::{Error, Result};
use crate::models::{Collection, validate_name};
use crate::session::Session;

fn owned_by(session: &Session) -> Select {
    Select::from(Relation::Collections).filter(Filter::id("user_id", session.actor_id()))
}

async fn insert_collection<S: DataSource>(source: &S, collection: &Collection) -> Result<Collection> {
    let row = encode_row(Relation::Collections, collection)?;
    let stored: Vec<Collection> =
        decode_rows(Relation::Collections, source.insert(Relation::Collections, vec![row]).await?)?;
    Ok(stored.into_iter().next().unwrap_or_else(|| collection.clone()))
}

async fn get_owned<S: DataSource>(source: &S, session: &Session, id: Uuid) -> Result<Collection> {
    let query = owned_by(session)
        .filter(Filter::id("id", id))
        .range(Range { offset: 0, limit: 1 });
    let rows: Vec<Collection> = decode_rows(Relation::Collections, source.select(&query).await?)?;
    rows.into_iter()
        .next()
        .ok_or_else(|| Error::not_found("collection", id))
}

/// Every collection the actor owns, default first, then oldest first
pub async fn list_collections<S: DataSource>(source: &S, session: &Session) -> Result<Vec<Collection>> {
    let query = owned_by(session).order(Order::asc("created_at"));
    let mut collections: Vec<Collection> = decode_rows(Relation::Collections, source.select(&query).await?)?;
    collections.sort_by_key(|c| !c.is_default);
    Ok(collections)
}

/// The actor's default collection, created on first use
pub async fn ensure_default_collection<S: DataSource>(source: &S, session: &Session) -> Result<Collection> {
    let query = owned_by(session)
        .filter(Filter::eq("is_default", true))
        .range(Range { offset: 0, limit: 1 });
    let existing: Vec<Collection> = decode_rows(Relation::Collections, source.select(&query).await?)?;
    if let Some(collection) = existing.into_iter().next() {
        return Ok(collection);
    }

    tracing::info!("creating default collection for {}", session.actor().full_handle());
    insert_collection(source, &Collection::default_for(session.actor_id())).await
}

/// Create a named collection
pub async fn create_collection<S: DataSource>(source: &S, session: &Session, name: &str) -> Result<Collection> {
    validate_name(name)?;
    insert_collection(source, &Collection::new(session.actor_id(), name)).await
}

/// Rename a collection; the default collection keeps its name
pub async fn rename_collection<S: DataSource>(
    source: &S,
    session: &Session,
    id: Uuid,
    name: &str,
) -> Result<Collection> {
    validate_name(name)?;
    let mut collection = get_owned(source, session, id).await?;
    if collection.is_default {
        return Err(Error::DefaultCollection(id));
    }

    let name = name.trim();
    source
        .update(
            Relation::Collections,
            json!({ "name": name }),
            &[Filter::id("id", id), Filter::id("user_id", session.actor_id())],
        )
        .await?;
    collection.name = name.to_string();
    Ok(collection)
}

/// Delete a collection and the saves in it
pub async fn delete_collection<S: DataSource>(source: &S, session: &Session, id: Uuid) -> Result<()> {
    let collection = get_owned(source, session, id).await?;
    if collection.is_default {
        return Err(Error::DefaultCollection(id));
    }

    source
        .delete(
            Relation::Saves,
            &[Filter::id("collection_id", id), Filter::id("user_id", session.actor_id())],
        )
        .await?;
    source
        .delete(
            Relation::Collections,
            &[Filter::id("id", id), Filter::id("user_id", session.actor_id())],
        )
        .await?;

    tracing::info!("deleted collection {:?}", collection.name);
    Ok(())
}

#[derive(Deserialize)]
struct SavedIn {
    collection_id: Uuid,
}

/// Collections the actor has saved `post_id` into
pub async fn saved_collection_ids<S: DataSource>(
    source: &S,
    session: &Session,
    post_id: Uuid,
) -> Result<BTreeSet<Uuid>, StoreError> {
    let query = Select::from(Relation::Saves)
        .filter(Filter::id("user_id", session.actor_id()))
        .filter(Filter::id("post_id", post_id));
    let rows: Vec<SavedIn> = decode_rows(Relation::Saves, source.select(&query).await?)?;
    Ok(rows.into_iter().map(|r| r.collection_id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryStore;
    use crate::api::memory::Verb;
    use crate::models::{Actor, DEFAULT_COLLECTION_NAME, Post, Save, ValidationError};
    use chrono::Utc;

    fn session() -> Session {
        Session::new(Actor::new("mira", "Mira"))
    }

    #[tokio::test]
    async fn default_collection_is_created_once() {
        let store = MemoryStore::new();
        let session = session();

        let first = ensure_default_collection(&store, &session).await.unwrap();
        let second = ensure_default_collection(&store, &session).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.name, DEFAULT_COLLECTION_NAME);
        assert_eq!(store.count(Verb::Insert, Relation::Collections), 1);
    }

    #[tokio::test]
    async fn list_puts_default_first() {
        let store = MemoryStore::new();
        let session = session();
        create_collection(&store, &session, "Fall").await.unwrap();
        ensure_default_collection(&store, &session).await.unwrap();
        store
            .seed(Relation::Collections, &[Collection::new(Uuid::new_v4(), "Not mine")])
            .unwrap();

        let names: Vec<String> = list_collections(&store, &session)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec![DEFAULT_COLLECTION_NAME, "Fall"]);
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let store = MemoryStore::new();
        let err = create_collection(&store, &session(), "   ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyField(_))));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn default_collection_cannot_be_renamed_or_deleted() {
        let store = MemoryStore::new();
        let session = session();
        let default = ensure_default_collection(&store, &session).await.unwrap();

        assert!(matches!(
            rename_collection(&store, &session, default.id, "Other").await,
            Err(Error::DefaultCollection(_))
        ));
        assert!(matches!(
            delete_collection(&store, &session, default.id).await,
            Err(Error::DefaultCollection(_))
        ));
    }

    #[tokio::test]
    async fn rename_trims_the_name() {
        let store = MemoryStore::new();
        let session = session();
        let fall = create_collection(&store, &session, "Fall").await.unwrap();

        let renamed = rename_collection(&store, &session, fall.id, " Autumn ").await.unwrap();
        assert_eq!(renamed.name, "Autumn");
        assert_eq!(store.rows(Relation::Collections)[0]["name"], "Autumn");
    }

    #[tokio::test]
    async fn delete_removes_saves_then_collection() {
        let store = MemoryStore::new();
        let session = session();
        let fall = create_collection(&store, &session, "Fall").await.unwrap();
        let post = Post::new(Uuid::new_v4(), "posts/a.jpg");
        store
            .seed(
                Relation::Saves,
                &[Save {
                    user_id: session.actor_id(),
                    post_id: post.id,
                    collection_id: fall.id,
                    created_at: Utc::now(),
                }],
            )
            .unwrap();
        assert_eq!(
            saved_collection_ids(&store, &session, post.id).await.unwrap(),
            BTreeSet::from([fall.id])
        );

        delete_collection(&store, &session, fall.id).await.unwrap();
        assert!(store.rows(Relation::Saves).is_empty());
        assert!(store.rows(Relation::Collections).is_empty());

        let deletes: Vec<Relation> = store
            .calls()
            .into_iter()
            .filter(|c| c.verb == Verb::Delete)
            .map(|c| c.relation)
            .collect();
        assert_eq!(deletes, vec![Relation::Saves, Relation::Collections]);
    }
}
