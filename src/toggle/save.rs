//! Saving a post into a set of collections

use std::collections::BTreeSet;

use chrono::Utc;
use uuid::Uuid;

use super::optimistic::{Optimistic, Pending, Settled};
use crate::api::query::encode_row;
use crate::api::{DataSource, Filter, Relation, StoreError};
use crate::collections::saved_collection_ids;
use crate::models::{Activity, ActivityKind, Post, Save};
use crate::session::Session;

/// Collections to drop and add when moving from one saved set to another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveDiff {
    /// Saved now, not in the selection
    pub removed: BTreeSet<Uuid>,
    /// In the selection, not saved now
    pub added: BTreeSet<Uuid>,
}

impl SaveDiff {
    /// Difference between the `current` saved set and a new `selection`
    pub fn between(current: &BTreeSet<Uuid>, selection: &BTreeSet<Uuid>) -> Self {
        Self {
            removed: current.difference(selection).copied().collect(),
            added: selection.difference(current).copied().collect(),
        }
    }

    /// No calls are needed
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// A save commit that failed
#[derive(Debug)]
pub struct SaveFailure {
    /// The write that failed
    pub error: StoreError,
    /// What the server holds when that is neither the old nor the new set
    pub server: Option<BTreeSet<Uuid>>,
}

impl From<StoreError> for SaveFailure {
    fn from(error: StoreError) -> Self {
        Self { error, server: None }
    }
}

/// Optimistic set of collections one post is saved in
pub struct SaveSelection {
    actor_id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    saved: Optimistic<BTreeSet<Uuid>>,
}

impl SaveSelection {
    /// Selection starting from a saved set the caller already knows
    pub fn new(session: &Session, post: &Post, saved: BTreeSet<Uuid>) -> Self {
        Self {
            actor_id: session.actor_id(),
            post_id: post.id,
            author_id: post.user_id,
            saved: Optimistic::new(saved),
        }
    }

    /// Selection seeded from the actor's saves of `post`
    pub async fn load<S: DataSource>(source: &S, session: &Session, post: &Post) -> Result<Self, StoreError> {
        let saved = saved_collection_ids(source, session, post.id).await?;
        Ok(Self::new(session, post, saved))
    }

    /// Collections the post is currently saved in, locally
    pub fn saved(&self) -> &BTreeSet<Uuid> {
        self.saved.get()
    }

    /// Whether the post is saved anywhere
    pub fn is_saved(&self) -> bool {
        !self.saved().is_empty()
    }

    /// Replace the local set with `selection`
    pub fn begin(&mut self, selection: BTreeSet<Uuid>) -> Pending<BTreeSet<Uuid>> {
        self.saved.apply(selection)
    }

    /// Send the difference described by `pending`
    ///
    /// One delete for the removed collections, then one batch insert for the
    /// added ones. If the insert fails after the delete went through, the
    /// removed saves are written back before the error is returned. Activity
    /// rows are only touched once both edge writes have gone through.
    pub async fn commit<S: DataSource>(
        &self,
        source: &S,
        pending: &Pending<BTreeSet<Uuid>>,
    ) -> Result<(), SaveFailure> {
        let diff = SaveDiff::between(pending.previous(), pending.next());
        if diff.is_empty() {
            return Ok(());
        }

        if !diff.removed.is_empty() {
            self.remove(source, &diff.removed).await?;
        }

        if !diff.added.is_empty()
            && let Err(error) = self.insert(source, &diff.added).await
        {
            if diff.removed.is_empty() {
                return Err(error.into());
            }
            // Put the removed saves back
            let server = match self.insert(source, &diff.removed).await {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(
                        "Could not restore {} saves of post {}: {}",
                        diff.removed.len(),
                        self.post_id,
                        e
                    );
                    Some(pending.previous().difference(&diff.removed).copied().collect())
                }
            };
            return Err(SaveFailure { error, server });
        }

        self.record_activity(source, &diff).await;
        Ok(())
    }

    /// Reconcile local state with the commit's outcome
    ///
    /// A failure that left the server somewhere other than the pre-toggle
    /// set lands the local set on what the server holds.
    pub fn settle(
        &mut self,
        pending: Pending<BTreeSet<Uuid>>,
        result: Result<(), SaveFailure>,
    ) -> Result<Settled, StoreError> {
        let result = match result {
            Ok(()) => self.saved.settle(pending, Ok(())),
            Err(SaveFailure { error, server: None }) => self.saved.settle(pending, Err(error)),
            Err(SaveFailure {
                error,
                server: Some(server),
            }) => self.saved.settle_at(pending, error, server),
        };
        result.inspect_err(|e| {
            tracing::warn!("save selection for post {} rolled back: {}", self.post_id, e);
        })
    }

    /// Apply `selection`, commit and reconcile
    pub async fn apply<S: DataSource>(&mut self, source: &S, selection: BTreeSet<Uuid>) -> Result<Settled, StoreError> {
        let pending = self.begin(selection);
        let result = self.commit(source, &pending).await;
        self.settle(pending, result)
    }

    async fn remove<S: DataSource>(&self, source: &S, collections: &BTreeSet<Uuid>) -> Result<(), StoreError> {
        let filters = [
            Filter::id("user_id", self.actor_id),
            Filter::id("post_id", self.post_id),
            Filter::ids("collection_id", collections.iter().copied()),
        ];
        source.delete(Relation::Saves, &filters).await
    }

    async fn insert<S: DataSource>(&self, source: &S, collections: &BTreeSet<Uuid>) -> Result<(), StoreError> {
        source.insert(Relation::Saves, self.save_rows(collections)?).await.map(drop)
    }

    async fn record_activity<S: DataSource>(&self, source: &S, diff: &SaveDiff) {
        if !diff.removed.is_empty() {
            let filters = [
                Filter::id("actor_id", self.actor_id),
                Filter::eq("type", ActivityKind::Save.as_str()),
                Filter::id("post_id", self.post_id),
                Filter::ids("collection_id", diff.removed.iter().copied()),
            ];
            if let Err(e) = source.delete(Relation::Activity, &filters).await {
                tracing::warn!("Failed to remove save activity: {}", e);
            }
        }

        if diff.added.is_empty() {
            return;
        }
        let rows = diff
            .added
            .iter()
            .map(|c| {
                encode_row(
                    Relation::Activity,
                    &Activity::save(self.actor_id, self.post_id, Some(self.author_id), *c),
                )
            })
            .collect::<Result<Vec<_>, _>>();
        let result = match rows {
            Ok(rows) => source.insert(Relation::Activity, rows).await.map(drop),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to record save activity: {}", e);
        }
    }

    fn save_rows(&self, collections: &BTreeSet<Uuid>) -> Result<Vec<serde_json::Value>, StoreError> {
        let created_at = Utc::now();
        collections
            .iter()
            .map(|c| {
                encode_row(
                    Relation::Saves,
                    &Save {
                        user_id: self.actor_id,
                        post_id: self.post_id,
                        collection_id: *c,
                        created_at,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryStore;
    use crate::api::memory::Verb;
    use crate::models::Actor;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn set(items: &[Uuid]) -> BTreeSet<Uuid> {
        items.iter().copied().collect()
    }

    fn fixture() -> (MemoryStore, Session, Post) {
        let session = Session::new(Actor::new("mira", "Mira"));
        let post = Post::new(Uuid::new_v4(), "posts/a.jpg");
        (MemoryStore::new(), session, post)
    }

    async fn seed_saves(store: &MemoryStore, session: &Session, post: &Post, collections: &[Uuid]) {
        let saves: Vec<Save> = collections
            .iter()
            .map(|c| Save {
                user_id: session.actor_id(),
                post_id: post.id,
                collection_id: *c,
                created_at: Utc::now(),
            })
            .collect();
        store.seed(Relation::Saves, &saves).unwrap();
    }

    #[test]
    fn diff_splits_removed_and_added() {
        let c = ids(3);
        let diff = SaveDiff::between(&set(&[c[0], c[1]]), &set(&[c[1], c[2]]));
        assert_eq!(diff.removed, set(&[c[0]]));
        assert_eq!(diff.added, set(&[c[2]]));
        assert!(SaveDiff::between(&set(&c), &set(&c)).is_empty());
    }

    #[tokio::test]
    async fn moving_between_collections_is_one_delete_and_one_insert() {
        let (store, session, post) = fixture();
        let c = ids(3);
        seed_saves(&store, &session, &post, &[c[0], c[1]]).await;

        let mut selection = SaveSelection::load(&store, &session, &post).await.unwrap();
        assert_eq!(selection.saved(), &set(&[c[0], c[1]]));
        store.clear_calls();

        let settled = selection.apply(&store, set(&[c[1], c[2]])).await.unwrap();
        assert_eq!(settled, Settled::Confirmed);

        assert_eq!(store.count(Verb::Delete, Relation::Saves), 1);
        assert_eq!(store.count(Verb::Insert, Relation::Saves), 1);
        let remaining: BTreeSet<String> = store
            .rows(Relation::Saves)
            .iter()
            .map(|r| r["collection_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(remaining, [c[1], c[2]].iter().map(Uuid::to_string).collect());
    }

    #[tokio::test]
    async fn identical_selection_issues_no_calls() {
        let (store, session, post) = fixture();
        let c = ids(2);
        let mut selection = SaveSelection::new(&session, &post, set(&c));

        selection.apply(&store, set(&c)).await.unwrap();
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn batch_insert_writes_one_activity_per_collection() {
        let (store, session, post) = fixture();
        let c = ids(2);
        let mut selection = SaveSelection::new(&session, &post, BTreeSet::new());

        selection.apply(&store, set(&c)).await.unwrap();
        assert!(selection.is_saved());
        assert_eq!(store.count(Verb::Insert, Relation::Saves), 1);
        assert_eq!(store.rows(Relation::Saves).len(), 2);

        let activity = store.rows(Relation::Activity);
        assert_eq!(activity.len(), 2);
        assert!(activity.iter().all(|a| a["type"] == "save"));
        assert!(activity.iter().all(|a| a["target_user_id"] == post.user_id.to_string()));
    }

    #[tokio::test]
    async fn failed_insert_restores_removed_saves() {
        let (store, session, post) = fixture();
        let c = ids(2);
        seed_saves(&store, &session, &post, &[c[0]]).await;
        let mut selection = SaveSelection::new(&session, &post, set(&[c[0]]));

        store.fail_next(Verb::Insert, Relation::Saves);
        assert!(selection.apply(&store, set(&[c[1]])).await.is_err());

        assert_eq!(selection.saved(), &set(&[c[0]]));
        let rows = store.rows(Relation::Saves);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["collection_id"], c[0].to_string());
        assert_eq!(store.count(Verb::Insert, Relation::Activity), 0);
    }

    #[tokio::test]
    async fn failed_restore_settles_on_what_the_server_holds() {
        let (store, session, post) = fixture();
        let c = ids(2);
        seed_saves(&store, &session, &post, &[c[0]]).await;
        let mut selection = SaveSelection::new(&session, &post, set(&[c[0]]));

        store.fail_next(Verb::Insert, Relation::Saves);
        store.fail_next(Verb::Insert, Relation::Saves);
        assert!(selection.apply(&store, set(&[c[1]])).await.is_err());

        assert!(store.rows(Relation::Saves).is_empty());
        assert!(selection.saved().is_empty());
        assert!(!selection.is_saved());
    }

    #[tokio::test]
    async fn restored_saves_keep_their_activity() {
        let (store, session, post) = fixture();
        let c = ids(2);
        let mut selection = SaveSelection::new(&session, &post, BTreeSet::new());
        selection.apply(&store, set(&[c[0]])).await.unwrap();
        assert_eq!(store.rows(Relation::Activity).len(), 1);

        store.fail_next(Verb::Insert, Relation::Saves);
        assert!(selection.apply(&store, set(&[c[1]])).await.is_err());

        assert_eq!(selection.saved(), &set(&[c[0]]));
        assert_eq!(store.rows(Relation::Saves).len(), 1);
        let activity = store.rows(Relation::Activity);
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0]["collection_id"], c[0].to_string());
        assert_eq!(store.count(Verb::Delete, Relation::Activity), 0);
    }

    #[tokio::test]
    async fn failed_delete_leaves_everything_untouched() {
        let (store, session, post) = fixture();
        let c = ids(2);
        seed_saves(&store, &session, &post, &c).await;
        let mut selection = SaveSelection::new(&session, &post, set(&c));

        store.fail_next(Verb::Delete, Relation::Saves);
        assert!(selection.apply(&store, BTreeSet::new()).await.is_err());

        assert_eq!(selection.saved(), &set(&c));
        assert_eq!(store.rows(Relation::Saves).len(), 2);
    }

    #[tokio::test]
    async fn unsaving_removes_matching_activity() {
        let (store, session, post) = fixture();
        let c = ids(2);
        let mut selection = SaveSelection::new(&session, &post, BTreeSet::new());
        selection.apply(&store, set(&c)).await.unwrap();

        selection.apply(&store, set(&[c[0]])).await.unwrap();
        let activity = store.rows(Relation::Activity);
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0]["collection_id"], c[0].to_string());
    }
}
