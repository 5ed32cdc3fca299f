//! Like and follow toggles

use chrono::Utc;
use uuid::Uuid;

use super::optimistic::{Optimistic, Pending, Settled};
use crate::api::query::encode_row;
use crate::api::{DataSource, Filter, Range, Relation, Select, StoreError};
use crate::models::{Activity, ActivityKind, Follow, Like, Post};
use crate::session::Session;

/// A single on/off relationship between the current actor and a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    /// Like of a post; the author is notified
    Like {
        /// Liked post
        post_id: Uuid,
        /// Its author
        author_id: Uuid,
    },
    /// Follow of an actor
    Follow {
        /// Followed actor
        target_id: Uuid,
    },
}

impl Edge {
    /// Like edge for `post`
    pub const fn like(post: &Post) -> Self {
        Self::Like {
            post_id: post.id,
            author_id: post.user_id,
        }
    }

    /// Follow edge for `target_id`
    pub const fn follow(target_id: Uuid) -> Self {
        Self::Follow { target_id }
    }

    /// Relation the edge lives in
    pub const fn relation(&self) -> Relation {
        match self {
            Self::Like { .. } => Relation::Likes,
            Self::Follow { .. } => Relation::Follows,
        }
    }

    /// Activity type written alongside the edge
    pub const fn kind(&self) -> ActivityKind {
        match self {
            Self::Like { .. } => ActivityKind::Like,
            Self::Follow { .. } => ActivityKind::Follow,
        }
    }

    /// Predicates selecting exactly this edge
    pub fn key_filters(&self, actor_id: Uuid) -> Vec<Filter> {
        match *self {
            Self::Like { post_id, .. } => vec![
                Filter::id("user_id", actor_id),
                Filter::id("post_id", post_id),
            ],
            Self::Follow { target_id } => vec![
                Filter::id("follower_id", actor_id),
                Filter::id("following_id", target_id),
            ],
        }
    }

    /// Predicates selecting the activity rows this edge produced
    pub fn activity_filters(&self, actor_id: Uuid) -> Vec<Filter> {
        let mut filters = vec![
            Filter::id("actor_id", actor_id),
            Filter::eq("type", self.kind().as_str()),
        ];
        match *self {
            Self::Like { post_id, .. } => filters.push(Filter::id("post_id", post_id)),
            Self::Follow { target_id } => filters.push(Filter::id("target_user_id", target_id)),
        }
        filters
    }

    fn edge_row(&self, actor_id: Uuid) -> Result<serde_json::Value, StoreError> {
        let created_at = Utc::now();
        match *self {
            Self::Like { post_id, .. } => encode_row(
                Relation::Likes,
                &Like {
                    user_id: actor_id,
                    post_id,
                    created_at,
                },
            ),
            Self::Follow { target_id } => encode_row(
                Relation::Follows,
                &Follow {
                    follower_id: actor_id,
                    following_id: target_id,
                    created_at,
                },
            ),
        }
    }

    fn activity(&self, actor_id: Uuid) -> Activity {
        match *self {
            Self::Like { post_id, author_id } => Activity::like(actor_id, post_id, author_id),
            Self::Follow { target_id } => Activity::follow(actor_id, target_id),
        }
    }
}

/// Write (or remove) `edge` and its activity row
///
/// The activity write is only attempted after the edge write succeeded and
/// is best-effort: its failure is logged, not returned.
pub async fn commit_edge<S: DataSource>(
    source: &S,
    actor_id: Uuid,
    edge: Edge,
    on: bool,
) -> Result<(), StoreError> {
    if on {
        source
            .insert(edge.relation(), vec![edge.edge_row(actor_id)?])
            .await?;

        let activity = encode_row(Relation::Activity, &edge.activity(actor_id))?;
        if let Err(e) = source.insert(Relation::Activity, vec![activity]).await {
            tracing::warn!("Failed to record {} activity: {}", edge.kind(), e);
        }
    } else {
        source
            .delete(edge.relation(), &edge.key_filters(actor_id))
            .await?;

        if let Err(e) = source
            .delete(Relation::Activity, &edge.activity_filters(actor_id))
            .await
        {
            tracing::warn!("Failed to remove {} activity: {}", edge.kind(), e);
        }
    }
    Ok(())
}

/// Optimistic on/off state of one edge
pub struct EdgeToggle {
    edge: Edge,
    actor_id: Uuid,
    state: Optimistic<bool>,
    listener: Option<Box<dyn Fn(bool)>>,
}

impl EdgeToggle {
    /// Toggle starting from a state the caller already knows
    pub fn new(session: &Session, edge: Edge, current: bool) -> Self {
        Self {
            edge,
            actor_id: session.actor_id(),
            state: Optimistic::new(current),
            listener: None,
        }
    }

    /// Toggle seeded from the store
    pub async fn load<S: DataSource>(source: &S, session: &Session, edge: Edge) -> Result<Self, StoreError> {
        let mut query = Select::from(edge.relation()).range(Range { offset: 0, limit: 1 });
        query.filters = edge.key_filters(session.actor_id());

        let exists = !source.select(&query).await?.is_empty();
        Ok(Self::new(session, edge, exists))
    }

    /// Call `listener` with the new state after each confirmed change
    pub fn on_change(mut self, listener: impl Fn(bool) + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// The edge this toggle manages
    pub const fn edge(&self) -> Edge {
        self.edge
    }

    /// Current local state
    pub fn is_on(&self) -> bool {
        *self.state.get()
    }

    /// Flip the local state; the UI reflects it before any request is made
    pub fn begin(&mut self) -> Pending<bool> {
        let next = !self.is_on();
        self.state.apply(next)
    }

    /// Send the change described by `pending`
    pub async fn commit<S: DataSource>(&self, source: &S, pending: &Pending<bool>) -> Result<(), StoreError> {
        commit_edge(source, self.actor_id, self.edge, *pending.next()).await
    }

    /// Reconcile local state with the commit's outcome
    pub fn settle(&mut self, pending: Pending<bool>, result: Result<(), StoreError>) -> Result<Settled, StoreError> {
        let next = *pending.next();
        match self.state.settle(pending, result) {
            Ok(Settled::Confirmed) => {
                if let Some(listener) = &self.listener {
                    listener(next);
                }
                Ok(Settled::Confirmed)
            }
            Ok(settled) => Ok(settled),
            Err(e) => {
                tracing::warn!("{} toggle rolled back: {}", self.edge.kind(), e);
                Err(e)
            }
        }
    }

    /// Flip, commit and reconcile; returns the resulting state
    pub async fn toggle<S: DataSource>(&mut self, source: &S) -> Result<bool, StoreError> {
        let pending = self.begin();
        let result = self.commit(source, &pending).await;
        self.settle(pending, result)?;
        Ok(self.is_on())
    }
}
