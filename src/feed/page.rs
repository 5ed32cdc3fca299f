//! Single-page reads for each feed mode

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{FeedMode, HasMore, PAGE_SIZE};
use crate::api::query::decode_rows;
use crate::api::{DataSource, Filter, Order, Range, Relation, Select, StoreError};
use crate::models::Post;
use crate::session::Session;

/// One page of a feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Posts on this page, in feed order
    pub posts: Vec<Post>,
    /// Whether another page may follow
    pub has_more: bool,
}

impl Page {
    /// An empty page that ends the feed
    pub const fn terminal() -> Self {
        Self {
            posts: Vec::new(),
            has_more: false,
        }
    }
}

#[derive(Deserialize)]
struct FollowTarget {
    following_id: Uuid,
}

/// Fetch zero-based page `page` of `mode`
pub async fn fetch_page<S: DataSource>(
    source: &S,
    session: &Session,
    mode: &FeedMode,
    page: usize,
    strategy: HasMore,
) -> Result<Page, StoreError> {
    let range = Range {
        offset: page * PAGE_SIZE,
        limit: strategy.request_limit(PAGE_SIZE),
    };
    // Save rows carry their own created_at, so collections sort by save time
    let order = Order::desc("created_at");

    let posts_query = || {
        Select::from(Relation::Posts)
            .embed("author", Relation::Users, "user_id")
            .order(order)
            .range(range)
    };

    match mode {
        FeedMode::AllItems => {
            let rows = source.select(&posts_query()).await?;
            into_page(Relation::Posts, rows, strategy)
        }
        FeedMode::ActorItems(actor_id) => {
            let query = posts_query().filter(Filter::id("user_id", *actor_id));
            let rows = source.select(&query).await?;
            into_page(Relation::Posts, rows, strategy)
        }
        FeedMode::FollowingItems => {
            let follows = Select::from(Relation::Follows)
                .filter(Filter::id("follower_id", session.actor_id()));
            let targets: Vec<FollowTarget> =
                decode_rows(Relation::Follows, source.select(&follows).await?)?;

            if targets.is_empty() {
                tracing::debug!("following feed has no targets; nothing to fetch");
                return Ok(Page::terminal());
            }

            let query = posts_query()
                .filter(Filter::ids("user_id", targets.into_iter().map(|t| t.following_id)));
            let rows = source.select(&query).await?;
            into_page(Relation::Posts, rows, strategy)
        }
        FeedMode::CollectionItems(None) => Ok(Page::terminal()),
        FeedMode::CollectionItems(Some(collection_id)) => {
            let query = Select::from(Relation::Saves)
                .filter(Filter::id("collection_id", *collection_id))
                .embed("post", Relation::Posts, "post_id")
                .order(order)
                .range(range);
            let mut rows = source.select(&query).await?;

            let has_more = trim_window(&mut rows, strategy);
            let dangling = rows.iter().filter(|r| post_of(r).is_none()).count();
            if dangling > 0 {
                tracing::debug!("skipping {dangling} saves whose post no longer exists");
            }

            let posts = decode_rows(
                Relation::Posts,
                rows.into_iter().filter_map(|mut r| take_post(&mut r)).collect(),
            )?;
            Ok(Page { posts, has_more })
        }
    }
}

fn into_page(relation: Relation, mut rows: Vec<Value>, strategy: HasMore) -> Result<Page, StoreError> {
    let has_more = trim_window(&mut rows, strategy);
    Ok(Page {
        posts: decode_rows(relation, rows)?,
        has_more,
    })
}

/// Decide `has_more` from the raw row count and drop any lookahead row
fn trim_window(rows: &mut Vec<Value>, strategy: HasMore) -> bool {
    let has_more = strategy.evaluate(rows.len(), PAGE_SIZE);
    rows.truncate(PAGE_SIZE);
    has_more
}

fn post_of(row: &Value) -> Option<&Value> {
    row.get("post").filter(|p| p.is_object())
}

fn take_post(row: &mut Value) -> Option<Value> {
    let post = row.get_mut("post")?.take();
    post.is_object().then_some(post)
}
