//! Feed pagination state

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use super::{FeedMode, HasMore, Page, fetch_page};
use crate::api::{DataSource, StoreError};
use crate::models::Post;
use crate::session::Session;

/// An issued fetch, handed back to [`FeedFetcher::complete`] with its result
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct FetchTicket {
    generation: u64,
    mode: FeedMode,
    page: usize,
    reset: bool,
}

impl FetchTicket {
    /// Zero-based page this fetch reads
    pub const fn page(&self) -> usize {
        self.page
    }
}

/// What happened to a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The page was merged into the list
    Applied {
        /// Posts the page carried
        received: usize,
    },
    /// Nothing was issued (already loading, or the feed is exhausted)
    Skipped,
    /// The response belonged to an older mode or refresh and was dropped
    Stale,
}

/// Paginated list of posts for one screen
///
/// Fetches can run split-phase: [`begin`](Self::begin) updates the flags and
/// returns a ticket, [`execute`](Self::execute) performs the request, and
/// [`complete`](Self::complete) merges the result if the ticket is still
/// current. [`refresh`](Self::refresh) and [`load_more`](Self::load_more) run
/// all three in sequence.
pub struct FeedFetcher<S> {
    source: Arc<S>,
    session: Arc<Session>,
    mode: FeedMode,
    strategy: HasMore,
    posts: Vec<Post>,
    seen: HashSet<Uuid>,
    page: usize,
    has_more: bool,
    loading: bool,
    refreshing: bool,
    generation: u64,
    last_error: Option<String>,
}

impl<S: DataSource> FeedFetcher<S> {
    /// Create an empty fetcher; call [`refresh`](Self::refresh) to load it
    pub fn new(source: Arc<S>, session: Arc<Session>, mode: FeedMode) -> Self {
        Self {
            source,
            session,
            mode,
            strategy: HasMore::default(),
            posts: Vec::new(),
            seen: HashSet::new(),
            page: 0,
            has_more: true,
            loading: false,
            refreshing: false,
            generation: 0,
            last_error: None,
        }
    }

    /// Choose how the end of the feed is detected
    pub const fn with_has_more(mut self, strategy: HasMore) -> Self {
        self.strategy = strategy;
        self
    }

    /// Current mode
    pub const fn mode(&self) -> &FeedMode {
        &self.mode
    }

    /// Posts loaded so far, in feed order
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// A next-page fetch is in flight
    pub const fn loading(&self) -> bool {
        self.loading
    }

    /// A page-zero fetch is in flight
    pub const fn refreshing(&self) -> bool {
        self.refreshing
    }

    /// Another page may exist
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    /// Next page to request
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Message of the most recent failed fetch, cleared by the next success
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Switch to `mode`, discarding everything loaded for the old one
    ///
    /// Returns the page-zero fetch to run, or `None` when `mode` equals the
    /// current mode.
    pub fn set_mode(&mut self, mode: FeedMode) -> Option<FetchTicket> {
        if mode == self.mode {
            return None;
        }

        tracing::debug!("feed mode {} -> {}", self.mode, mode);
        self.mode = mode;
        self.posts.clear();
        self.seen.clear();
        self.page = 0;
        self.has_more = true;
        self.last_error = None;
        self.begin(true)
    }

    /// Start a fetch
    ///
    /// A reset always starts and supersedes anything in flight. A next-page
    /// fetch is refused while another fetch is in flight or once the feed
    /// is exhausted.
    pub fn begin(&mut self, reset: bool) -> Option<FetchTicket> {
        if reset {
            self.generation += 1;
            self.refreshing = true;
            self.loading = false;
            return Some(FetchTicket {
                generation: self.generation,
                mode: self.mode.clone(),
                page: 0,
                reset: true,
            });
        }

        if self.loading || self.refreshing || !self.has_more {
            return None;
        }

        self.loading = true;
        Some(FetchTicket {
            generation: self.generation,
            mode: self.mode.clone(),
            page: self.page,
            reset: false,
        })
    }

    /// Perform the request a ticket describes
    pub async fn execute(&self, ticket: &FetchTicket) -> Result<Page, StoreError> {
        fetch_page(
            self.source.as_ref(),
            &self.session,
            &ticket.mode,
            ticket.page,
            self.strategy,
        )
        .await
    }

    /// Merge a finished fetch
    ///
    /// Results for a superseded ticket are dropped. On failure the list is
    /// left as it was and the error is returned after being logged.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: Result<Page, StoreError>,
    ) -> Result<Completion, StoreError> {
        if ticket.generation != self.generation {
            tracing::debug!(
                "dropping stale {} page {} (generation {} < {})",
                ticket.mode,
                ticket.page,
                ticket.generation,
                self.generation
            );
            return Ok(Completion::Stale);
        }

        if ticket.reset {
            self.refreshing = false;
        } else {
            self.loading = false;
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Failed to fetch {} page {}: {}", ticket.mode, ticket.page, e);
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let received = page.posts.len();
        if ticket.reset {
            self.seen = page.posts.iter().map(|p| p.id).collect();
            self.posts = page.posts;
            self.page = 1;
        } else {
            for post in page.posts {
                if self.seen.insert(post.id) {
                    self.posts.push(post);
                }
            }
            self.page += 1;
        }
        self.has_more = page.has_more;
        self.last_error = None;

        Ok(Completion::Applied { received })
    }

    /// Run a fetch to completion
    pub async fn fetch(&mut self, reset: bool) -> Result<Completion, StoreError> {
        let Some(ticket) = self.begin(reset) else {
            return Ok(Completion::Skipped);
        };
        let result = self.execute(&ticket).await;
        self.complete(ticket, result)
    }

    /// Reload page zero (pull-to-refresh)
    pub async fn refresh(&mut self) -> Result<Completion, StoreError> {
        self.fetch(true).await
    }

    /// Append the next page (scroll-to-end); a no-op while loading or exhausted
    pub async fn load_more(&mut self) -> Result<Completion, StoreError> {
        self.fetch(false).await
    }

    /// Switch mode and load its first page
    pub async fn switch_mode(&mut self, mode: FeedMode) -> Result<Completion, StoreError> {
        let Some(ticket) = self.set_mode(mode) else {
            return Ok(Completion::Skipped);
        };
        let result = self.execute(&ticket).await;
        self.complete(ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::Verb;
    use crate::api::{MemoryStore, Relation};
    use crate::feed::PAGE_SIZE;
    use crate::models::Actor;
    use chrono::{Duration, Utc};

    struct Fixture {
        store: Arc<MemoryStore>,
        session: Arc<Session>,
        author: Uuid,
    }

    fn fixture(posts: usize) -> Fixture {
        let store = MemoryStore::new();
        let author = Actor::new("u1", "User One");
        let now = Utc::now();
        let rows: Vec<Post> = (0..posts)
            .map(|i| {
                let mut post = Post::new(author.id, format!("posts/{i}.jpg"));
                post.created_at = now - Duration::minutes(i as i64);
                post
            })
            .collect();
        store.seed(Relation::Posts, &rows).unwrap();
        store.seed(Relation::Users, &[author.clone()]).unwrap();

        Fixture {
            store: Arc::new(store),
            session: Arc::new(Session::new(Actor::new("viewer", "Viewer"))),
            author: author.id,
        }
    }

    fn fetcher(f: &Fixture, mode: FeedMode) -> FeedFetcher<MemoryStore> {
        FeedFetcher::new(Arc::clone(&f.store), Arc::clone(&f.session), mode)
    }

    fn post_selects(f: &Fixture) -> usize {
        f.store.count(Verb::Select, Relation::Posts)
    }

    #[tokio::test]
    async fn actor_feed_of_fifteen_posts() {
        let f = fixture(15);
        let mut feed = fetcher(&f, FeedMode::ActorItems(f.author));

        feed.refresh().await.unwrap();
        assert_eq!(feed.posts().len(), 10);
        assert!(feed.has_more());
        assert_eq!(feed.page(), 1);

        feed.load_more().await.unwrap();
        assert_eq!(feed.posts().len(), 15);
        assert!(!feed.has_more());

        assert_eq!(feed.load_more().await.unwrap(), Completion::Skipped);
        assert_eq!(feed.load_more().await.unwrap(), Completion::Skipped);
        assert_eq!(post_selects(&f), 2);
    }

    #[tokio::test]
    async fn has_more_stays_true_through_full_pages() {
        let f = fixture(PAGE_SIZE * 3 + 4);
        let mut feed = fetcher(&f, FeedMode::AllItems);

        feed.refresh().await.unwrap();
        for _ in 0..2 {
            assert!(feed.has_more());
            feed.load_more().await.unwrap();
        }
        assert!(feed.has_more());

        feed.load_more().await.unwrap();
        assert!(!feed.has_more());
        assert_eq!(feed.posts().len(), PAGE_SIZE * 3 + 4);

        feed.load_more().await.unwrap();
        assert_eq!(post_selects(&f), 4);
    }

    #[tokio::test]
    async fn posts_arrive_newest_first_with_authors() {
        let f = fixture(3);
        let mut feed = fetcher(&f, FeedMode::AllItems);
        feed.refresh().await.unwrap();

        let posts = feed.posts();
        assert!(posts.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(posts[0].author.as_ref().map(|a| a.handle.as_str()), Some("u1"));
    }

    #[tokio::test]
    async fn mode_change_clears_and_blocks_load_more_until_first_page() {
        let f = fixture(25);
        let mut feed = fetcher(&f, FeedMode::AllItems);
        feed.refresh().await.unwrap();
        feed.load_more().await.unwrap();
        assert_eq!(feed.posts().len(), 20);
        f.store.clear_calls();

        let ticket = feed.set_mode(FeedMode::ActorItems(f.author)).unwrap();
        assert!(feed.posts().is_empty());
        assert_eq!(feed.page(), 0);
        assert!(feed.has_more());
        assert!(feed.refreshing());
        assert!(feed.begin(false).is_none());

        let result = feed.execute(&ticket).await;
        feed.complete(ticket, result).unwrap();
        assert_eq!(post_selects(&f), 1);
        assert_eq!(feed.posts().len(), 10);
    }

    #[tokio::test]
    async fn setting_the_same_mode_is_a_no_op() {
        let f = fixture(5);
        let mut feed = fetcher(&f, FeedMode::AllItems);
        feed.refresh().await.unwrap();

        assert!(feed.set_mode(FeedMode::AllItems).is_none());
        assert_eq!(feed.posts().len(), 5);
    }

    #[tokio::test]
    async fn response_for_previous_mode_is_dropped() {
        let f = fixture(12);
        let mut feed = fetcher(&f, FeedMode::AllItems);

        let old = feed.begin(true).unwrap();
        let new = feed.set_mode(FeedMode::CollectionItems(None)).unwrap();

        let new_result = feed.execute(&new).await;
        assert_eq!(
            feed.complete(new, new_result).unwrap(),
            Completion::Applied { received: 0 }
        );

        let old_result = feed.execute(&old).await;
        assert_eq!(feed.complete(old, old_result).unwrap(), Completion::Stale);
        assert!(feed.posts().is_empty());
        assert!(!feed.has_more());
    }

    #[tokio::test]
    async fn load_more_racing_refresh_loses() {
        let f = fixture(25);
        let mut feed = fetcher(&f, FeedMode::AllItems);
        feed.refresh().await.unwrap();

        let next = feed.begin(false).unwrap();
        assert_eq!(next.page(), 1);
        assert!(feed.loading());
        let refresh = feed.begin(true).unwrap();
        assert_eq!(refresh.page(), 0);
        assert!(!feed.loading());

        let refreshed = feed.execute(&refresh).await;
        feed.complete(refresh, refreshed).unwrap();

        let appended = feed.execute(&next).await;
        assert_eq!(feed.complete(next, appended).unwrap(), Completion::Stale);
        assert_eq!(feed.posts().len(), 10);
        assert_eq!(feed.page(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_list_and_clears_flags() {
        let f = fixture(15);
        let mut feed = fetcher(&f, FeedMode::AllItems);
        feed.refresh().await.unwrap();

        f.store.fail_next(Verb::Select, Relation::Posts);
        assert!(feed.load_more().await.is_err());
        assert_eq!(feed.posts().len(), 10);
        assert!(!feed.loading());
        assert!(feed.has_more());
        assert!(feed.last_error().is_some());

        feed.load_more().await.unwrap();
        assert_eq!(feed.posts().len(), 15);
        assert!(feed.last_error().is_none());
    }

    #[tokio::test]
    async fn failed_refresh_clears_refreshing() {
        let f = fixture(3);
        let mut feed = fetcher(&f, FeedMode::AllItems);

        f.store.fail_next(Verb::Select, Relation::Posts);
        assert!(feed.refresh().await.is_err());
        assert!(!feed.refreshing());
        assert!(feed.posts().is_empty());
    }

    #[tokio::test]
    async fn appended_pages_skip_posts_already_listed() {
        let f = fixture(15);
        let mut feed = fetcher(&f, FeedMode::AllItems);
        feed.refresh().await.unwrap();

        // A newer post shifts every offset by one
        let mut newest = Post::new(f.author, "posts/new.jpg");
        newest.created_at = Utc::now() + Duration::minutes(1);
        f.store.seed(Relation::Posts, &[newest]).unwrap();

        feed.load_more().await.unwrap();
        let ids: HashSet<Uuid> = feed.posts().iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), feed.posts().len());
        assert_eq!(feed.posts().len(), 15);
    }
}
