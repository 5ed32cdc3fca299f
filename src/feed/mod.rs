//! Paginated feeds
//!
//! A [`FeedFetcher`] owns the growing list of posts for one screen. It pages
//! through a [`FeedMode`] ten posts at a time, replacing the list on refresh
//! and appending on scroll, and drops any response that arrives after the
//! mode changed or a newer refresh started.

mod fetcher;
mod mode;
mod page;

pub use fetcher::{Completion, FeedFetcher, FetchTicket};
pub use mode::FeedMode;
pub use page::{Page, fetch_page};

use serde::{Deserialize, Serialize};

/// Posts per page; callers never choose this
pub const PAGE_SIZE: usize = 10;

/// How the end of a feed is detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HasMore {
    /// A page shorter than [`PAGE_SIZE`] ends the feed. When the total is an
    /// exact multiple of the page size this costs one extra, empty request.
    #[default]
    ShortPage,
    /// Request one extra row and use its presence as the signal
    Lookahead,
}

impl HasMore {
    /// Rows to request for a page of `size`
    pub const fn request_limit(self, size: usize) -> usize {
        match self {
            Self::ShortPage => size,
            Self::Lookahead => size + 1,
        }
    }

    /// Whether more rows follow, given the rows a page request returned
    pub const fn evaluate(self, received: usize, size: usize) -> bool {
        match self {
            Self::ShortPage => received == size,
            Self::Lookahead => received > size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_page_heuristic() {
        assert!(HasMore::ShortPage.evaluate(10, 10));
        assert!(!HasMore::ShortPage.evaluate(9, 10));
        assert!(!HasMore::ShortPage.evaluate(0, 10));
    }

    #[test]
    fn lookahead_needs_the_extra_row() {
        assert_eq!(HasMore::Lookahead.request_limit(10), 11);
        assert!(HasMore::Lookahead.evaluate(11, 10));
        assert!(!HasMore::Lookahead.evaluate(10, 10));
    }
}
