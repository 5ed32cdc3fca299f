//! Which posts a feed shows

use uuid::Uuid;

/// Selector for the logical list a screen is viewing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FeedMode {
    /// Every post, newest first
    #[default]
    AllItems,
    /// Posts by actors the current actor follows
    FollowingItems,
    /// Posts by one actor
    ActorItems(Uuid),
    /// Posts saved into one collection, most recently saved first.
    /// `None` while the collection id is still being resolved.
    CollectionItems(Option<Uuid>),
}

impl FeedMode {
    /// Get the display name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AllItems => "All",
            Self::FollowingItems => "Following",
            Self::ActorItems(_) => "Profile",
            Self::CollectionItems(_) => "Collection",
        }
    }
}

impl std::fmt::Display for FeedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActorItems(id) => write!(f, "{} ({id})", self.name()),
            Self::CollectionItems(Some(id)) => write!(f, "{} ({id})", self.name()),
            _ => f.write_str(self.name()),
        }
    }
}
