//! Optimistic writes: like, follow and save
//!
//! Local state flips before any request is sent. A failed write restores the
//! previous value unless a newer change has already replaced it.

mod edge;
mod optimistic;
mod save;

pub use edge::{Edge, EdgeToggle, commit_edge};
pub use optimistic::{Optimistic, Pending, Settled};
pub use save::{SaveDiff, SaveFailure, SaveSelection};
