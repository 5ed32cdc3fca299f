//! # fitcheck
//!
//! Client core for an outfit-sharing social feed.
//!
//! ## Overview
//!
//! fitcheck reads paginated feeds of outfit posts from a hosted `PostgREST`
//! backend and writes likes, follows and collection saves optimistically:
//! local state changes first and is rolled back if the write fails.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CLI (main.rs)                          │
//! │        Resolves the session and drives the services         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │      Feed       │ │     Toggle      │ │    Services     │
//! │                 │ │                 │ │                 │
//! │ • Feed modes    │ │ • Like/follow   │ │ • Profiles      │
//! │ • Pagination    │ │ • Saves         │ │ • Posts         │
//! │ • Stale drops   │ │ • Rollback      │ │ • Collections   │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!          │                   │                   │
//!          └───────────────────┴───────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │       API       │ │    Database     │ │     Models      │
//! │                 │ │                 │ │                 │
//! │ • REST client   │ │ • Session slot  │ │ • Post, Piece   │
//! │ • Memory store  │ │                 │ │ • Actor         │
//! │ • Query builder │ │                 │ │ • Edges         │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`]: Data sources (REST backend, in-memory store)
//! - [`feed`]: Paginated feed fetcher
//! - [`toggle`]: Optimistic like, follow and save
//! - [`profiles`], [`posts`], [`collections`]: Service operations
//! - [`config`]: Configuration management
//! - [`db`]: `SQLite` storage for the selected session
//! - [`models`]: Data models (Post, Actor, Collection, edges)
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fitcheck::demo;
//! use fitcheck::feed::{FeedFetcher, FeedMode};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let store = Arc::new(demo::demo_store()?);
//! let session = Arc::new(demo::demo_session());
//!
//! let mut feed = FeedFetcher::new(store, session, FeedMode::FollowingItems);
//! feed.refresh().await?;
//! while feed.has_more() {
//!     feed.load_more().await?;
//! }
//! println!("{} posts", feed.posts().len());
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/fitcheck/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::unused_async)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::use_self)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::similar_names)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::future_not_send)]

pub mod api;
pub mod collections;
pub mod config;
pub mod db;
pub mod demo;
pub mod error;
pub mod feed;
pub mod models;
pub mod paths;
pub mod posts;
pub mod profiles;
pub mod session;
pub mod toggle;

// Re-export main types for convenience
pub use api::{Client, DataSource, MemoryStore, RestClient, StoreError};
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use feed::{FeedFetcher, FeedMode, HasMore};
pub use models::{Actor, Collection, Piece, Post};
pub use session::Session;
pub use toggle::{Edge, EdgeToggle, Optimistic, SaveSelection};

/// ASCII logo for the application
pub const LOGO: &str = r"
   __ _ _       _               _
  / _(_) |_ ___| |__   ___  ___| | __
 | |_| | __/ __| '_ \ / _ \/ __| |/ /
 |  _| | || (__| | | |  __/ (__|   <
 |_| |_|\__\___|_| |_|\___|\___|_|\_\
";

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
