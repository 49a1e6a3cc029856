//! `tempo-store` — collaborator boundary for the durable object store,
//! the search index, and the real-time change feed.
//!
//! The scheduler core only sees the [`ObjectStore`] and [`SearchIndex`]
//! traits and a channel of [`FeedEvent`]s; the reqwest-backed HTTP
//! implementations in this crate are wired in by the server binary.

pub mod client;
pub mod error;
pub mod feed;
pub mod search;

pub use client::{HttpStore, ObjectStore};
pub use error::{Result, StoreError};
pub use feed::{FeedConsumer, FeedEvent, FeedMethod};
pub use search::{HttpSearch, SearchIndex};
