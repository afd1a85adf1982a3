//! Embedded document store.
//!
//! Named resources hold ordered members, each a JSON object keyed by a
//! mandatory `id`. Resource keys and field values can be looked up with `*`
//! glob patterns, members may carry an expiry, and the whole dataset is kept
//! in a single JSON file that is rewritten atomically after every mutation.

pub mod config;
pub mod error;
pub mod expiry;
pub mod filter;
pub mod persistence;
pub mod service;
pub mod store;
pub mod wildcard;

pub use config::Config;
pub use error::{StoreError, StoreResult};
pub use filter::Condition;
pub use service::StoreService;
pub use store::{DeleteOutcome, Member, ResourceStore};
