//! # Tempgrant Store
//!
//! Storage abstraction for temporary grants. Provides a trait-based
//! interface over the request store and the execution log, with SQLite and
//! in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`UpdateResult`] - Result of rewriting a request's scheduled end
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tempgrant_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     let store = SqliteStore::open("grants.db").unwrap();
//!     let recent = store.list_recent(20).await.unwrap();
//!     println!("{} recent requests", recent.len());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Row-level atomicity only**: each call touches at most one request row
//!   (or appends one log row); callers never need a multi-row transaction.
//! - **Monotonic status**: a revoked request is never made pending or due again.
//! - **Append-only log**: entries are never updated or deleted.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Store, UpdateResult};
