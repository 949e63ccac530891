//! # Flongo Database
//!
//! Document collections for Flongo routes.
//!
//! A route that names a collection receives a [`CollectionHandle`] for the
//! duration of each request. Handles come from a [`CollectionProvider`]
//! through a [`CollectionLease`], which gives the collection back exactly
//! once on every exit path.
//!
//! This crate also provides:
//!
//! - [`MemoryDatabase`] - An in-memory provider with MongoDB-style filters
//!   and updates
//! - [`Fixtures`] - Seed documents upserted at startup
//! - [`Index`] / [`Indices`] - Index declarations created at startup
//!
//! ## Example
//!
//! ```
//! use flongo_database::{CollectionLease, CollectionProvider, MemoryDatabase};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let db = Arc::new(MemoryDatabase::new());
//! let provider: Arc<dyn CollectionProvider> = db.clone();
//!
//! {
//!     let lease = CollectionLease::acquire(provider, "sample").await.unwrap();
//!     let doc = json!({"name": "Peter"}).as_object().cloned().unwrap();
//!     lease.handle().insert_one(doc).await.unwrap();
//! }
//!
//! assert_eq!(db.outstanding(), 0);
//! assert_eq!(db.collection("sample").len(), 1);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/flongo-database/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod collection;
pub mod document;
mod error;
mod fixtures;
mod index;
mod memory;

pub use collection::{
    Collection, CollectionHandle, CollectionLease, CollectionProvider, DeleteResult,
    InsertOneResult, UpdateResult,
};
pub use document::{Document, ID_FIELD};
pub use error::DatabaseError;
pub use fixtures::{is_object_id, Fixtures};
pub use flongo_config::DatabaseSettings;
pub use index::{Index, Indices, SortOrder};
pub use memory::{DatabaseStats, MemoryCollection, MemoryDatabase};
