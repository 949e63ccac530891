//! Collections and their scoped acquisition.
//!
//! A route that names a collection gets a [`CollectionHandle`] for the
//! duration of one request. The handle is backed by a [`CollectionLease`],
//! which returns the collection to its [`CollectionProvider`] exactly once:
//! when the lease is dropped or explicitly released, whichever comes first.
//!
//! ```text
//! acquire ──► CollectionLease ──► handle() ──► action
//!                   │
//!                 drop ──► provider.release(name)
//! ```
//!
//! A handle that escapes its request (for example, cloned into a spawned
//! task) rejects every operation after the lease ends.

use crate::document::Document;
use crate::index::Index;
use crate::DatabaseError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of [`Collection::insert_one`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertOneResult {
    /// The `_id` of the inserted document.
    pub inserted_id: Value,
}

/// Outcome of [`Collection::update_one`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateResult {
    /// Number of documents matching the filter (0 or 1).
    pub matched_count: u64,
    /// Number of documents changed.
    pub modified_count: u64,
    /// `_id` of the inserted document when an upsert created one.
    pub upserted_id: Option<Value>,
}

/// Outcome of [`Collection::delete_one`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteResult {
    /// Number of documents removed (0 or 1).
    pub deleted_count: u64,
}

/// A named set of documents.
#[async_trait]
pub trait Collection: Send + Sync + fmt::Debug {
    /// Returns the collection name.
    fn name(&self) -> &str;

    /// Inserts a document, generating an `_id` if it has none.
    async fn insert_one(&self, document: Document) -> Result<InsertOneResult, DatabaseError>;

    /// Returns the first document matching `filter`.
    async fn find_one(&self, filter: &Document) -> Result<Option<Document>, DatabaseError>;

    /// Returns every document matching `filter`, in insertion order.
    async fn find(&self, filter: &Document) -> Result<Vec<Document>, DatabaseError>;

    /// Updates the first document matching `filter`.
    ///
    /// With `upsert`, a missing document is created from the filter's
    /// equality fields plus the update.
    async fn update_one(
        &self,
        filter: &Document,
        update: &Document,
        upsert: bool,
    ) -> Result<UpdateResult, DatabaseError>;

    /// Deletes the first document matching `filter`.
    async fn delete_one(&self, filter: &Document) -> Result<DeleteResult, DatabaseError>;

    /// Counts documents matching `filter`.
    async fn count(&self, filter: &Document) -> Result<u64, DatabaseError>;
}

/// Supplies collections to requests and takes them back.
#[async_trait]
pub trait CollectionProvider: Send + Sync {
    /// Makes `name` available to one request.
    async fn acquire(&self, name: &str) -> Result<Arc<dyn Collection>, DatabaseError>;

    /// Takes back a collection acquired with [`CollectionProvider::acquire`].
    fn release(&self, name: &str);

    /// Creates an index. Creating an identical index again is a no-op.
    async fn create_index(&self, index: &Index) -> Result<(), DatabaseError>;
}

/// A request-scoped view of a collection.
///
/// Cloning is cheap and every clone shares the lease state.
#[derive(Clone)]
pub struct CollectionHandle {
    inner: Arc<dyn Collection>,
    released: Arc<AtomicBool>,
}

impl fmt::Debug for CollectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionHandle")
            .field("name", &self.inner.name())
            .field("released", &self.is_released())
            .finish()
    }
}

impl CollectionHandle {
    /// Returns the collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Returns `true` once the backing lease has ended.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    fn live(&self) -> Result<&dyn Collection, DatabaseError> {
        if self.is_released() {
            Err(DatabaseError::Released(self.name().to_string()))
        } else {
            Ok(self.inner.as_ref())
        }
    }

    /// See [`Collection::insert_one`].
    pub async fn insert_one(&self, document: Document) -> Result<InsertOneResult, DatabaseError> {
        self.live()?.insert_one(document).await
    }

    /// See [`Collection::find_one`].
    pub async fn find_one(&self, filter: &Document) -> Result<Option<Document>, DatabaseError> {
        self.live()?.find_one(filter).await
    }

    /// See [`Collection::find`].
    pub async fn find(&self, filter: &Document) -> Result<Vec<Document>, DatabaseError> {
        self.live()?.find(filter).await
    }

    /// See [`Collection::update_one`].
    pub async fn update_one(
        &self,
        filter: &Document,
        update: &Document,
        upsert: bool,
    ) -> Result<UpdateResult, DatabaseError> {
        self.live()?.update_one(filter, update, upsert).await
    }

    /// See [`Collection::delete_one`].
    pub async fn delete_one(&self, filter: &Document) -> Result<DeleteResult, DatabaseError> {
        self.live()?.delete_one(filter).await
    }

    /// See [`Collection::count`].
    pub async fn count(&self, filter: &Document) -> Result<u64, DatabaseError> {
        self.live()?.count(filter).await
    }
}

/// Owns one acquisition and releases it exactly once.
pub struct CollectionLease {
    handle: CollectionHandle,
    provider: Arc<dyn CollectionProvider>,
}

impl fmt::Debug for CollectionLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionLease")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl CollectionLease {
    /// Acquires `name` from `provider`.
    pub async fn acquire(
        provider: Arc<dyn CollectionProvider>,
        name: &str,
    ) -> Result<Self, DatabaseError> {
        let inner = provider.acquire(name).await?;
        tracing::debug!(collection = name, "acquired collection");
        Ok(Self {
            handle: CollectionHandle {
                inner,
                released: Arc::new(AtomicBool::new(false)),
            },
            provider,
        })
    }

    /// Returns a handle sharing this lease.
    #[must_use]
    pub fn handle(&self) -> CollectionHandle {
        self.handle.clone()
    }

    /// Ends the lease now. Later calls and the eventual drop do nothing.
    pub fn release(&self) {
        if !self.handle.released.swap(true, Ordering::AcqRel) {
            self.provider.release(self.handle.name());
            tracing::debug!(collection = self.handle.name(), "released collection");
        }
    }
}

impl Drop for CollectionLease {
    fn drop(&mut self) {
        self.release();
    }
}
