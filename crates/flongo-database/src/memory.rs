//! In-memory document store.
//!
//! [`MemoryDatabase`] implements [`CollectionProvider`] without a server.
//! Collections are created on first acquisition and live as long as the
//! database. Documents keep insertion order, `_id` is unique per
//! collection, and unique indices are enforced on every write.
//!
//! The database counts acquisitions and releases so that tests can assert
//! every lease was returned.

use crate::collection::{
    Collection, CollectionProvider, DeleteResult, InsertOneResult, UpdateResult,
};
use crate::document::{self, Document, ID_FIELD};
use crate::index::Index;
use crate::DatabaseError;
use async_trait::async_trait;
use flongo_config::DatabaseSettings;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Acquisition counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Successful acquisitions.
    pub acquired: u64,
    /// Releases.
    pub released: u64,
}

impl DatabaseStats {
    /// Returns acquisitions not yet released.
    #[must_use]
    pub const fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

/// An in-memory [`CollectionProvider`].
#[derive(Debug)]
pub struct MemoryDatabase {
    name: String,
    collections: RwLock<HashMap<String, Arc<MemoryCollection>>>,
    unavailable: RwLock<HashSet<String>>,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::named(DatabaseSettings::default().default_database)
    }
}

impl MemoryDatabase {
    /// Creates an empty database named after the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty database with the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: RwLock::new(HashMap::new()),
            unavailable: RwLock::new(HashSet::new()),
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    /// Creates a database for the configured default database.
    #[must_use]
    pub fn from_settings(settings: &DatabaseSettings) -> Self {
        tracing::info!(
            database = %settings.default_database,
            host = %settings.host,
            atlas = settings.is_atlas(),
            "using in-memory document store"
        );
        Self::named(settings.default_database.clone())
    }

    /// Returns the database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a collection, creating it if needed.
    ///
    /// This bypasses acquisition and is meant for inspection.
    #[must_use]
    pub fn collection(&self, name: &str) -> Arc<MemoryCollection> {
        if let Some(collection) = self.collections.read().get(name) {
            return Arc::clone(collection);
        }
        let mut collections = self.collections.write();
        Arc::clone(
            collections
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MemoryCollection::new(name))),
        )
    }

    /// Returns the names of existing collections, sorted.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Makes every later acquisition of `name` fail.
    pub fn reject(&self, name: impl Into<String>) {
        self.unavailable.write().insert(name.into());
    }

    /// Undoes [`MemoryDatabase::reject`].
    pub fn accept(&self, name: &str) {
        self.unavailable.write().remove(name);
    }

    /// Returns the acquisition counters.
    #[must_use]
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            acquired: self.acquired.load(Ordering::Acquire),
            released: self.released.load(Ordering::Acquire),
        }
    }

    /// Returns acquisitions not yet released.
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        self.stats().outstanding()
    }
}

#[async_trait]
impl CollectionProvider for MemoryDatabase {
    async fn acquire(&self, name: &str) -> Result<Arc<dyn Collection>, DatabaseError> {
        if name.is_empty() {
            return Err(DatabaseError::Unavailable {
                collection: String::new(),
                reason: "collection name is empty".to_string(),
            });
        }
        if self.unavailable.read().contains(name) {
            return Err(DatabaseError::Unavailable {
                collection: name.to_string(),
                reason: format!("database [{}] refused the connection", self.name),
            });
        }

        let collection: Arc<dyn Collection> = self.collection(name);
        self.acquired.fetch_add(1, Ordering::AcqRel);
        Ok(collection)
    }

    fn release(&self, _name: &str) {
        self.released.fetch_add(1, Ordering::AcqRel);
    }

    async fn create_index(&self, index: &Index) -> Result<(), DatabaseError> {
        index.check()?;
        self.collection(index.collection()).create_index(index)
    }
}

/// One in-memory collection.
#[derive(Debug)]
pub struct MemoryCollection {
    name: String,
    documents: RwLock<Vec<Document>>,
    unique_keys: RwLock<Vec<Vec<String>>>,
}

impl MemoryCollection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            documents: RwLock::new(Vec::new()),
            unique_keys: RwLock::new(Vec::new()),
        }
    }

    /// Returns a copy of every document, in insertion order.
    #[must_use]
    pub fn documents(&self) -> Vec<Document> {
        self.documents.read().clone()
    }

    /// Returns the number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns `true` if the collection holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    fn create_index(&self, index: &Index) -> Result<(), DatabaseError> {
        if !index.is_unique() {
            return Ok(());
        }
        let fields: Vec<String> = index.fields().map(str::to_string).collect();

        let documents = self.documents.read();
        let mut unique_keys = self.unique_keys.write();
        if unique_keys.contains(&fields) {
            return Ok(());
        }

        for (i, doc) in documents.iter().enumerate() {
            let key = index_key(doc, &fields);
            if documents[..i].iter().any(|other| index_key(other, &fields) == key) {
                return Err(DatabaseError::InvalidIndex {
                    collection: self.name.clone(),
                    reason: format!("existing documents repeat key {}", render(&fields, &key)),
                });
            }
        }

        unique_keys.push(fields);
        Ok(())
    }

    // Checks `candidate` against every other document; `skip` is the
    // position the candidate replaces.
    fn check_unique(
        &self,
        documents: &[Document],
        candidate: &Document,
        skip: Option<usize>,
    ) -> Result<(), DatabaseError> {
        let id_key = vec![ID_FIELD.to_string()];
        let unique_keys = self.unique_keys.read();

        for fields in std::iter::once(&id_key).chain(unique_keys.iter()) {
            let key = index_key(candidate, fields);
            let conflict = documents
                .iter()
                .enumerate()
                .any(|(i, doc)| Some(i) != skip && index_key(doc, fields) == key);
            if conflict {
                return Err(DatabaseError::DuplicateKey {
                    collection: self.name.clone(),
                    key: render(fields, &key),
                });
            }
        }
        Ok(())
    }

    fn position(documents: &[Document], filter: &Document) -> Option<usize> {
        documents.iter().position(|doc| document::matches(doc, filter))
    }
}

fn index_key(doc: &Document, fields: &[String]) -> Vec<Value> {
    fields
        .iter()
        .map(|field| document::lookup(doc, field).cloned().unwrap_or(Value::Null))
        .collect()
}

fn render(fields: &[String], key: &[Value]) -> String {
    let object: Map<String, Value> = fields.iter().cloned().zip(key.iter().cloned()).collect();
    Value::Object(object).to_string()
}

fn ensure_id(doc: &mut Document) -> Value {
    doc.entry(ID_FIELD.to_string())
        .or_insert_with(|| Value::String(object_id()))
        .clone()
}

/// A 24 digit hex id: big-endian unix seconds, five random bytes and a
/// wrapping three byte counter.
fn object_id() -> String {
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let uuid = Uuid::now_v7();
    let seconds = uuid.get_timestamp().map_or(0, |ts| ts.to_unix().0);
    let mut bytes = [0_u8; 12];
    bytes[..4].copy_from_slice(&u32::try_from(seconds).unwrap_or_default().to_be_bytes());
    bytes[4..9].copy_from_slice(&uuid.as_bytes()[10..15]);
    bytes[9..].copy_from_slice(&COUNTER.fetch_add(1, Ordering::Relaxed).to_be_bytes()[1..]);
    bytes.iter().fold(String::with_capacity(24), |mut hex, byte| {
        let _ = write!(hex, "{byte:02x}");
        hex
    })
}

// The document an upsert starts from: the filter's plain equality fields.
fn upsert_seed(filter: &Document) -> Document {
    filter
        .iter()
        .filter(|(key, value)| {
            !key.contains('.')
                && !key.starts_with('$')
                && !value
                    .as_object()
                    .is_some_and(|object| object.keys().any(|k| k.starts_with('$')))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, mut doc: Document) -> Result<InsertOneResult, DatabaseError> {
        let inserted_id = ensure_id(&mut doc);
        let mut documents = self.documents.write();
        self.check_unique(&documents, &doc, None)?;
        documents.push(doc);
        Ok(InsertOneResult { inserted_id })
    }

    async fn find_one(&self, filter: &Document) -> Result<Option<Document>, DatabaseError> {
        let documents = self.documents.read();
        Ok(Self::position(&documents, filter).map(|i| documents[i].clone()))
    }

    async fn find(&self, filter: &Document) -> Result<Vec<Document>, DatabaseError> {
        Ok(self
            .documents
            .read()
            .iter()
            .filter(|doc| document::matches(doc, filter))
            .cloned()
            .collect())
    }

    async fn update_one(
        &self,
        filter: &Document,
        update: &Document,
        upsert: bool,
    ) -> Result<UpdateResult, DatabaseError> {
        let mut documents = self.documents.write();

        if let Some(i) = Self::position(&documents, filter) {
            let mut updated = documents[i].clone();
            let modified = document::apply_update(&mut updated, update)?;
            if modified {
                self.check_unique(&documents, &updated, Some(i))?;
                documents[i] = updated;
            }
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: u64::from(modified),
                upserted_id: None,
            });
        }

        if !upsert {
            return Ok(UpdateResult {
                matched_count: 0,
                modified_count: 0,
                upserted_id: None,
            });
        }

        let mut created = upsert_seed(filter);
        document::apply_update(&mut created, update)?;
        let upserted_id = ensure_id(&mut created);
        self.check_unique(&documents, &created, None)?;
        documents.push(created);

        Ok(UpdateResult {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(upserted_id),
        })
    }

    async fn delete_one(&self, filter: &Document) -> Result<DeleteResult, DatabaseError> {
        let mut documents = self.documents.write();
        let deleted_count = match Self::position(&documents, filter) {
            Some(i) => {
                documents.remove(i);
                1
            }
            None => 0,
        };
        Ok(DeleteResult { deleted_count })
    }

    async fn count(&self, filter: &Document) -> Result<u64, DatabaseError> {
        let count = self
            .documents
            .read()
            .iter()
            .filter(|doc| document::matches(doc, filter))
            .count();
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionLease;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_generates_id() {
        let db = MemoryDatabase::new();
        let people = db.collection("people");

        let result = people.insert_one(doc(json!({"name": "Peter"}))).await.unwrap();
        let id = result.inserted_id.as_str().unwrap().to_string();
        assert_eq!(id.len(), 24);
        assert!(crate::fixtures::is_object_id(&result.inserted_id));

        let found = people.find_one(&document::id_filter(&result.inserted_id)).await.unwrap();
        assert_eq!(found.unwrap()["name"], json!("Peter"));
    }

    #[test]
    fn test_generated_ids_are_object_ids() {
        let ids: HashSet<String> = (0..512).map(|_| object_id()).collect();
        assert_eq!(ids.len(), 512);
        for id in &ids {
            assert!(crate::fixtures::is_object_id(&Value::String(id.clone())), "{id}");
        }

        let first = object_id();
        let second = object_id();
        assert_ne!(&first[18..], &second[18..]);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let people = MemoryDatabase::new().collection("people");
        people.insert_one(doc(json!({"_id": 1}))).await.unwrap();

        let err = people.insert_one(doc(json!({"_id": 1}))).await.unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateKey { ref key, .. } if key == "{\"_id\":1}"));
        assert_eq!(people.len(), 1);
    }

    #[tokio::test]
    async fn test_find_and_count_keep_order() {
        let items = MemoryDatabase::new().collection("items");
        for (id, qty) in [(1, 5), (2, 1), (3, 9)] {
            items.insert_one(doc(json!({"_id": id, "qty": qty}))).await.unwrap();
        }

        let big = items.find(&doc(json!({"qty": {"$gte": 5}}))).await.unwrap();
        let ids: Vec<_> = big.iter().map(|d| d["_id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(3)]);
        assert_eq!(items.count(&Document::new()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_and_upsert() {
        let items = MemoryDatabase::new().collection("items");
        items.insert_one(doc(json!({"_id": 1, "qty": 1}))).await.unwrap();

        let result = items
            .update_one(&doc(json!({"_id": 1})), &doc(json!({"$inc": {"qty": 2}})), false)
            .await
            .unwrap();
        assert_eq!((result.matched_count, result.modified_count), (1, 1));

        let result = items
            .update_one(&doc(json!({"_id": 2})), &doc(json!({"$set": {"qty": 7}})), false)
            .await
            .unwrap();
        assert_eq!(result.matched_count, 0);
        assert_eq!(items.len(), 1);

        let result = items
            .update_one(&doc(json!({"_id": 2})), &doc(json!({"$set": {"qty": 7}})), true)
            .await
            .unwrap();
        assert_eq!(result.upserted_id, Some(json!(2)));
        assert_eq!(items.documents()[1], doc(json!({"_id": 2, "qty": 7})));
    }

    #[tokio::test]
    async fn test_delete_one() {
        let items = MemoryDatabase::new().collection("items");
        items.insert_one(doc(json!({"_id": 1}))).await.unwrap();
        items.insert_one(doc(json!({"_id": 2}))).await.unwrap();

        let result = items.delete_one(&Document::new()).await.unwrap();
        assert_eq!(result.deleted_count, 1);
        assert_eq!(items.documents(), vec![doc(json!({"_id": 2}))]);
        assert_eq!(items.delete_one(&doc(json!({"_id": 9}))).await.unwrap().deleted_count, 0);
    }

    #[tokio::test]
    async fn test_unique_index() {
        let db = MemoryDatabase::new();
        db.create_index(&Index::ascending("users", "email").unique()).await.unwrap();
        // Creating it again is a no-op.
        db.create_index(&Index::ascending("users", "email").unique()).await.unwrap();

        let users = db.collection("users");
        users.insert_one(doc(json!({"email": "a@x.io"}))).await.unwrap();
        let b = users.insert_one(doc(json!({"email": "b@x.io"}))).await.unwrap();

        assert!(users.insert_one(doc(json!({"email": "a@x.io"}))).await.is_err());

        let clash = users
            .update_one(
                &document::id_filter(&b.inserted_id),
                &doc(json!({"$set": {"email": "a@x.io"}})),
                false,
            )
            .await;
        assert!(matches!(clash, Err(DatabaseError::DuplicateKey { .. })));
        assert_eq!(users.count(&doc(json!({"email": "b@x.io"}))).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unique_index_over_existing_duplicates_fails() {
        let db = MemoryDatabase::new();
        let users = db.collection("users");
        users.insert_one(doc(json!({"email": "a@x.io"}))).await.unwrap();
        users.insert_one(doc(json!({"email": "a@x.io"}))).await.unwrap();

        let err = db.create_index(&Index::ascending("users", "email").unique()).await;
        assert!(matches!(err, Err(DatabaseError::InvalidIndex { .. })));
    }

    #[tokio::test]
    async fn test_lease_counts_and_release() {
        let db = Arc::new(MemoryDatabase::named("test"));
        let provider: Arc<dyn CollectionProvider> = db.clone();

        let lease = CollectionLease::acquire(Arc::clone(&provider), "sample").await.unwrap();
        let handle = lease.handle();
        handle.insert_one(doc(json!({"_id": 1}))).await.unwrap();
        assert_eq!(db.outstanding(), 1);

        lease.release();
        lease.release();
        drop(lease);

        assert_eq!(db.stats(), DatabaseStats { acquired: 1, released: 1 });
        assert!(handle.is_released());
        assert!(matches!(
            handle.count(&Document::new()).await,
            Err(DatabaseError::Released(_))
        ));
        assert_eq!(db.collection("sample").len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_collection() {
        let db = Arc::new(MemoryDatabase::new());
        db.reject("broken");
        let provider: Arc<dyn CollectionProvider> = db.clone();

        let err = CollectionLease::acquire(Arc::clone(&provider), "broken").await.unwrap_err();
        assert_eq!(err.collection(), Some("broken"));
        assert_eq!(db.stats(), DatabaseStats::default());

        db.accept("broken");
        assert!(CollectionLease::acquire(provider, "broken").await.is_ok());
        assert_eq!(db.outstanding(), 0);
    }
}
