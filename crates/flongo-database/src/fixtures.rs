//! Seed documents applied at startup.
//!
//! Fixtures map a collection name to the documents it must contain. Every
//! document needs an `_id` holding a MongoDB ObjectId in its 24 hex digit
//! form, so applying the same fixtures twice leaves the database unchanged.

use crate::collection::CollectionLease;
use crate::collection::CollectionProvider;
use crate::document::{self, Document, ID_FIELD};
use crate::DatabaseError;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Validated fixture definitions.
///
/// # Example
///
/// ```
/// use flongo_database::Fixtures;
/// use serde_json::json;
///
/// let fixtures = Fixtures::from_value(json!({
///     "sample": [{"_id": "652790328c73b750984aee34", "name": "Peter"}]
/// }))
/// .unwrap();
///
/// assert_eq!(fixtures.len(), 1);
/// assert!(Fixtures::from_value(json!({"sample": [{"name": "Peter"}]})).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fixtures {
    collections: IndexMap<String, Vec<Document>>,
}

impl Fixtures {
    /// Creates an empty set of fixtures.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validates documents grouped by collection.
    pub fn new<I, S>(collections: I) -> Result<Self, DatabaseError>
    where
        I: IntoIterator<Item = (S, Vec<Document>)>,
        S: Into<String>,
    {
        let collections: IndexMap<String, Vec<Document>> = collections
            .into_iter()
            .map(|(name, documents)| (name.into(), documents))
            .collect();

        for (collection, documents) in &collections {
            for doc in documents {
                check_document(collection, doc)?;
            }
        }

        Ok(Self { collections })
    }

    /// Validates an untyped definition such as a parsed JSON file.
    ///
    /// `null` and an empty object both mean "no fixtures".
    pub fn from_value(value: Value) -> Result<Self, DatabaseError> {
        let definitions = match value {
            Value::Null => return Ok(Self::empty()),
            Value::Object(definitions) => definitions,
            _ => {
                return Err(DatabaseError::InvalidFixtures(
                    "The fixture definition must be a dictionary".to_string(),
                ));
            }
        };

        let mut collections = Vec::with_capacity(definitions.len());
        for (collection, items) in definitions {
            let items = match items {
                Value::Array(items) => items,
                other => {
                    return Err(DatabaseError::InvalidFixture {
                        reason: format!(
                            "The defined fixtures must be a list of dictionaries to insert in the database. Found a {}",
                            type_name(&other)
                        ),
                        collection,
                    });
                }
            };

            let mut documents = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Object(doc) => documents.push(doc),
                    other => {
                        return Err(DatabaseError::InvalidFixture {
                            reason: format!(
                                "The fixture definition must be a list of dictionaries, the list contained type {}",
                                type_name(&other)
                            ),
                            collection,
                        });
                    }
                }
            }
            collections.push((collection, documents));
        }

        Self::new(collections)
    }

    /// Returns the number of collections with fixtures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Returns `true` if there is nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Returns the documents for one collection.
    #[must_use]
    pub fn get(&self, collection: &str) -> Option<&[Document]> {
        self.collections.get(collection).map(Vec::as_slice)
    }

    /// Iterates over collections in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Document])> {
        self.collections
            .iter()
            .map(|(name, documents)| (name.as_str(), documents.as_slice()))
    }

    /// Upserts every document by `_id`, replacing what is stored.
    pub async fn apply(&self, provider: Arc<dyn CollectionProvider>) -> Result<(), DatabaseError> {
        for (collection, documents) in &self.collections {
            let lease = CollectionLease::acquire(Arc::clone(&provider), collection).await?;
            let handle = lease.handle();

            let mut inserted = 0_usize;
            for doc in documents {
                let id = doc.get(ID_FIELD).cloned().unwrap_or(Value::Null);
                let result = handle.update_one(&document::id_filter(&id), doc, true).await?;
                if result.upserted_id.is_some() {
                    inserted += 1;
                }
            }

            tracing::info!(
                collection = %collection,
                documents = documents.len(),
                inserted,
                "applied fixtures"
            );
        }
        Ok(())
    }
}

fn check_document(collection: &str, doc: &Document) -> Result<(), DatabaseError> {
    let invalid = |reason: String| DatabaseError::InvalidFixture {
        collection: collection.to_string(),
        reason,
    };
    let id = doc.get(ID_FIELD);

    if !document::is_present(id) {
        return Err(invalid(format!(
            "The fixture definition:\n{}\n is missing a MongoDB ObjectId in the _id field",
            Value::Object(doc.clone())
        )));
    }
    if !id.is_some_and(is_object_id) {
        return Err(invalid(format!(
            "The fixture definition:\n{}\n has an invalid MongoDB ObjectId in the _id field",
            Value::Object(doc.clone())
        )));
    }
    Ok(())
}

/// Returns `true` for a 24 digit hex string.
#[must_use]
pub fn is_object_id(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|hex| hex.len() == 24 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dictionary",
    }
}
