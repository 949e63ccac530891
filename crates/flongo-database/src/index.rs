//! Index definitions applied at startup.

use crate::collection::CollectionProvider;
use crate::DatabaseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key direction within an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// `1` in MongoDB notation.
    Ascending,
    /// `-1` in MongoDB notation.
    Descending,
}

impl SortOrder {
    /// Returns the MongoDB direction number.
    #[must_use]
    pub const fn direction(self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// An index on one collection.
///
/// # Example
///
/// ```
/// use flongo_database::{Index, SortOrder};
///
/// let index = Index::ascending("sample", "name")
///     .with_key("created", SortOrder::Descending)
///     .unique();
///
/// assert_eq!(index.name(), "name_1_created_-1");
/// assert!(index.is_unique());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    collection: String,
    keys: Vec<(String, SortOrder)>,
    #[serde(default)]
    unique: bool,
}

impl Index {
    /// Creates a single-field ascending index.
    #[must_use]
    pub fn ascending(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            keys: vec![(field.into(), SortOrder::Ascending)],
            unique: false,
        }
    }

    /// Creates a single-field descending index.
    #[must_use]
    pub fn descending(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            keys: vec![(field.into(), SortOrder::Descending)],
            unique: false,
        }
    }

    /// Appends another key, making this a compound index.
    #[must_use]
    pub fn with_key(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.keys.push((field.into(), order));
        self
    }

    /// Marks the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Returns the collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the keys in order.
    #[must_use]
    pub fn keys(&self) -> &[(String, SortOrder)] {
        &self.keys
    }

    /// Returns the key field names in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|(field, _)| field.as_str())
    }

    /// Returns `true` for a unique index.
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    /// Returns the MongoDB-style index name, e.g. `name_1`.
    #[must_use]
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|(field, order)| format!("{field}_{}", order.direction()))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Rejects indices without keys or with a repeated field.
    pub fn check(&self) -> Result<(), DatabaseError> {
        let invalid = |reason: &str| DatabaseError::InvalidIndex {
            collection: self.collection.clone(),
            reason: reason.to_string(),
        };

        if self.collection.is_empty() {
            return Err(invalid("collection name is empty"));
        }
        if self.keys.is_empty() {
            return Err(invalid("index has no keys"));
        }
        for (i, (field, _)) in self.keys.iter().enumerate() {
            if field.is_empty() {
                return Err(invalid("index key is empty"));
            }
            if self.keys[..i].iter().any(|(seen, _)| seen == field) {
                return Err(invalid(&format!("field {field} appears twice")));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.collection, self.name())?;
        if self.unique {
            f.write_str(" (unique)")?;
        }
        Ok(())
    }
}

/// The set of indices an application declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Indices {
    indices: Vec<Index>,
}

impl Indices {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an index, builder style.
    #[must_use]
    pub fn with(mut self, index: Index) -> Self {
        self.add(index);
        self
    }

    /// Adds an index.
    pub fn add(&mut self, index: Index) {
        self.indices.push(index);
    }

    /// Iterates over the declared indices.
    pub fn iter(&self) -> impl Iterator<Item = &Index> {
        self.indices.iter()
    }

    /// Returns the number of declared indices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Creates every index through `provider`, stopping at the first failure.
    pub async fn apply(&self, provider: &dyn CollectionProvider) -> Result<(), DatabaseError> {
        for index in &self.indices {
            index.check()?;
            provider.create_index(index).await?;
            tracing::info!(index = %index, "created index");
        }
        Ok(())
    }
}

impl FromIterator<Index> for Indices {
    fn from_iter<I: IntoIterator<Item = Index>>(iter: I) -> Self {
        Self {
            indices: iter.into_iter().collect(),
        }
    }
}
