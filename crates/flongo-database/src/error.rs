//! Database error types.

use flongo_core::{ActionError, ApiError};
use http::StatusCode;
use thiserror::Error;

/// Errors raised while acquiring or operating on collections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseError {
    /// The fixture definitions are malformed.
    #[error("Error in fixture definitions for collection [{collection}]. {reason}")]
    InvalidFixture {
        /// Collection the fixture targets.
        collection: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The fixture definitions are not a collection → documents mapping.
    #[error("Error in fixture definitions. {0}")]
    InvalidFixtures(String),

    /// An index definition is unusable.
    #[error("Invalid index on collection [{collection}]: {reason}")]
    InvalidIndex {
        /// Collection the index targets.
        collection: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A write would violate `_id` or a unique index.
    #[error("Duplicate key on collection [{collection}]: {key}")]
    DuplicateKey {
        /// The collection written to.
        collection: String,
        /// The conflicting key, rendered as JSON.
        key: String,
    },

    /// An update document is malformed.
    #[error("Invalid update document: {0}")]
    InvalidUpdate(String),

    /// The provider could not supply the collection.
    #[error("Failed to acquire collection [{collection}]: {reason}")]
    Unavailable {
        /// The requested collection.
        collection: String,
        /// Why acquisition failed.
        reason: String,
    },

    /// The handle was used after its lease ended.
    #[error("Collection handle for [{0}] was used after it was released")]
    Released(String),
}

impl DatabaseError {
    /// Returns the status code used when this error reaches a client.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateKey { .. } => StatusCode::CONFLICT,
            Self::InvalidUpdate(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the collection involved, if any.
    #[must_use]
    pub fn collection(&self) -> Option<&str> {
        match self {
            Self::InvalidFixture { collection, .. }
            | Self::InvalidIndex { collection, .. }
            | Self::DuplicateKey { collection, .. }
            | Self::Unavailable { collection, .. }
            | Self::Released(collection) => Some(collection.as_str()),
            Self::InvalidFixtures(_) | Self::InvalidUpdate(_) => None,
        }
    }

    /// Converts into a resource error for the request pipeline.
    #[must_use]
    pub fn into_api_error(self) -> ApiError {
        let status = self.status_code();
        let collection = self.collection().unwrap_or_default().to_string();
        ApiError::resource(self.to_string(), collection).with_status(status)
    }
}

impl From<DatabaseError> for ActionError {
    fn from(error: DatabaseError) -> Self {
        Self::Api(error.into_api_error())
    }
}
