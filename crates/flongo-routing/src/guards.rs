//! Checks actions run before touching their inputs.

use flongo_core::ApiError;
use flongo_database::CollectionHandle;

/// Returns the collection, or a resource error when the route has none.
///
/// ```
/// use flongo_core::ErrorKind;
/// use flongo_routing::ensure_collection;
///
/// let err = ensure_collection("/default", None).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::Resource);
/// assert_eq!(err.data()["url"], "/default");
/// ```
pub fn ensure_collection(
    url: &str,
    collection: Option<CollectionHandle>,
) -> Result<CollectionHandle, ApiError> {
    collection.ok_or_else(|| ApiError::missing_collection(url))
}
