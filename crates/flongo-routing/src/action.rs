//! Type-erased route actions.

use flongo_core::{ActionError, Payload, Reply, Request};
use flongo_database::CollectionHandle;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for a boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What an action resolves to.
pub type ActionResult = Result<Reply, ActionError>;

/// A user function bound to one `(url, method)` pair.
///
/// It receives the request, the parsed payload and the route's collection
/// (`None` when the route has no `collection_name`).
pub type Action =
    Arc<dyn Fn(Request, Payload, Option<CollectionHandle>) -> BoxFuture<'static, ActionResult> + Send + Sync>;

/// Erases an async function into an [`Action`].
///
/// The function may return anything convertible into a [`Reply`]: an
/// [`ApiResponse`](flongo_core::ApiResponse) is sent as is, while a bare
/// JSON value is wrapped by the pipeline.
///
/// ```
/// use flongo_core::{ActionError, ApiResponse};
/// use flongo_routing::action;
///
/// let greet = action(|_request, payload, _collection| async move {
///     Ok::<_, ActionError>(ApiResponse::json(serde_json::Value::Object(payload)))
/// });
/// # let _ = greet;
/// ```
pub fn action<F, Fut, R>(f: F) -> Action
where
    F: Fn(Request, Payload, Option<CollectionHandle>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ActionError>> + Send + 'static,
    R: Into<Reply>,
{
    Arc::new(
        move |request: Request,
              payload: Payload,
              collection: Option<CollectionHandle>|
              -> BoxFuture<'static, ActionResult> {
            let fut = f(request, payload, collection);
            Box::pin(async move { fut.await.map(Into::into) })
        },
    )
}
