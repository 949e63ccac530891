//! Route handlers: the per-method action table of a route.
//!
//! A [`RouteHandler`] owns one [`Action`] per bound method. Each instance
//! starts empty, so two handlers never share bindings.
//!
//! [`RouteHandler::crud`] binds a default create/read/update/delete set
//! against the route's collection. Individual methods can be replaced
//! afterwards:
//!
//! ```
//! use flongo_core::{ActionError, ApiResponse, HttpMethod};
//! use flongo_routing::RouteHandler;
//!
//! let handler = RouteHandler::crud().get(|_request, _payload, _collection| async {
//!     Ok::<_, ActionError>(ApiResponse::message("Authenticated!"))
//! });
//!
//! assert_eq!(handler.methods().count(), 5);
//! assert!(handler.action(HttpMethod::Get).is_some());
//! ```

use crate::action::{action, Action};
use crate::guards::ensure_collection;
use crate::RouteConfigError;
use flongo_core::{
    ensure_field, ActionError, ApiError, ApiResponse, HttpMethod, Payload, Request,
};
use flongo_database::{document, CollectionHandle, ID_FIELD};
use http::StatusCode;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::fmt;
use std::future::Future;

/// Binds actions to HTTP methods for one route.
#[derive(Clone, Default)]
pub struct RouteHandler {
    methods: IndexMap<HttpMethod, Action>,
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHandler")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RouteHandler {
    /// Creates a handler with no methods.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds an already erased action, replacing any previous binding.
    #[must_use]
    pub fn with_action(mut self, method: HttpMethod, action: Action) -> Self {
        self.methods.insert(method, action);
        self
    }

    /// Binds an async function to `method`.
    #[must_use]
    pub fn on<F, Fut, R>(self, method: HttpMethod, f: F) -> Self
    where
        F: Fn(Request, Payload, Option<CollectionHandle>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ActionError>> + Send + 'static,
        R: Into<flongo_core::Reply>,
    {
        self.with_action(method, action(f))
    }

    /// Binds `GET`.
    #[must_use]
    pub fn get<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Request, Payload, Option<CollectionHandle>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ActionError>> + Send + 'static,
        R: Into<flongo_core::Reply>,
    {
        self.on(HttpMethod::Get, f)
    }

    /// Binds `POST`.
    #[must_use]
    pub fn post<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Request, Payload, Option<CollectionHandle>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ActionError>> + Send + 'static,
        R: Into<flongo_core::Reply>,
    {
        self.on(HttpMethod::Post, f)
    }

    /// Binds `PUT`.
    #[must_use]
    pub fn put<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Request, Payload, Option<CollectionHandle>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ActionError>> + Send + 'static,
        R: Into<flongo_core::Reply>,
    {
        self.on(HttpMethod::Put, f)
    }

    /// Binds `PATCH`.
    #[must_use]
    pub fn patch<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Request, Payload, Option<CollectionHandle>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ActionError>> + Send + 'static,
        R: Into<flongo_core::Reply>,
    {
        self.on(HttpMethod::Patch, f)
    }

    /// Binds `DELETE`.
    #[must_use]
    pub fn delete<F, Fut, R>(self, f: F) -> Self
    where
        F: Fn(Request, Payload, Option<CollectionHandle>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ActionError>> + Send + 'static,
        R: Into<flongo_core::Reply>,
    {
        self.on(HttpMethod::Delete, f)
    }

    /// Builds a handler from method names, as read from configuration.
    ///
    /// Names are case-insensitive. Anything outside `GET`, `POST`, `PUT`,
    /// `PATCH` and `DELETE` fails construction.
    pub fn from_named<I, S>(actions: I) -> Result<Self, RouteConfigError>
    where
        I: IntoIterator<Item = (S, Action)>,
        S: AsRef<str>,
    {
        let mut handler = Self::new();
        for (name, action) in actions {
            let method = name.as_ref().parse::<HttpMethod>()?;
            handler = handler.with_action(method, action);
        }
        Ok(handler)
    }

    /// A handler performing basic CRUD against the route's collection.
    ///
    /// | Method | Behaviour |
    /// |---|---|
    /// | `GET` | `find_one` by `_id` when given, otherwise `find` with the payload as filter |
    /// | `POST` | inserts the payload, `201` with the new `_id` |
    /// | `PUT` | replaces the document with the payload's `_id` |
    /// | `PATCH` | sets the payload's fields on the document with its `_id` |
    /// | `DELETE` | deletes the document with the payload's `_id` |
    ///
    /// Without a collection every method fails with a resource error.
    #[must_use]
    pub fn crud() -> Self {
        Self::new()
            .get(crud_read)
            .post(crud_create)
            .put(crud_replace)
            .patch(crud_modify)
            .delete(crud_remove)
    }

    /// Returns the action bound to `method`.
    #[must_use]
    pub fn action(&self, method: HttpMethod) -> Option<&Action> {
        self.methods.get(&method)
    }

    /// Iterates over bound methods in binding order.
    pub fn methods(&self) -> impl Iterator<Item = HttpMethod> + '_ {
        self.methods.keys().copied()
    }

    /// Iterates over bindings in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (HttpMethod, &Action)> {
        self.methods.iter().map(|(method, action)| (*method, action))
    }

    /// Returns `true` if no method is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

fn not_found(request: &Request, collection: &CollectionHandle, id: &Value) -> ApiError {
    ApiError::new(format!(
        "No document with _id [{}] in collection [{}]",
        display_id(id),
        collection.name()
    ))
    .with_status(StatusCode::NOT_FOUND)
    .with_data("url", request.path())
    .with_data(ID_FIELD, id.clone())
}

fn display_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn counts<T: serde::Serialize>(result: &T) -> Result<ApiResponse, ActionError> {
    ApiResponse::try_json(result).map_err(ActionError::other)
}

async fn crud_read(
    request: Request,
    payload: Payload,
    collection: Option<CollectionHandle>,
) -> Result<ApiResponse, ActionError> {
    let collection = ensure_collection(request.path(), collection)?;

    if let Some(id) = payload.get(ID_FIELD) {
        return match collection.find_one(&document::id_filter(id)).await? {
            Some(found) => Ok(ApiResponse::json(Value::Object(found))),
            None => Err(not_found(&request, &collection, id).into()),
        };
    }

    let found = collection.find(&payload).await?;
    Ok(ApiResponse::json(Value::Array(
        found.into_iter().map(Value::Object).collect(),
    )))
}

async fn crud_create(
    request: Request,
    payload: Payload,
    collection: Option<CollectionHandle>,
) -> Result<ApiResponse, ActionError> {
    let collection = ensure_collection(request.path(), collection)?;
    let result = collection.insert_one(payload).await?;
    Ok(ApiResponse::json(json!({ "_id": result.inserted_id })).with_status(StatusCode::CREATED))
}

async fn crud_replace(
    request: Request,
    payload: Payload,
    collection: Option<CollectionHandle>,
) -> Result<ApiResponse, ActionError> {
    let collection = ensure_collection(request.path(), collection)?;
    let id = ensure_field(&payload, ID_FIELD)?.clone();

    let result = collection
        .update_one(&document::id_filter(&id), &payload, false)
        .await?;
    if result.matched_count == 0 {
        return Err(not_found(&request, &collection, &id).into());
    }
    counts(&result)
}

async fn crud_modify(
    request: Request,
    mut payload: Payload,
    collection: Option<CollectionHandle>,
) -> Result<ApiResponse, ActionError> {
    let collection = ensure_collection(request.path(), collection)?;
    let id = ensure_field(&payload, ID_FIELD)?.clone();
    payload.remove(ID_FIELD);

    let mut update = Map::new();
    update.insert("$set".to_string(), Value::Object(payload));

    let result = collection
        .update_one(&document::id_filter(&id), &update, false)
        .await?;
    if result.matched_count == 0 {
        return Err(not_found(&request, &collection, &id).into());
    }
    counts(&result)
}

async fn crud_remove(
    request: Request,
    payload: Payload,
    collection: Option<CollectionHandle>,
) -> Result<ApiResponse, ActionError> {
    let collection = ensure_collection(request.path(), collection)?;
    let id = ensure_field(&payload, ID_FIELD)?;

    let result = collection.delete_one(&document::id_filter(id)).await?;
    if result.deleted_count == 0 {
        return Err(not_found(&request, &collection, id).into());
    }
    counts(&result)
}
