//! # Flongo Core
//!
//! Core types shared by every Flongo crate.
//!
//! - [`ApiError`] - The structured error propagated out of the request pipeline
//! - [`ErrorKind`] - Closed set of error origins (declared, request handling, ...)
//! - [`SchemaValidationError`] - A payload that violated a route schema
//! - [`ActionError`] - Everything a user action may fail with
//! - [`HttpMethod`] - The five methods a route may bind
//! - [`Request`] / [`ApiResponse`] - The request handed to actions and the reply they build
//! - [`Payload`] - Merged query and body data
//! - [`CallerIdentity`] - Who is making the request

#![doc(html_root_url = "https://docs.rs/flongo-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod identity;
mod method;
mod payload;
mod request;
mod response;

pub use error::{
    ActionError, ApiError, ApiResult, ErrorBody, ErrorKind, HttpError, SchemaValidationError,
};
pub use identity::{CallerIdentity, UserIdentity};
pub use method::{HttpMethod, UnsupportedMethod};
pub use payload::{ensure_field, Payload};
pub use request::{Request, RequestId};
pub use response::{ApiResponse, Reply, ResponseBody};
