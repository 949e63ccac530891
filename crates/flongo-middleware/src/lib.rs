//! # Flongo Middleware
//!
//! The reusable stages a route pipeline runs around a user action:
//!
//! ```text
//! Request → Parse → [Authorization] → [Request Validation] → Action → [Response Validation] → Response
//! ```
//!
//! - [`stages::validation`] - JSON-Schema validation of payloads and response bodies
//! - [`stages::authorization`] - The yes/no role gate run before validation
//! - [`stages::identity`] - Resolving who the caller is
//! - [`stages::cors`] - Cross-origin headers and preflight answers
//!
//! Stages hold no per-request state, so one instance is shared by every
//! concurrent request.

#![doc(html_root_url = "https://docs.rs/flongo-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod stages;

pub use stages::authorization::{AllowAll, DenyAll, IdentityRoleGate, RoleGate};
pub use stages::cors::{AllowedOrigins, CorsBuilder, CorsPolicy, CorsRejection};
pub use stages::identity::{HeaderIdentityResolver, IdentityResolver};
pub use stages::validation::{
    validate_value, RouteSchema, SchemaDocumentError, SchemaValidator, Violation,
};
