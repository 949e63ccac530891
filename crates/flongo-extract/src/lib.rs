//! # Flongo Extract
//!
//! Normalizes an inbound request into a single ordered [`Payload`].
//!
//! The query string is parsed first, then the body according to its declared
//! content type. Body fields replace query parameters with the same name.
//!
//! | Content type | Result |
//! |--------------|--------|
//! | `application/json`, `*+json` | the JSON object (non-objects land under `"data"`) |
//! | `application/x-www-form-urlencoded`, `application/form-data` | flat map of fields |
//! | `multipart/form-data` | text fields, plus metadata for uploaded files |
//! | `text/xml`, `application/xml`, `text/html`, `application/html` | structural map of the document |
//! | `text/plain` | `{"data": <raw text>}` |
//! | anything else | empty map and a logged diagnostic |
//!
//! Parsing never fails. Malformed bodies are logged and contribute nothing,
//! so the problem surfaces later as a schema violation or an action error.
//!
//! ## Example
//!
//! ```rust
//! use flongo_core::{HttpMethod, Request};
//! use flongo_extract::PayloadParser;
//! use http::{header::CONTENT_TYPE, HeaderValue};
//!
//! # tokio_test::block_on(async {
//! let request = Request::new(HttpMethod::Post, "/request?_id=1&page=2".parse().unwrap())
//!     .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
//!     .with_body(r#"{"_id": 5}"#);
//!
//! let payload = PayloadParser::new().parse(&request).await;
//! assert_eq!(payload["_id"], 5);
//! assert_eq!(payload["page"], 2);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/flongo-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod content;
mod form;
mod json;
mod multipart;
mod parser;
mod query;
mod xml;

pub use content::ContentKind;
pub use flongo_core::Payload;
pub use multipart::MultipartConfig;
pub use parser::PayloadParser;
pub use query::parse_query;
pub use xml::xml_to_map;
