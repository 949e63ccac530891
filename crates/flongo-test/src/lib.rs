//! # Flongo Test
//!
//! In-memory testing for Flongo applications. Requests go through the same
//! [`Dispatcher`](flongo_server::Dispatcher) and request pipeline as the
//! HTTP server, without binding a port.
//!
//! ```ignore
//! let client = TestClient::from_table(&routes, &context)?;
//!
//! let response = client.post("/request").json(&json!({"_id": 5})).send().await;
//! response.assert_status(StatusCode::CREATED);
//! ```

#![doc(html_root_url = "https://docs.rs/flongo-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::TestRequestBuilder;
pub use response::TestResponse;
