//! The HTTP/1 server.
//!
//! Each connection is served by hyper on its own task. A request body is
//! collected up to `max_body_bytes`, the whole request is bounded by
//! `request_timeout_secs`, and the collected request goes to the
//! [`Dispatcher`].
//!
//! # Example
//!
//! ```rust,ignore
//! use flongo_config::ServerSettings;
//! use flongo_server::{Dispatcher, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), flongo_server::ServerError> {
//!     let settings = ServerSettings::default();
//!     let dispatcher = Dispatcher::from_settings(&settings);
//!     Server::new(settings, dispatcher).run().await
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use flongo_config::ServerSettings;
use flongo_core::ApiError;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

use crate::dispatch::Dispatcher;
use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};
use crate::translate::error_response;

/// Response type written to connections.
pub type HttpResponse = Response<Full<Bytes>>;

/// Serves a [`Dispatcher`] over HTTP/1.
#[derive(Debug)]
pub struct Server {
    settings: ServerSettings,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Creates a server for `dispatcher` with `settings`.
    #[must_use]
    pub fn new(settings: ServerSettings, dispatcher: Dispatcher) -> Self {
        Self {
            settings,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Returns the settings.
    #[must_use]
    pub const fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Returns the dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Binds the configured address and serves until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.settings.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections accepted on `listener` until `shutdown` fires,
    /// then waits up to the shutdown timeout for open connections.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(%addr, env = %self.settings.env, "Server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();

                        tokio::spawn(async move {
                            if let Err(error) = server.serve_connection(stream, remote_addr, shutdown).await {
                                tracing::debug!(%remote_addr, %error, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(error) => {
                        tracing::error!(%error, "failed to accept connection");
                    }
                },
                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let grace = server.settings.shutdown_timeout();
        tracing::info!(
            connections = tracker.active_connections(),
            "Waiting up to {grace:?} for connections to close"
        );
        tokio::select! {
            () = tracker.wait_for_shutdown() => {
                tracing::info!("All connections closed");
            }
            () = tokio::time::sleep(grace) => {
                tracing::warn!(
                    connections = tracker.active_connections(),
                    "Shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    async fn serve_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let server = Arc::clone(self);
        let service = service_fn(move |request: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(request).await) }
        });

        let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(connection);

        tokio::select! {
            result = connection.as_mut() => return result,
            () = shutdown.recv() => {
                tracing::debug!(%remote_addr, "draining connection");
                connection.as_mut().graceful_shutdown();
            }
        }
        connection.await
    }

    async fn handle_request(&self, request: Request<Incoming>) -> HttpResponse {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        tracing::debug!(%method, path, "request");

        let timeout = self.settings.request_timeout();
        match tokio::time::timeout(timeout, self.collect_and_dispatch(request)).await {
            Ok(response) => response,
            Err(_) => {
                tracing::warn!(%method, path, "request timed out");
                reject(
                    format!("Request to URL [{path}] timed out"),
                    StatusCode::GATEWAY_TIMEOUT,
                )
            }
        }
    }

    async fn collect_and_dispatch(&self, request: Request<Incoming>) -> HttpResponse {
        let (parts, body) = request.into_parts();
        let body = match Limited::new(body, self.settings.max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(error) if error.downcast_ref::<LengthLimitError>().is_some() => {
                return reject(
                    format!(
                        "Request body exceeds the limit of {} bytes",
                        self.settings.max_body_bytes
                    ),
                    StatusCode::PAYLOAD_TOO_LARGE,
                );
            }
            Err(error) => {
                tracing::warn!(%error, "failed to read request body");
                return reject(
                    format!("Failed to read request body: {error}"),
                    StatusCode::BAD_REQUEST,
                );
            }
        };

        self.dispatcher
            .dispatch(Request::from_parts(parts, body))
            .await
            .map(Full::new)
    }
}

fn reject(message: String, status: StatusCode) -> HttpResponse {
    let (status, headers, body) =
        error_response(&ApiError::request_handling(message, status)).into_parts();
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_invalid_address() {
        let mut settings = ServerSettings::default();
        settings.host = "not an address".to_string();

        let result = Server::new(settings, Dispatcher::new())
            .run_with_shutdown(ShutdownSignal::new())
            .await;
        assert!(matches!(result, Err(ServerError::Address(_))));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let mut settings = ServerSettings::default();
        settings.shutdown_timeout_secs = 1;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            Server::new(settings, Dispatcher::new()).serve(listener, shutdown),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));
    }

    #[test]
    fn test_reject_uses_error_shape() {
        let response = reject("too big".to_string(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()["content-type"], "application/json");
    }
}
