//! HTTP server.
//!
//! The server binds a TCP listener, serves HTTP/1.1 connections with hyper
//! and hands each request to [`Application::handle`]. It stops accepting on
//! shutdown and waits for open connections, up to the shutdown timeout.
//!
//! # Example
//!
//! ```rust,ignore
//! use portico_config::ConfigLoader;
//! use portico_server::{Application, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_defaults().load()?;
//!     Server::new(Application::new(config)).run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use portico_core::types::{Request, Response};
use portico_core::{PorticoError, PorticoResult};
use portico_session::SessionStore;
use portico_telemetry::{record_request, InFlightGuard};
use tokio::net::{TcpListener, TcpStream};

use crate::application::Application;
use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// The Portico HTTP server.
///
/// Address and timeouts come from the application's `server` section.
pub struct Server {
    app: Arc<Application>,
    http_addr: String,
    request_timeout: Duration,
    shutdown_timeout: Duration,
    max_body_bytes: usize,
    sweep_interval: Duration,
}

impl Server {
    /// Creates a server for `app`.
    #[must_use]
    pub fn new(app: Application) -> Self {
        let settings = &app.config().server;
        Self {
            http_addr: settings.http_addr.clone(),
            request_timeout: Duration::from_millis(settings.request_timeout_ms),
            shutdown_timeout: Duration::from_secs(settings.shutdown_timeout_secs),
            max_body_bytes: usize::try_from(settings.max_body_bytes).unwrap_or(usize::MAX),
            sweep_interval: Duration::from_secs(app.config().session.sweep_interval_secs),
            app: Arc::new(app),
        }
    }

    /// Overrides the listen address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// The application being served.
    #[must_use]
    pub fn app(&self) -> &Application {
        &self.app
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Runs the server until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Runs the server until `shutdown` is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr: SocketAddr = self.http_addr.parse().map_err(|e| {
            ServerError::BindError(format!("Invalid address '{}': {e}", self.http_addr))
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::IoError(e.to_string()))?;

        tracing::info!(
            addr = %local_addr,
            app = %self.app.config().app.name,
            env = %self.app.config().app.env,
            "server listening"
        );

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();
        tokio::spawn(sweep_sessions(
            Arc::clone(server.app.store()),
            server.sweep_interval,
            shutdown.clone(),
        ));

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(err) = server.handle_connection(stream, remote_addr, shutdown).await {
                                    tracing::debug!(remote = %remote_addr, error = %err, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        tracing::info!(
            timeout = ?server.shutdown_timeout,
            active = tracker.active_connections(),
            "waiting for connections to close"
        );

        tokio::select! {
            () = tracker.wait_for_shutdown() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(server.shutdown_timeout) => {
                tracing::warn!(
                    active = tracker.active_connections(),
                    "shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |request: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(request).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                tracing::debug!(remote = %remote_addr, "draining connection");
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(
        &self,
        request: http::Request<Incoming>,
    ) -> Result<Response, Infallible> {
        let _in_flight = InFlightGuard::new();
        let started = Instant::now();
        let method = request.method().clone();

        let read = buffer(request, self.max_body_bytes);
        let request = match tokio::time::timeout(self.request_timeout, read).await {
            Ok(Ok(request)) => request,
            Ok(Err(err)) => {
                return Ok(self.finish(&method, started, self.app.error_handler().render(&err)));
            }
            Err(_) => {
                let err = PorticoError::http(
                    StatusCode::REQUEST_TIMEOUT,
                    "Request body collection timed out",
                );
                return Ok(self.finish(&method, started, self.app.error_handler().render(&err)));
            }
        };

        let path = request.uri().path().to_string();
        let response = match tokio::time::timeout(self.request_timeout, self.app.handle(request)).await
        {
            Ok(response) => response,
            Err(_) => {
                tracing::warn!(method = %method, path = %path, "request timed out");
                let err = PorticoError::http(StatusCode::GATEWAY_TIMEOUT, "Request timed out");
                self.app.error_handler().render(&err)
            }
        };
        Ok(self.finish(&method, started, response))
    }

    fn finish(&self, method: &http::Method, started: Instant, response: Response) -> Response {
        let elapsed = started.elapsed();
        tracing::debug!(
            method = %method,
            status = response.status().as_u16(),
            duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "request completed"
        );
        record_request(method.as_str(), response.status().as_u16(), elapsed);
        response
    }
}

/// Reads the whole body, up to `limit` bytes, so the request can be handed
/// to the application. A bigger body is a 413, a broken one a 400.
async fn buffer<B>(request: http::Request<B>, limit: usize) -> PorticoResult<Request>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = request.into_parts();
    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(PorticoError::http(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Request body exceeds {limit} bytes"),
            ));
        }
        Err(err) => {
            return Err(PorticoError::http(
                StatusCode::BAD_REQUEST,
                format!("Failed to read request body: {err}"),
            ));
        }
    };
    Ok(http::Request::from_parts(parts, Full::new(bytes)))
}

/// Drops expired sessions every `every` until `shutdown` fires.
async fn sweep_sessions(store: Arc<dyn SessionStore>, every: Duration, shutdown: ShutdownSignal) {
    let mut ticks = tokio::time::interval(every);
    ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let stopped = shutdown.recv();
    tokio::pin!(stopped);

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                let removed = store.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "expired sessions dropped");
                }
            }
            () = &mut stopped => break,
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("http_addr", &self.http_addr)
            .field("request_timeout", &self.request_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}
