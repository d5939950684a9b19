//! Async TCP transport using Tokio.
//!
//! Accepts TCP connections and hands each complete HTTP/1.1 request to a
//! [`Dispatcher`]. Persistent connections (keep-alive) are supported; read
//! and write deadlines come from [`ServerConfig`].

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::http::{Request, RequestError, Response, StatusCode};

mod access_log;
mod config;
mod dispatcher;

pub use access_log::{AccessEntry, AccessLog, TracingAccessLog};
pub use config::{
    DEFAULT_MAX_REQUEST_SIZE, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT, ServerConfig,
};
pub use dispatcher::Dispatcher;

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// The quimby HTTP server.
///
/// Registration happens on the [`Dispatcher`] before it is handed over; once
/// bound, the router is shared read-only by every connection task.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use quimby::controller::HealthCheckController;
/// use quimby::server::{Dispatcher, Server};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut dispatcher = Dispatcher::new(None);
///     dispatcher.add_controller(Arc::new(HealthCheckController))?;
///
///     let server = Server::bind("127.0.0.1:8080", dispatcher).await?;
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    config: ServerConfig,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>, dispatcher: Dispatcher) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            dispatcher: Arc::new(dispatcher),
            config: ServerConfig::default(),
        })
    }

    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accepts connections until the listener fails, spawning one task per
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the TCP listener itself fails.
    pub async fn run(self) -> Result<(), ServerError> {
        info!(
            address = %self.local_addr,
            routes = self.dispatcher.router().registered_routes().len(),
            "quimby listening"
        );

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let dispatcher = Arc::clone(&self.dispatcher);
            let config = self.config;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, dispatcher, config).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Handles a single TCP connection over its lifetime.
///
/// One request is read per iteration until the peer closes the connection,
/// a request asks for `Connection: close`, or a deadline passes.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    config: ServerConfig,
) -> Result<(), std::io::Error> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);
    let mut peer_closed = false;

    loop {
        if !peer_closed && !has_complete_request(&buf) {
            let read = timeout(config.read_timeout_value(), stream.read_buf(&mut buf)).await;
            let bytes_read = match read {
                Ok(result) => result?,
                Err(_) => {
                    debug!(peer = %peer_addr, "read deadline elapsed");
                    break;
                }
            };

            if bytes_read == 0 {
                if buf.is_empty() {
                    debug!(peer = %peer_addr, "connection closed by peer");
                    break;
                }
                peer_closed = true;
            }
        }

        if buf.len() > config.max_request_size_value() {
            warn!(peer = %peer_addr, size = buf.len(), "request too large, sending 413");
            let response = Response::new(StatusCode::PayloadTooLarge)
                .body("Request entity too large")
                .keep_alive(false);
            write_response(&mut stream, response, &config).await?;
            break;
        }

        let (request, body_offset) = match Request::parse(&buf) {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) if peer_closed => {
                debug!(peer = %peer_addr, "peer closed before the request head completed");
                break;
            }
            Err(RequestError::Incomplete) => continue,
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                let response = Response::new(StatusCode::BadRequest)
                    .body(format!("Bad Request: {e}"))
                    .keep_alive(false);
                write_response(&mut stream, response, &config).await?;
                break;
            }
        };

        let declared = body_len(&request);
        let total_needed = body_offset.saturating_add(declared);
        if buf.len() < total_needed && !peer_closed {
            continue;
        }

        // a half-closed peer gets its request dispatched with what arrived
        let consumed = total_needed.min(buf.len());
        let mut frame = buf.split_to(consumed);
        let body = frame.split_off(body_offset).freeze();
        let request = request.with_body(body);
        let keep_alive = request.is_keep_alive() && !peer_closed;

        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "dispatching request"
        );

        let response = dispatcher
            .dispatch(request, Some(peer_addr))
            .keep_alive(keep_alive);
        write_response(&mut stream, response, &config).await?;

        if !keep_alive {
            debug!(peer = %peer_addr, "closing connection");
            break;
        }
    }

    Ok(())
}

fn has_complete_request(buf: &[u8]) -> bool {
    match Request::parse(buf) {
        Ok((request, offset)) => buf.len() >= offset.saturating_add(body_len(&request)),
        Err(RequestError::Incomplete) => false,
        // let the caller answer malformed heads without waiting for more data
        Err(_) => true,
    }
}

fn body_len(request: &Request) -> usize {
    request
        .content_length()
        .and_then(|length| usize::try_from(length).ok())
        .unwrap_or(0)
}

async fn write_response(
    stream: &mut TcpStream,
    response: Response,
    config: &ServerConfig,
) -> Result<(), std::io::Error> {
    let bytes = response.into_bytes();
    let write = async {
        stream.write_all(&bytes).await?;
        stream.flush().await
    };
    match timeout(config.write_timeout_value(), write).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "response write deadline elapsed",
        )),
    }
}
