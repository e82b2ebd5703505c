//! HTTP Listener
//!
//! Minimal HTTP/1.1 server for the leaderboard protocol. Accepts POST
//! requests, enforces the body size cap, and forwards bodies to the
//! dispatcher. One request per connection; the response always closes it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{tcp::OwnedWriteHalf, TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use crate::dispatch::{Dispatcher, Response};
use crate::MAX_BODY_BYTES;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            max_connections: 1000,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),
}

/// The leaderboard HTTP server.
pub struct HttpServer {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
}

impl HttpServer {
    /// Bind the listener; `run` starts serving.
    pub async fn bind(
        config: ServerConfig,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            dispatcher,
            listener,
            local_addr,
            shutdown_tx,
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until [`HttpServer::shutdown`] is called.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), ServerError> {
        info!("Leaderboard server listening on {}", self.local_addr);

        let active = Arc::new(AtomicUsize::new(0));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if active.load(Ordering::Relaxed) >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                // tell the client before dropping the stream
                                tokio::spawn(async move {
                                    let (_read_half, mut write_half) = stream.into_split();
                                    let _ = write_response(&mut write_half, &Response::error(503)).await;
                                });
                                continue;
                            }

                            debug!("New connection from {}", addr);
                            let dispatcher = self.dispatcher.clone();
                            let max_body = self.config.max_body_bytes;
                            let active = active.clone();
                            active.fetch_add(1, Ordering::Relaxed);

                            tokio::spawn(async move {
                                handle_connection(stream, addr, dispatcher, max_body).await;
                                active.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Signal the serve loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Handle one connection: parse the request head, enforce method and
/// body cap, dispatch, write the response. An aborted request just ends
/// this task; any in-flight store result is dropped with it.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    max_body: usize,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut request_line = String::new();
    match reader.read_line(&mut request_line).await {
        Ok(0) | Err(_) => return,
        Ok(_) => {}
    }
    let mut parts = request_line.split_whitespace();
    let (method, _target, _version) = match (parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v)) => (m.to_string(), t, v),
        _ => {
            debug!(%addr, "malformed request line");
            let _ = write_response(&mut write_half, &Response::error(400)).await;
            return;
        }
    };

    let mut content_length: Option<usize> = None;
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().ok();
            }
        }
    }

    if method != "POST" {
        debug!(%addr, %method, "method not allowed");
        let _ = write_response(&mut write_half, &Response::error(405)).await;
        return;
    }

    let len = match content_length {
        Some(len) => len,
        None => {
            debug!(%addr, "missing or invalid content length");
            let _ = write_response(&mut write_half, &Response::error(400)).await;
            return;
        }
    };

    // Reject oversized bodies without buffering them
    if len > max_body {
        warn!(%addr, len, "request body too large");
        let _ = write_response(&mut write_half, &Response::error(413)).await;
        // drain what the client already sent so the close stays graceful
        let cap = len.min(64 * 1024) as u64;
        let _ = tokio::io::copy(&mut reader.take(cap), &mut tokio::io::sink()).await;
        return;
    }

    let mut body = vec![0u8; len];
    if let Err(err) = reader.read_exact(&mut body).await {
        debug!(%addr, error = %err, "failed reading request body");
        return;
    }

    let response = dispatcher.handle_body(&body).await;
    if let Err(err) = write_response(&mut write_half, &response).await {
        debug!(%addr, error = %err, "failed writing response");
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

async fn write_response(writer: &mut OwnedWriteHalf, response: &Response) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        status_text(response.status),
        response.body.len(),
    );
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(response.body.as_bytes()).await?;
    writer.flush().await
}
