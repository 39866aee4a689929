//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Servidor TCP que maneja múltiples conexiones simultáneas usando threads.
//! Cada conexión se procesa en su propio thread: se lee un request, se
//! responde y se cierra.
//!
//! El accept loop es no bloqueante y revisa la señal de stop cada
//! `ACCEPT_POLL_INTERVAL`, así el servidor puede apagarse sin una conexión
//! "despertadora".

use crate::http::request::{content_length, header_end};
use crate::http::{Request, Response, StatusCode};
use crate::metrics::MetricsCollector;
use crate::router::{add_common_headers, Router};
use crate::shutdown::StopSignal;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::Level;

/// Cada cuánto el accept loop revisa la señal de stop
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Tamaño máximo de request line + headers
const MAX_HEADER_BYTES: usize = 8192;

/// Tiempo máximo esperando bytes de un cliente lento
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Body máximo por defecto
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
enum ReadError {
    #[error("request exceeds {0} bytes")]
    TooLarge(usize),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Servidor HTTP/1.0 concurrente con métricas
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    metrics: MetricsCollector,
    max_body_bytes: usize,
}

impl Server {
    /// Abre el socket; usar puerto 0 para uno efímero
    pub fn bind(
        address: impl ToSocketAddrs,
        router: Router,
        metrics: MetricsCollector,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(address)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            listener,
            router: Arc::new(router),
            metrics,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Bodies más grandes se responden con 413 sin llegar al router
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Acepta conexiones hasta que se levante `stop`
    pub fn run(&self, stop: &StopSignal) -> io::Result<()> {
        let address = self.local_addr()?;
        tracing::info!(%address, "Server listening (one thread per connection)");

        while !stop.is_cancelled() {
            match self.listener.accept() {
                Ok((stream, peer)) => self.spawn_connection(stream, peer),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    stop.wait_timeout(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    stop.wait_timeout(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!(%address, "Server stopped accepting connections");
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let router = Arc::clone(&self.router);
        let metrics = self.metrics.clone();
        let max_body_bytes = self.max_body_bytes;

        tracing::trace!(%peer, "New connection");
        metrics.increment_active_connections();

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", peer))
            .spawn(move || {
                if let Err(e) = handle_connection(stream, &router, &metrics, max_body_bytes) {
                    tracing::warn!(%peer, error = %e, "Connection error");
                }
                metrics.decrement_active_connections();
            });

        if let Err(e) = spawned {
            tracing::error!(%peer, error = %e, "Failed to spawn connection thread");
            self.metrics.decrement_active_connections();
        }
    }
}

fn handle_connection(
    mut stream: TcpStream,
    router: &Router,
    metrics: &MetricsCollector,
    max_body_bytes: usize,
) -> io::Result<()> {
    let start = Instant::now();
    let request_id = format!("{:016x}", rand::random::<u64>());

    // Algunas plataformas heredan el modo no bloqueante del listener
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(READ_TIMEOUT))?;

    let (mut response, method, path) = match read_request(&mut stream, max_body_bytes) {
        Ok(buffer) if buffer.is_empty() => {
            tracing::trace!("Connection closed without a request");
            return Ok(());
        }
        Ok(buffer) => match Request::parse(&buffer) {
            Ok(request) => (
                router.route(&request),
                request.method().as_str(),
                request.path().to_string(),
            ),
            Err(e) => (
                Response::error(StatusCode::BadRequest, &format!("Invalid request: {}", e)),
                "-",
                "<invalid>".to_string(),
            ),
        },
        Err(ReadError::TooLarge(limit)) => (
            Response::error(
                StatusCode::PayloadTooLarge,
                &format!("Request exceeds {} bytes", limit),
            ),
            "-",
            "<invalid>".to_string(),
        ),
        Err(ReadError::Io(e)) => return Err(e),
    };

    add_common_headers(&mut response);
    response.add_header("X-Request-Id", &request_id);

    stream.write_all(&response.to_bytes())?;
    stream.flush()?;

    let latency = start.elapsed();
    let status = response.status().as_u16();
    metrics.record_request(&path, status, latency);

    let latency_ms = latency.as_secs_f64() * 1000.0;
    match response_level(response.status()) {
        Level::ERROR => tracing::error!(
            request_id = %request_id,
            method,
            path = %path,
            status,
            latency_ms,
            "Request served"
        ),
        Level::WARN => tracing::warn!(
            request_id = %request_id,
            method,
            path = %path,
            status,
            latency_ms,
            "Request served"
        ),
        _ => tracing::info!(
            request_id = %request_id,
            method,
            path = %path,
            status,
            latency_ms,
            "Request served"
        ),
    }

    Ok(())
}

/// 5xx se loguea como error, 4xx como warning
fn response_level(status: StatusCode) -> Level {
    if status.is_server_error() {
        Level::ERROR
    } else if status.is_client_error() {
        Level::WARN
    } else {
        Level::INFO
    }
}

/// Lee headers completos y `Content-Length` bytes de body
///
/// Un EOF antes de tiempo no es error: se devuelve lo leído y el parser
/// decide.
fn read_request(stream: &mut TcpStream, max_body_bytes: usize) -> Result<Vec<u8>, ReadError> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];

    loop {
        match header_end(&buffer) {
            Some(end) => {
                let body_len = content_length(&buffer[..end]);
                if body_len > max_body_bytes {
                    return Err(ReadError::TooLarge(max_body_bytes));
                }
                if buffer.len() >= end + body_len {
                    buffer.truncate(end + body_len);
                    return Ok(buffer);
                }
            }
            None if buffer.len() > MAX_HEADER_BYTES => {
                return Err(ReadError::TooLarge(MAX_HEADER_BYTES));
            }
            None => {}
        }

        let bytes_read = stream.read(&mut chunk)?;
        if bytes_read == 0 {
            return Ok(buffer);
        }
        buffer.extend_from_slice(&chunk[..bytes_read]);
    }
}
