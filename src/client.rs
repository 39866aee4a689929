//! # Cliente HTTP del Servidor de Jobs
//! src/client.rs
//!
//! Cliente bloqueante mínimo sobre `TcpStream` (HTTP/1.0, una conexión por
//! request). Lo usan el binario `job_client` y los tests de integración.

use crate::http::request::header_end;
use crate::http::Method;
use crate::jobs::handlers::{StatusResponse, SubmitResponse};
use crate::jobs::types::{JobId, JobStatus};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed HTTP response: {0}")]
    MalformedResponse(String),

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server answered {status}: {message}")]
    Http { status: u16, message: String },
}

/// Respuesta HTTP cruda
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,

    /// Nombres en minúsculas
    pub headers: HashMap<String, String>,

    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    fn into_error(self) -> ClientError {
        #[derive(Deserialize)]
        struct ErrorBody {
            error: String,
        }

        let message = serde_json::from_slice::<ErrorBody>(&self.body)
            .map(|body| body.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&self.body).into_owned());

        ClientError::Http {
            status: self.status,
            message,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobClient {
    address: String,
    timeout: Duration,
}

impl JobClient {
    /// `address` es `host:port`
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `POST /job`
    pub fn submit(&self, payload: &str) -> Result<JobId, ClientError> {
        let body = json!({ "payload": payload }).to_string();
        let reply = self.request(Method::POST, "/job", Some(body.as_bytes()))?;

        if reply.status != 202 {
            return Err(reply.into_error());
        }
        Ok(reply.json::<SubmitResponse>()?.job_id)
    }

    /// `GET /status/{id}`
    pub fn status(&self, job_id: JobId) -> Result<JobStatus, ClientError> {
        let reply = self.request(Method::GET, &format!("/status/{}", job_id), None)?;

        if reply.status != 200 {
            return Err(reply.into_error());
        }
        Ok(reply.json::<StatusResponse>()?.status)
    }

    /// `GET /metrics`
    pub fn metrics(&self) -> Result<serde_json::Value, ClientError> {
        let reply = self.request(Method::GET, "/metrics", None)?;

        if reply.status != 200 {
            return Err(reply.into_error());
        }
        reply.json()
    }

    /// Envía un request arbitrario y devuelve la respuesta sin interpretar
    pub fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&[u8]>,
    ) -> Result<HttpReply, ClientError> {
        let mut stream = TcpStream::connect(&self.address)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let mut raw = format!("{} {} HTTP/1.0\r\n", method.as_str(), path).into_bytes();
        if let Some(body) = body {
            raw.extend_from_slice(b"Content-Type: application/json\r\n");
            raw.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
            raw.extend_from_slice(b"\r\n");
            raw.extend_from_slice(body);
        } else {
            raw.extend_from_slice(b"\r\n");
        }
        stream.write_all(&raw)?;
        stream.flush()?;

        // El servidor cierra la conexión al terminar de responder
        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer)?;

        parse_reply(&buffer)
    }
}

fn parse_reply(buffer: &[u8]) -> Result<HttpReply, ClientError> {
    let end = header_end(buffer)
        .ok_or_else(|| ClientError::MalformedResponse("missing header terminator".to_string()))?;
    let head = String::from_utf8_lossy(&buffer[..end]);
    let mut lines = head.split("\r\n");

    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| ClientError::MalformedResponse("invalid status line".to_string()))?;

    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    Ok(HttpReply {
        status,
        headers,
        body: buffer[end..].to_vec(),
    })
}
