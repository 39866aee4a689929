//! # Módulo HTTP
//!
//! Implementación mínima de HTTP/1.0 sobre `TcpStream`:
//!
//! - Parsing de requests (request line, headers, body por `Content-Length`)
//! - Construcción de responses JSON
//! - Status codes que usa el servidor de jobs
//!
//! Una conexión = un request; el servidor cierra después de responder.

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
