//! # Handlers HTTP para Jobs
//! src/jobs/handlers.rs
//!
//! Adaptan el `JobGateway` al wire format JSON:
//! - `POST /job` con body `{"payload": "..."}` → `202 {"job_id": N}`
//! - `GET /status/{id}` → `200 {"job_id": N, "status": "pending"}`

use crate::http::{Method, Request, Response, StatusCode};
use crate::jobs::error::JobError;
use crate::jobs::gateway::JobGateway;
use crate::jobs::types::{JobId, JobStatus};
use crate::router::Router;
use serde::{Deserialize, Serialize};

/// Segundos sugeridos en `Retry-After` cuando la cola está llena
pub const RETRY_AFTER_SECS: u64 = 5;

/// Prefijo de la ruta de consulta
pub const STATUS_PREFIX: &str = "/status/";

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub payload: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SubmitResponse {
    pub job_id: JobId,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Registra `POST /job` y `GET /status/{id}` en el router
pub fn register_routes(router: &mut Router, gateway: JobGateway) {
    let submit_gateway = gateway.clone();
    router.register(Method::POST, "/job", move |req: &Request| {
        submit_handler(req, &submit_gateway)
    });
    router.register_prefix(Method::GET, STATUS_PREFIX, move |req: &Request| {
        status_handler(req, &gateway)
    });
}

/// Handler para `POST /job`
///
/// # Ejemplo de response
/// ```json
/// {"job_id": 1}
/// ```
pub fn submit_handler(req: &Request, gateway: &JobGateway) -> Response {
    let body: SubmitRequest = match serde_json::from_slice(req.body()) {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(error = %e, "Rejecting malformed submit body");
            return Response::error(StatusCode::BadRequest, "Invalid request body");
        }
    };

    match gateway.submit(body.payload.as_deref()) {
        Ok(job_id) => {
            Response::json_with_status(StatusCode::Accepted, &SubmitResponse { job_id })
        }
        Err(error) => error_response(&error),
    }
}

/// Handler para `GET /status/{id}`
///
/// # Ejemplo de response
/// ```json
/// {"job_id": 1, "status": "processing"}
/// ```
pub fn status_handler(req: &Request, gateway: &JobGateway) -> Response {
    let raw_id = req.path().strip_prefix(STATUS_PREFIX).unwrap_or_default();

    // Solo dígitos: `parse` aceptaría un `+` inicial
    let parsed = if raw_id.bytes().all(|b| b.is_ascii_digit()) {
        raw_id.parse::<u64>().ok()
    } else {
        None
    };

    let job_id = match parsed {
        Some(id) => JobId::new(id),
        None => {
            return Response::error(
                StatusCode::BadRequest,
                &format!("Invalid job id: {:?}", raw_id),
            );
        }
    };

    match gateway.query(job_id) {
        Ok(status) => Response::json(&StatusResponse { job_id, status }),
        Err(error) => error_response(&error),
    }
}

/// Traduce un `JobError` a su código HTTP
pub fn error_response(error: &JobError) -> Response {
    match error {
        JobError::InvalidPayload(_) => Response::error(StatusCode::BadRequest, &error.to_string()),
        JobError::QueueFull { .. } => {
            Response::error(StatusCode::ServiceUnavailable, &error.to_string())
                .with_header("Retry-After", &RETRY_AFTER_SECS.to_string())
        }
        JobError::ShuttingDown => {
            Response::error(StatusCode::ServiceUnavailable, &error.to_string())
        }
        JobError::NotFound(_) => Response::error(StatusCode::NotFound, "Job not found"),
        JobError::InvalidTransition { .. } => {
            tracing::error!(error = %error, "Unexpected transition error at the HTTP layer");
            Response::error(StatusCode::InternalServerError, "Internal Server Error")
        }
    }
}
