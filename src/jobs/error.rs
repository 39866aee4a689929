//! # Errores del Sistema de Jobs
//! src/jobs/error.rs

use crate::jobs::types::{JobId, JobStatus};
use thiserror::Error;

/// Errores que puede devolver el gateway, la cola o el registro
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Submission malformada: nunca entra a la cola
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// La cola está llena (rechazo inmediato o timeout esperando espacio)
    #[error("Queue is full (max capacity: {capacity})")]
    QueueFull { capacity: usize },

    /// La cola fue cerrada por el apagado del servidor
    #[error("Server is shutting down, no new jobs are accepted")]
    ShuttingDown,

    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// Escritura fuera del orden pending → processing → terminal
    #[error("Invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
}

/// Fallo reportado por un `JobProcessor`.
///
/// Solo es observable por el cliente como el estado `failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProcessingError {
    message: String,
}

impl ProcessingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            JobError::QueueFull { capacity: 100 }.to_string(),
            "Queue is full (max capacity: 100)"
        );
        assert_eq!(
            JobError::NotFound(JobId::new(999)).to_string(),
            "Job not found: 999"
        );
        assert_eq!(
            JobError::InvalidTransition {
                id: JobId::new(3),
                from: JobStatus::Completed,
                to: JobStatus::Processing,
            }
            .to_string(),
            "Invalid transition for job 3: completed -> processing"
        );
    }

    #[test]
    fn test_processing_error_message() {
        let err = ProcessingError::new("disk on fire");
        assert_eq!(err.message(), "disk on fire");
        assert_eq!(err.to_string(), "disk on fire");
    }
}
