//! # Tipos y Estructuras para el Sistema de Jobs
//! src/jobs/types.rs
//!
//! Define los tipos fundamentales para el manejo de trabajos asíncronos:
//! el identificador, el job en sí y su estado.
//!
//! ## Ciclo de vida
//!
//! ```text
//! pending ──▶ processing ──┬──▶ completed
//!                          └──▶ failed
//! ```
//!
//! Ningún estado se revisita y los estados terminales nunca se sobrescriben.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identificador único de un job (siempre >= 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    /// Crea un identificador a partir de su valor numérico
    pub fn new(value: u64) -> Self {
        JobId(value)
    }

    /// Valor numérico del identificador
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        JobId(value)
    }
}

/// Estado de un job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job en cola esperando ejecución
    Pending,

    /// Job ejecutándose actualmente en un worker
    Processing,

    /// Job completado exitosamente
    Completed,

    /// Job falló (no se reintenta)
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Verifica si el job está en estado terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Verifica si `next` es un sucesor válido de este estado
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unidad de trabajo enviada por un cliente.
///
/// Inmutable después de su creación: la cola es su dueña hasta que un
/// worker la desencola, y desde ese momento pertenece solo a ese worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    id: JobId,
    payload: String,
}

impl Job {
    pub fn new(id: JobId, payload: String) -> Self {
        Self { id, payload }
    }

    /// ID del job
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Payload enviado por el cliente
    pub fn payload(&self) -> &str {
        &self.payload
    }
}
