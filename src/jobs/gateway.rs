//! # Gateway de Submission y Consulta
//! src/jobs/gateway.rs
//!
//! Las dos operaciones que la capa HTTP adapta al wire format:
//!
//! - `submit(payload) -> JobId`
//! - `query(job_id) -> JobStatus`
//!
//! La asignación del ID, el registro como `pending` y el encolado ocurren
//! como una sola unidad: cuando `submit` retorna un ID, `query` con ese ID
//! nunca da `NotFound`, y una submission rechazada no consume ningún ID.

use crate::jobs::error::JobError;
use crate::jobs::ids::IdGenerator;
use crate::jobs::queue::{AdmissionPolicy, JobQueue};
use crate::jobs::registry::JobRegistry;
use crate::jobs::types::{Job, JobId, JobStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Tamaño máximo de payload por defecto (64 KiB)
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct JobGateway {
    ids: IdGenerator,
    registry: JobRegistry,
    queue: JobQueue,
    policy: AdmissionPolicy,
    max_payload_bytes: usize,
    submitted: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
}

impl JobGateway {
    pub fn new(
        ids: IdGenerator,
        registry: JobRegistry,
        queue: JobQueue,
        policy: AdmissionPolicy,
    ) -> Self {
        Self {
            ids,
            registry,
            queue,
            policy,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            submitted: Arc::new(AtomicU64::new(0)),
            rejected: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_max_payload_bytes(mut self, max_payload_bytes: usize) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }

    /// Encola un nuevo job y retorna su ID
    pub fn submit(&self, payload: Option<&str>) -> Result<JobId, JobError> {
        let payload = match self.validate(payload) {
            Ok(payload) => payload,
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let result = self.queue.admit(self.policy, || {
            let id = self.ids.next_id();
            self.registry.insert(id);
            Job::new(id, payload.to_string())
        });

        match &result {
            Ok(job_id) => {
                self.submitted.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%job_id, "Job accepted");
            }
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Job rejected");
            }
        }

        result
    }

    /// Obtiene el estado de un job
    pub fn query(&self, job_id: JobId) -> Result<JobStatus, JobError> {
        self.registry.get(job_id).ok_or(JobError::NotFound(job_id))
    }

    fn validate<'a>(&self, payload: Option<&'a str>) -> Result<&'a str, JobError> {
        let payload =
            payload.ok_or_else(|| JobError::InvalidPayload("payload is required".to_string()))?;

        if payload.trim().is_empty() {
            return Err(JobError::InvalidPayload("payload must not be empty".to_string()));
        }

        if payload.len() > self.max_payload_bytes {
            return Err(JobError::InvalidPayload(format!(
                "payload exceeds {} bytes",
                self.max_payload_bytes
            )));
        }

        Ok(payload)
    }

    /// Jobs aceptados desde el arranque
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Submissions rechazadas (validación o admisión)
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }
}
