//! # Registro de Estados de Jobs
//! src/jobs/registry.rs
//!
//! Mapa thread-safe `JobId -> JobStatus` que vive en memoria durante toda
//! la vida del proceso. Las entradas nunca se eliminan, así las consultas
//! tardías siguen resolviendo.
//!
//! - Lecturas concurrentes ilimitadas (`RwLock`)
//! - Un solo escritor por job: el worker que lo desencoló
//! - El orden `pending → processing → {completed | failed}` se valida en
//!   cada escritura

use crate::jobs::error::JobError;
use crate::jobs::types::{JobId, JobStatus};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Cantidad de jobs por estado
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    statuses: Arc<RwLock<HashMap<JobId, JobStatus>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un job nuevo como `pending`.
    ///
    /// # Panics
    ///
    /// Si el ID ya existe: dos jobs con el mismo ID es un bug del generador,
    /// no un error recuperable.
    pub fn insert(&self, id: JobId) {
        let mut statuses = self.statuses.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = statuses.insert(id, JobStatus::Pending) {
            panic!("duplicate job id {} (existing status: {})", id, existing);
        }
    }

    /// Actualiza el estado de un job existente.
    ///
    /// La escritura es visible para todo `get` posterior. Una transición
    /// fuera de orden se rechaza y deja el estado anterior intacto.
    pub fn set(&self, id: JobId, status: JobStatus) -> Result<(), JobError> {
        let mut statuses = self.statuses.write().unwrap_or_else(PoisonError::into_inner);
        let current = statuses.get_mut(&id).ok_or(JobError::NotFound(id))?;

        if !current.can_transition_to(status) {
            return Err(JobError::InvalidTransition {
                id,
                from: *current,
                to: status,
            });
        }

        *current = status;
        Ok(())
    }

    /// Obtiene el estado actual de un job
    pub fn get(&self, id: JobId) -> Option<JobStatus> {
        let statuses = self.statuses.read().unwrap_or_else(PoisonError::into_inner);
        statuses.get(&id).copied()
    }

    /// Número de jobs registrados
    pub fn len(&self) -> usize {
        let statuses = self.statuses.read().unwrap_or_else(PoisonError::into_inner);
        statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cuenta los jobs por estado (para /metrics)
    pub fn counts(&self) -> StatusCounts {
        let statuses = self.statuses.read().unwrap_or_else(PoisonError::into_inner);

        let mut counts = StatusCounts::default();
        for status in statuses.values() {
            match status {
                JobStatus::Pending => counts.pending += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}
