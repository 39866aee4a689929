//! # Generador de IDs
//! src/jobs/ids.rs
//!
//! Contador atómico que entrega identificadores 1, 2, 3, ...
//! Dos llamadas concurrentes nunca observan el mismo valor.

use crate::jobs::types::JobId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: Arc<AtomicU64>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserva el siguiente identificador
    pub fn next_id(&self) -> JobId {
        JobId::new(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Último identificador entregado (0 si todavía no hubo ninguno)
    pub fn last_issued(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}
