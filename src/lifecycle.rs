//! # Coordinador del Ciclo de Vida
//! src/lifecycle.rs
//!
//! Dueño del apagado del proceso: `running → stopping → stopped`.
//!
//! ## Protocolo de apagado
//!
//! 1. Pasar a `stopping`
//! 2. Cerrar la cola (nuevas submissions reciben `ShuttingDown`)
//! 3. Según el modo:
//!    - `Abandon`: levantar el stop de los workers ya mismo
//!    - `Drain`: dejar que vacíen la cola hasta `drain_timeout`, y recién
//!      ahí levantar el stop
//! 4. Esperar a los workers como máximo `shutdown_timeout`
//! 5. Pasar a `stopped` y reportar

use crate::jobs::pool::{JoinReport, WorkerPool};
use crate::jobs::queue::JobQueue;
use crate::shutdown::StopSignal;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Estado del proceso
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Running,
    Stopping,
    Stopped,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Running,
            1 => LifecycleState::Stopping,
            _ => LifecycleState::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        }
    }
}

/// Qué hacer con los jobs encolados que todavía no empezaron
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Frenar en el próximo borde de iteración; lo encolado queda `pending`
    Abandon,

    /// Procesar lo encolado antes de frenar, como máximo `timeout`
    Drain { timeout: Duration },
}

/// Resultado del apagado
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Workers joineados
    pub joined: usize,

    /// Workers que seguían ocupados en el deadline
    pub stuck: Vec<usize>,

    /// Jobs que quedaron en la cola sin empezar
    pub abandoned: usize,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.stuck.is_empty()
    }
}

/// Estado compartido para que otros threads (p.ej. /metrics) lean la fase
#[derive(Debug, Clone)]
pub struct LifecycleHandle {
    state: Arc<AtomicU8>,
}

impl LifecycleHandle {
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }
}

/// El pool hasta el primer apagado; después, su reporte
enum Phase {
    Running(WorkerPool),
    Finished(ShutdownReport),
}

pub struct LifecycleCoordinator {
    state: Arc<AtomicU8>,
    queue: JobQueue,
    worker_stop: StopSignal,
    phase: Mutex<Phase>,
    mode: ShutdownMode,
    shutdown_timeout: Duration,
}

impl LifecycleCoordinator {
    /// `worker_stop` debe ser la misma señal que recibió el pool
    pub fn new(
        queue: JobQueue,
        pool: WorkerPool,
        worker_stop: StopSignal,
        mode: ShutdownMode,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            state: Arc::new(AtomicU8::new(LifecycleState::Running as u8)),
            queue,
            worker_stop,
            phase: Mutex::new(Phase::Running(pool)),
            mode,
            shutdown_timeout,
        }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn handle(&self) -> LifecycleHandle {
        LifecycleHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Ejecuta el protocolo de apagado.
    ///
    /// Solo la primera llamada hace el trabajo. Las siguientes (incluso
    /// concurrentes) esperan a que termine y devuelven el mismo reporte.
    pub fn shutdown(&self) -> ShutdownReport {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);

        let pool = match std::mem::replace(&mut *phase, Phase::Finished(ShutdownReport::default())) {
            Phase::Running(pool) => pool,
            Phase::Finished(report) => {
                *phase = Phase::Finished(report.clone());
                return report;
            }
        };

        self.state
            .store(LifecycleState::Stopping as u8, Ordering::SeqCst);
        tracing::info!(mode = ?self.mode, busy_workers = pool.busy(), "Shutting down");

        let deadline = Instant::now() + self.shutdown_timeout;
        self.queue.close();

        match self.mode {
            ShutdownMode::Abandon => self.raise_stop(),
            ShutdownMode::Drain { timeout } => {
                self.wait_for_drain(timeout.min(self.shutdown_timeout));
                self.raise_stop();
            }
        }

        let join = pool.join(deadline);
        let abandoned = self.queue.len();

        self.state
            .store(LifecycleState::Stopped as u8, Ordering::SeqCst);

        if join.all_joined() {
            tracing::info!(joined = join.joined, abandoned, "All workers stopped");
        } else {
            tracing::error!(
                joined = join.joined,
                stuck = ?join.stuck,
                abandoned,
                "Some workers did not stop in time"
            );
        }
        let JoinReport { joined, stuck } = join;

        let report = ShutdownReport {
            joined,
            stuck,
            abandoned,
        };
        *phase = Phase::Finished(report.clone());
        report
    }

    fn raise_stop(&self) {
        self.worker_stop.cancel();
        self.queue.wake_workers();
    }

    /// Espera a que la cola cerrada se vacíe, como máximo `timeout`
    fn wait_for_drain(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while !self.queue.is_empty() {
            if Instant::now() >= deadline {
                tracing::warn!(remaining = self.queue.len(), "Drain timeout reached");
                return;
            }
            thread::sleep(DRAIN_POLL_INTERVAL);
        }
        tracing::info!("Queue drained");
    }
}
