//! # Cola Acotada de Jobs
//! src/jobs/queue.rs
//!
//! Cola FIFO thread-safe con capacidad máxima. Es el único mecanismo de
//! control de admisión (backpressure) del sistema.
//!
//! ## Política de admisión
//!
//! - `Block`: si la cola está llena el que envía espera hasta que se libere
//!   un lugar, como máximo `timeout`. Si vence, recibe `QueueFull`.
//! - `Reject`: si la cola está llena se rechaza inmediatamente con
//!   `QueueFull`.
//!
//! ## Cierre
//!
//! `close()` impide nuevas admisiones. Los workers siguen desencolando lo que
//! quedó; cuando la cola cerrada se vacía, `dequeue` retorna `Closed`.

use crate::jobs::error::JobError;
use crate::jobs::types::{Job, JobId};
use crate::shutdown::StopSignal;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Cada cuánto un worker ocioso revisa la señal de stop aunque nadie lo
/// despierte
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Qué hacer cuando la cola está llena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionPolicy {
    /// Esperar espacio como máximo `timeout`
    Block { timeout: Duration },

    /// Fallar inmediatamente
    Reject,
}

/// Resultado de `dequeue`
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued {
    /// El job más antiguo de la cola
    Job(Job),

    /// La cola está cerrada y vacía: no habrá más trabajo
    Closed,

    /// Se levantó la señal de stop mientras se esperaba un job
    Stopped,
}

/// Estadísticas de la cola
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub len: usize,
    pub capacity: usize,
    pub closed: bool,
}

struct QueueState {
    jobs: VecDeque<Job>,
    closed: bool,
}

struct QueueInner {
    state: Mutex<QueueState>,

    /// Notifica a workers cuando hay nuevos jobs (o cierre)
    not_empty: Condvar,

    /// Notifica a submitters bloqueados cuando se libera espacio (o cierre)
    not_full: Condvar,

    capacity: usize,
}

/// Cola FIFO acotada y thread-safe
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

impl JobQueue {
    /// Crea una nueva cola con capacidad máxima
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    jobs: VecDeque::with_capacity(capacity),
                    closed: false,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                capacity,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admite un job nuevo según la política.
    ///
    /// `make_job` se invoca solo cuando ya hay lugar garantizado y con el
    /// lock de la cola tomado: ahí se asigna el ID y se registra el job, así
    /// una submission rechazada nunca consume un ID.
    pub fn admit<F>(&self, policy: AdmissionPolicy, make_job: F) -> Result<JobId, JobError>
    where
        F: FnOnce() -> Job,
    {
        let mut state = self.lock();

        match policy {
            AdmissionPolicy::Reject => {
                if state.closed {
                    return Err(JobError::ShuttingDown);
                }
                if state.jobs.len() >= self.inner.capacity {
                    return Err(JobError::QueueFull {
                        capacity: self.inner.capacity,
                    });
                }
            }
            AdmissionPolicy::Block { timeout } => {
                let deadline = Instant::now() + timeout;
                loop {
                    if state.closed {
                        return Err(JobError::ShuttingDown);
                    }
                    if state.jobs.len() < self.inner.capacity {
                        break;
                    }

                    let now = Instant::now();
                    if now >= deadline {
                        return Err(JobError::QueueFull {
                            capacity: self.inner.capacity,
                        });
                    }

                    state = self
                        .inner
                        .not_full
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }

        let job = make_job();
        let id = job.id();
        state.jobs.push_back(job);

        // Notificar a un worker esperando
        self.inner.not_empty.notify_one();

        Ok(id)
    }

    /// Desencola el job más antiguo.
    ///
    /// Bloquea mientras la cola esté vacía y abierta. Si hay jobs se
    /// entregan aunque la cola esté cerrada (drain); la señal de stop solo
    /// se atiende cuando no hay nada listo.
    pub fn dequeue(&self, stop: &StopSignal) -> Dequeued {
        let mut state = self.lock();

        loop {
            if let Some(job) = state.jobs.pop_front() {
                self.inner.not_full.notify_one();
                return Dequeued::Job(job);
            }

            if state.closed {
                return Dequeued::Closed;
            }

            if stop.is_cancelled() {
                return Dequeued::Stopped;
            }

            // Esperar a que haya jobs (o revisar stop periódicamente)
            state = self
                .inner
                .not_empty
                .wait_timeout(state, STOP_POLL_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Intenta desencolar sin bloquear
    pub fn try_dequeue(&self) -> Option<Job> {
        let job = self.lock().jobs.pop_front();
        if job.is_some() {
            self.inner.not_full.notify_one();
        }
        job
    }

    /// Cierra la cola: no se admiten más jobs.
    ///
    /// Despierta a todos los workers y submitters bloqueados. Idempotente.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        self.inner.not_empty.notify_all();
        self.inner.not_full.notify_all();
    }

    /// Despierta a los workers ociosos para que revisen la señal de stop
    pub fn wake_workers(&self) {
        let _state = self.lock();
        self.inner.not_empty.notify_all();
    }

    /// Retorna el tamaño actual de la cola
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        QueueStats {
            len: state.jobs.len(),
            capacity: self.inner.capacity,
            closed: state.closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn job(n: u64) -> Job {
        Job::new(JobId::new(n), format!("payload-{}", n))
    }

    #[test]
    fn test_fifo_order() {
        let queue = JobQueue::new(10);
        let stop = StopSignal::new();

        for n in 1..=3 {
            queue.admit(AdmissionPolicy::Reject, || job(n)).unwrap();
        }

        assert_eq!(queue.dequeue(&stop), Dequeued::Job(job(1)));
        assert_eq!(queue.dequeue(&stop), Dequeued::Job(job(2)));
        assert_eq!(queue.dequeue(&stop), Dequeued::Job(job(3)));
    }

    // ==================== Admission ====================

    #[test]
    fn test_reject_policy_when_full() {
        let queue = JobQueue::new(2);

        assert!(queue.admit(AdmissionPolicy::Reject, || job(1)).is_ok());
        assert!(queue.admit(AdmissionPolicy::Reject, || job(2)).is_ok());

        let mut called = false;
        let result = queue.admit(AdmissionPolicy::Reject, || {
            called = true;
            job(3)
        });

        assert_eq!(result, Err(JobError::QueueFull { capacity: 2 }));
        assert!(!called, "make_job must not run when the job is rejected");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_block_policy_times_out_when_full() {
        let queue = JobQueue::new(1);
        let policy = AdmissionPolicy::Block {
            timeout: Duration::from_millis(100),
        };
        queue.admit(policy, || job(1)).unwrap();

        let start = Instant::now();
        let result = queue.admit(policy, || job(2));

        assert_eq!(result, Err(JobError::QueueFull { capacity: 1 }));
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_block_policy_waits_for_free_slot() {
        let queue = JobQueue::new(1);
        let policy = AdmissionPolicy::Block {
            timeout: Duration::from_secs(5),
        };
        queue.admit(policy, || job(1)).unwrap();

        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                queue.try_dequeue()
            })
        };

        let start = Instant::now();
        assert_eq!(queue.admit(policy, || job(2)), Ok(JobId::new(2)));
        assert!(start.elapsed() >= Duration::from_millis(50));

        assert_eq!(consumer.join().unwrap(), Some(job(1)));
        assert_eq!(queue.try_dequeue(), Some(job(2)));
    }

    #[test]
    fn test_admit_after_close_fails() {
        let queue = JobQueue::new(10);
        queue.close();

        assert_eq!(
            queue.admit(AdmissionPolicy::Reject, || job(1)),
            Err(JobError::ShuttingDown)
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_close_wakes_blocked_submitter() {
        let queue = JobQueue::new(1);
        let policy = AdmissionPolicy::Block {
            timeout: Duration::from_secs(30),
        };
        queue.admit(policy, || job(1)).unwrap();

        let submitter = {
            let queue = queue.clone();
            thread::spawn(move || queue.admit(policy, || job(2)))
        };

        thread::sleep(Duration::from_millis(50));
        queue.close();

        assert_eq!(submitter.join().unwrap(), Err(JobError::ShuttingDown));
    }

    // ==================== Dequeue ====================

    #[test]
    fn test_closed_queue_drains_before_reporting_closed() {
        let queue = JobQueue::new(10);
        let stop = StopSignal::new();
        queue.admit(AdmissionPolicy::Reject, || job(1)).unwrap();
        queue.admit(AdmissionPolicy::Reject, || job(2)).unwrap();

        queue.close();

        assert_eq!(queue.dequeue(&stop), Dequeued::Job(job(1)));
        assert_eq!(queue.dequeue(&stop), Dequeued::Job(job(2)));
        assert_eq!(queue.dequeue(&stop), Dequeued::Closed);
    }

    #[test]
    fn test_dequeue_returns_stopped_on_empty_queue() {
        let queue = JobQueue::new(10);
        let stop = StopSignal::new();

        let worker = {
            let queue = queue.clone();
            let stop = stop.clone();
            thread::spawn(move || queue.dequeue(&stop))
        };

        thread::sleep(Duration::from_millis(50));
        stop.cancel();
        queue.wake_workers();

        assert_eq!(worker.join().unwrap(), Dequeued::Stopped);
    }

    #[test]
    fn test_dequeue_notices_stop_without_wakeup() {
        let queue = JobQueue::new(10);
        let stop = StopSignal::new();

        let worker = {
            let queue = queue.clone();
            let stop = stop.clone();
            thread::spawn(move || queue.dequeue(&stop))
        };

        thread::sleep(Duration::from_millis(50));
        stop.cancel();

        assert_eq!(worker.join().unwrap(), Dequeued::Stopped);
    }

    #[test]
    fn test_dequeue_wakes_up_on_new_job() {
        let queue = JobQueue::new(10);
        let stop = StopSignal::new();

        let worker = {
            let queue = queue.clone();
            let stop = stop.clone();
            thread::spawn(move || queue.dequeue(&stop))
        };

        thread::sleep(Duration::from_millis(50));
        queue.admit(AdmissionPolicy::Reject, || job(9)).unwrap();

        assert_eq!(worker.join().unwrap(), Dequeued::Job(job(9)));
    }

    #[test]
    fn test_stats() {
        let queue = JobQueue::new(5);
        queue.admit(AdmissionPolicy::Reject, || job(1)).unwrap();

        assert_eq!(
            queue.stats(),
            QueueStats {
                len: 1,
                capacity: 5,
                closed: false,
            }
        );

        queue.close();
        assert!(queue.stats().closed);
        assert!(queue.stats().closed);
        assert_eq!(queue.capacity(), 5);
    }
}
