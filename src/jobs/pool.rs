//! # Pool de Workers
//! src/jobs/pool.rs
//!
//! N workers idénticos, cada uno en su propio thread, leyendo de la misma
//! cola. No se comunican entre sí: el balanceo de carga sale de competir
//! por la cola.
//!
//! ## Loop de cada worker
//!
//! ```text
//! loop {
//!     ¿stop levantado?  → salir        (borde de iteración)
//!     dequeue(stop)
//!       Job     → processing → process() → completed | failed
//!       Closed  → salir                  (cola cerrada y vacía)
//!       Stopped → salir                  (stop mientras esperaba)
//! }
//! ```
//!
//! La cancelación es cooperativa: un job en `process()` nunca se
//! interrumpe, así que el apagado puede demorar hasta un job por worker.

use crate::jobs::processor::JobProcessor;
use crate::jobs::queue::{Dequeued, JobQueue};
use crate::jobs::registry::JobRegistry;
use crate::jobs::types::{Job, JobStatus};
use crate::shutdown::StopSignal;
use serde::Serialize;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Resultado de esperar a los workers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    /// Workers que terminaron antes del deadline
    pub joined: usize,

    /// IDs de workers que seguían corriendo en el deadline
    pub stuck: Vec<usize>,
}

impl JoinReport {
    pub fn all_joined(&self) -> bool {
        self.stuck.is_empty()
    }
}

/// Dependencias compartidas por todos los workers
#[derive(Clone)]
struct WorkerContext {
    queue: JobQueue,
    registry: JobRegistry,
    processor: Arc<dyn JobProcessor>,
    stop: StopSignal,
    busy: Arc<AtomicUsize>,
}

pub struct WorkerPool {
    handles: Vec<(usize, JoinHandle<()>)>,
    size: usize,
    busy: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Inicia `size` workers
    pub fn spawn(
        size: usize,
        queue: JobQueue,
        registry: JobRegistry,
        processor: Arc<dyn JobProcessor>,
        stop: StopSignal,
    ) -> io::Result<Self> {
        let busy = Arc::new(AtomicUsize::new(0));
        let context = WorkerContext {
            queue,
            registry,
            processor,
            stop,
            busy: Arc::clone(&busy),
        };

        let mut handles = Vec::with_capacity(size);
        for worker_id in 0..size {
            let context = context.clone();
            let handle = thread::Builder::new()
                .name(format!("worker-{}", worker_id))
                .spawn(move || worker_loop(worker_id, context))?;
            handles.push((worker_id, handle));
        }

        Ok(Self {
            handles,
            size,
            busy,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers que están ejecutando un job en este momento
    pub fn busy(&self) -> usize {
        self.busy.load(Ordering::SeqCst)
    }

    /// Handle para leer `busy()` desde otros threads (métricas)
    pub fn busy_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.busy)
    }

    /// Espera a que los workers terminen, como máximo hasta `deadline`.
    ///
    /// Los que siguen corriendo en el deadline quedan desacoplados y se
    /// reportan en `stuck`.
    pub fn join(self, deadline: Instant) -> JoinReport {
        let mut pending = self.handles;
        let mut report = JoinReport::default();

        loop {
            let (finished, running): (Vec<_>, Vec<_>) =
                pending.into_iter().partition(|(_, handle)| handle.is_finished());

            for (worker_id, handle) in finished {
                if handle.join().is_err() {
                    tracing::error!(worker_id, "Worker thread panicked");
                }
                report.joined += 1;
            }

            pending = running;
            if pending.is_empty() {
                return report;
            }

            if Instant::now() >= deadline {
                report.stuck = pending.iter().map(|(worker_id, _)| *worker_id).collect();
                return report;
            }

            thread::sleep(JOIN_POLL_INTERVAL);
        }
    }
}

/// Loop principal del worker
fn worker_loop(worker_id: usize, context: WorkerContext) {
    tracing::info!(worker_id, "Worker started");

    loop {
        if context.stop.is_cancelled() {
            tracing::info!(worker_id, "Worker received stop signal");
            break;
        }

        match context.queue.dequeue(&context.stop) {
            Dequeued::Job(job) => {
                context.busy.fetch_add(1, Ordering::SeqCst);
                run_job(worker_id, &context, job);
                context.busy.fetch_sub(1, Ordering::SeqCst);
            }
            Dequeued::Closed => {
                tracing::info!(worker_id, "Queue closed and drained");
                break;
            }
            Dequeued::Stopped => {
                tracing::info!(worker_id, "Worker received stop signal while idle");
                break;
            }
        }
    }

    tracing::info!(worker_id, "Worker stopped");
}

/// Ejecuta un job y registra sus transiciones
fn run_job(worker_id: usize, context: &WorkerContext, job: Job) {
    let job_id = job.id();

    if let Err(e) = context.registry.set(job_id, JobStatus::Processing) {
        tracing::error!(worker_id, %job_id, error = %e, "Refusing to run job");
        return;
    }
    tracing::info!(worker_id, %job_id, "Started job");

    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| context.processor.process(&job)));
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let final_status = match outcome {
        Ok(Ok(())) => {
            tracing::info!(worker_id, %job_id, elapsed_ms, "Completed job");
            JobStatus::Completed
        }
        Ok(Err(e)) => {
            tracing::warn!(worker_id, %job_id, elapsed_ms, error = %e, "Failed to process job");
            JobStatus::Failed
        }
        Err(_) => {
            tracing::error!(worker_id, %job_id, elapsed_ms, "Processor panicked");
            JobStatus::Failed
        }
    };

    if let Err(e) = context.registry.set(job_id, final_status) {
        tracing::error!(worker_id, %job_id, error = %e, "Could not record final status");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::error::ProcessingError;
    use crate::jobs::queue::AdmissionPolicy;
    use crate::jobs::types::JobId;
    use std::sync::Mutex;

    /// Termina instantáneamente
    struct InstantProcessor;

    impl JobProcessor for InstantProcessor {
        fn process(&self, _job: &Job) -> Result<(), ProcessingError> {
            Ok(())
        }
    }

    /// Falla los jobs cuyo payload empieza con "fail"
    struct SelectiveProcessor;

    impl JobProcessor for SelectiveProcessor {
        fn process(&self, job: &Job) -> Result<(), ProcessingError> {
            if job.payload().starts_with("fail") {
                Err(ProcessingError::new("asked to fail"))
            } else {
                Ok(())
            }
        }
    }

    struct PanickingProcessor;

    impl JobProcessor for PanickingProcessor {
        fn process(&self, _job: &Job) -> Result<(), ProcessingError> {
            panic!("boom");
        }
    }

    /// Registra el orden en que procesa los jobs
    struct RecordingProcessor {
        seen: Mutex<Vec<JobId>>,
        delay: Duration,
    }

    impl JobProcessor for RecordingProcessor {
        fn process(&self, job: &Job) -> Result<(), ProcessingError> {
            thread::sleep(self.delay);
            self.seen.lock().unwrap().push(job.id());
            Ok(())
        }
    }

    fn enqueue(queue: &JobQueue, registry: &JobRegistry, n: u64, payload: &str) {
        queue
            .admit(AdmissionPolicy::Reject, || {
                registry.insert(JobId::new(n));
                Job::new(JobId::new(n), payload.to_string())
            })
            .unwrap();
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(10)
    }

    #[test]
    fn test_workers_process_all_jobs() {
        let queue = JobQueue::new(100);
        let registry = JobRegistry::new();
        let stop = StopSignal::new();

        for n in 1..=50 {
            enqueue(&queue, &registry, n, "work");
        }

        let pool = WorkerPool::spawn(
            4,
            queue.clone(),
            registry.clone(),
            Arc::new(InstantProcessor),
            stop,
        )
        .unwrap();
        assert_eq!(pool.size(), 4);

        queue.close();
        let report = pool.join(far_deadline());

        assert_eq!(report.joined, 4);
        assert!(report.all_joined());
        assert_eq!(registry.counts().completed, 50);
    }

    #[test]
    fn test_failed_jobs_are_marked_failed() {
        let queue = JobQueue::new(10);
        let registry = JobRegistry::new();

        enqueue(&queue, &registry, 1, "ok");
        enqueue(&queue, &registry, 2, "fail please");
        queue.close();

        let pool = WorkerPool::spawn(
            2,
            queue,
            registry.clone(),
            Arc::new(SelectiveProcessor),
            StopSignal::new(),
        )
        .unwrap();
        pool.join(far_deadline());

        assert_eq!(registry.get(JobId::new(1)), Some(JobStatus::Completed));
        assert_eq!(registry.get(JobId::new(2)), Some(JobStatus::Failed));
    }

    #[test]
    fn test_processor_panic_marks_job_failed() {
        let queue = JobQueue::new(10);
        let registry = JobRegistry::new();

        enqueue(&queue, &registry, 1, "explode");
        queue.close();

        let pool = WorkerPool::spawn(
            1,
            queue,
            registry.clone(),
            Arc::new(PanickingProcessor),
            StopSignal::new(),
        )
        .unwrap();
        let report = pool.join(far_deadline());

        assert!(report.all_joined());
        assert_eq!(registry.get(JobId::new(1)), Some(JobStatus::Failed));
    }

    #[test]
    fn test_single_worker_processes_in_fifo_order() {
        let queue = JobQueue::new(10);
        let registry = JobRegistry::new();
        let processor = Arc::new(RecordingProcessor {
            seen: Mutex::new(Vec::new()),
            delay: Duration::from_millis(1),
        });

        for n in 1..=5 {
            enqueue(&queue, &registry, n, "x");
        }
        queue.close();

        let pool = WorkerPool::spawn(
            1,
            queue,
            registry,
            processor.clone(),
            StopSignal::new(),
        )
        .unwrap();
        pool.join(far_deadline());

        let seen = processor.seen.lock().unwrap().clone();
        let expected: Vec<_> = (1..=5).map(JobId::new).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_stop_with_no_jobs_does_not_deadlock() {
        let queue = JobQueue::new(10);
        let stop = StopSignal::new();

        let pool = WorkerPool::spawn(
            5,
            queue.clone(),
            JobRegistry::new(),
            Arc::new(InstantProcessor),
            stop.clone(),
        )
        .unwrap();

        stop.cancel();
        queue.wake_workers();

        let report = pool.join(far_deadline());
        assert_eq!(report.joined, 5);
        assert!(report.stuck.is_empty());
    }

    #[test]
    fn test_stop_lets_in_flight_job_finish_and_leaves_rest_pending() {
        let queue = JobQueue::new(10);
        let registry = JobRegistry::new();
        let stop = StopSignal::new();
        let processor = Arc::new(RecordingProcessor {
            seen: Mutex::new(Vec::new()),
            delay: Duration::from_millis(200),
        });

        for n in 1..=3 {
            enqueue(&queue, &registry, n, "slow");
        }

        let pool = WorkerPool::spawn(
            1,
            queue.clone(),
            registry.clone(),
            processor,
            stop.clone(),
        )
        .unwrap();

        // Esperar a que el worker tome el primer job
        let start = Instant::now();
        while registry.get(JobId::new(1)) != Some(JobStatus::Processing) {
            assert!(start.elapsed() < Duration::from_secs(5));
            thread::sleep(Duration::from_millis(5));
        }

        stop.cancel();
        queue.close();
        let report = pool.join(far_deadline());

        assert!(report.all_joined());
        assert_eq!(registry.get(JobId::new(1)), Some(JobStatus::Completed));
        assert_eq!(registry.get(JobId::new(2)), Some(JobStatus::Pending));
        assert_eq!(registry.get(JobId::new(3)), Some(JobStatus::Pending));
        assert_eq!(registry.counts().processing, 0);
    }

    #[test]
    fn test_join_reports_stuck_workers() {
        let queue = JobQueue::new(10);
        let registry = JobRegistry::new();
        let processor = Arc::new(RecordingProcessor {
            seen: Mutex::new(Vec::new()),
            delay: Duration::from_millis(500),
        });

        enqueue(&queue, &registry, 1, "slow");

        let pool = WorkerPool::spawn(
            1,
            queue.clone(),
            registry.clone(),
            processor,
            StopSignal::new(),
        )
        .unwrap();

        let start = Instant::now();
        while registry.get(JobId::new(1)) != Some(JobStatus::Processing) {
            assert!(start.elapsed() < Duration::from_secs(5));
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(pool.busy(), 1);

        queue.close();
        let report = pool.join(Instant::now() + Duration::from_millis(50));

        assert_eq!(report.joined, 0);
        assert_eq!(report.stuck, vec![0]);
        assert!(!report.all_joined());
    }
}
