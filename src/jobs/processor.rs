//! # Procesadores de Jobs
//! src/jobs/processor.rs
//!
//! `JobProcessor` es la capacidad que ejecuta un job. El pool de workers
//! solo conoce este trait, así una carga real puede reemplazar al
//! procesador simulado sin tocar el pool.

use crate::jobs::error::ProcessingError;
use crate::jobs::types::Job;
use rand::Rng;
use std::thread;
use std::time::Duration;

/// Ejecuta un job. Un `Err` deja el job en `failed` y no se reintenta.
pub trait JobProcessor: Send + Sync {
    fn process(&self, job: &Job) -> Result<(), ProcessingError>;
}

/// Procesador de ejemplo: duerme un tiempo aleatorio en
/// `[min_delay, max_delay]` y siempre termina bien.
#[derive(Debug, Clone)]
pub struct SimulatedProcessor {
    min_delay: Duration,
    max_delay: Duration,
}

impl SimulatedProcessor {
    /// Si `min_delay > max_delay` se intercambian
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        if min_delay <= max_delay {
            Self { min_delay, max_delay }
        } else {
            Self {
                min_delay: max_delay,
                max_delay: min_delay,
            }
        }
    }

    /// Elige la duración de la simulación para un job
    pub fn pick_delay(&self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for SimulatedProcessor {
    /// Entre 5 y 30 segundos
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(30))
    }
}

impl JobProcessor for SimulatedProcessor {
    fn process(&self, job: &Job) -> Result<(), ProcessingError> {
        let delay = self.pick_delay();
        tracing::debug!(
            job_id = %job.id(),
            payload_len = job.payload().len(),
            delay_ms = delay.as_millis() as u64,
            "Simulating job"
        );
        thread::sleep(delay);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::JobId;
    use std::time::Instant;

    #[test]
    fn test_delay_within_bounds() {
        let processor =
            SimulatedProcessor::new(Duration::from_millis(5), Duration::from_millis(30));

        for _ in 0..1000 {
            let delay = processor.pick_delay();
            assert!(delay >= Duration::from_millis(5));
            assert!(delay <= Duration::from_millis(30));
        }
    }

    #[test]
    fn test_swapped_bounds_are_normalized() {
        let processor =
            SimulatedProcessor::new(Duration::from_millis(30), Duration::from_millis(5));

        let delay = processor.pick_delay();
        assert!(delay >= Duration::from_millis(5));
        assert!(delay <= Duration::from_millis(30));
    }

    #[test]
    fn test_fixed_delay() {
        let processor =
            SimulatedProcessor::new(Duration::from_millis(20), Duration::from_millis(20));
        assert_eq!(processor.pick_delay(), Duration::from_millis(20));
    }

    #[test]
    fn test_process_sleeps_and_succeeds() {
        let processor =
            SimulatedProcessor::new(Duration::from_millis(10), Duration::from_millis(20));
        let job = Job::new(JobId::new(1), "A".to_string());

        let start = Instant::now();
        assert!(processor.process(&job).is_ok());
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_default_uses_seconds_range() {
        let processor = SimulatedProcessor::default();
        let delay = processor.pick_delay();
        assert!(delay >= Duration::from_secs(5));
        assert!(delay <= Duration::from_secs(30));
    }
}
