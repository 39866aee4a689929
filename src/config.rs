//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor de jobs con soporte para argumentos CLI y
//! variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./job_server --port 8080 \
//!   --workers 5 \
//!   --queue-capacity 100 \
//!   --admission-policy reject \
//!   --shutdown-mode drain
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! JOB_SERVER_PORT=9000 JOB_SERVER_WORKERS=8 ./job_server
//! ```

use crate::jobs::queue::AdmissionPolicy;
use crate::lifecycle::ShutdownMode;
use clap::{Parser, ValueEnum};
use std::time::Duration;
use thiserror::Error;

/// Qué hacer con un submit cuando la cola está llena
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AdmissionPolicyArg {
    /// Esperar hasta `--submit-timeout-ms` a que se libere un lugar
    Block,
    /// Responder 503 de inmediato
    Reject,
}

/// Qué hacer con los jobs encolados al apagar
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShutdownModeArg {
    /// Dejarlos `pending` y frenar en el próximo borde de iteración
    Abandon,
    /// Procesarlos hasta `--drain-timeout-ms`
    Drain,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("workers must be >= 1")]
    NoWorkers,

    #[error("queue capacity must be >= 1")]
    NoQueueCapacity,

    #[error("min delay ({min_ms} ms) must not exceed max delay ({max_ms} ms)")]
    InvertedDelays { min_ms: u64, max_ms: u64 },

    #[error("max payload bytes must be >= 1")]
    NoPayloadLimit,

    #[error("shutdown timeout must be > 0")]
    NoShutdownTimeout,
}

/// Configuración del servidor de jobs
#[derive(Debug, Clone, Parser)]
#[command(name = "job_server")]
#[command(about = "Servidor HTTP/1.0 de jobs asíncronos con cola acotada y pool de workers")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "JOB_SERVER_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "JOB_SERVER_HOST")]
    pub host: String,

    // === Workers y cola ===
    /// Número de workers
    #[arg(short, long, default_value = "5", env = "JOB_SERVER_WORKERS")]
    pub workers: usize,

    /// Capacidad máxima de la cola de jobs
    #[arg(long, default_value = "100", env = "JOB_SERVER_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Política cuando la cola está llena
    #[arg(long, value_enum, default_value = "block", env = "JOB_SERVER_ADMISSION_POLICY")]
    pub admission_policy: AdmissionPolicyArg,

    /// Cuánto espera un submit con la política `block`
    #[arg(long, default_value = "5000", env = "JOB_SERVER_SUBMIT_TIMEOUT_MS")]
    pub submit_timeout_ms: u64,

    // === Procesamiento simulado ===
    /// Duración mínima de un job
    #[arg(long, default_value = "5000", env = "JOB_SERVER_MIN_DELAY_MS")]
    pub min_delay_ms: u64,

    /// Duración máxima de un job
    #[arg(long, default_value = "30000", env = "JOB_SERVER_MAX_DELAY_MS")]
    pub max_delay_ms: u64,

    /// Tamaño máximo del payload en bytes
    #[arg(long, default_value = "65536", env = "JOB_SERVER_MAX_PAYLOAD_BYTES")]
    pub max_payload_bytes: usize,

    // === Apagado ===
    #[arg(long, value_enum, default_value = "abandon", env = "JOB_SERVER_SHUTDOWN_MODE")]
    pub shutdown_mode: ShutdownModeArg,

    /// Máximo tiempo vaciando la cola en modo `drain`
    #[arg(long, default_value = "30000", env = "JOB_SERVER_DRAIN_TIMEOUT_MS")]
    pub drain_timeout_ms: u64,

    /// Máximo tiempo esperando a los workers al apagar
    #[arg(long, default_value = "45000", env = "JOB_SERVER_SHUTDOWN_TIMEOUT_MS")]
    pub shutdown_timeout_ms: u64,

    // === Logging ===
    /// Filtro de logs estilo RUST_LOG (ej: "info", "job_server=debug")
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_filter: String,
}

impl Config {
    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use job_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::NoQueueCapacity);
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvertedDelays {
                min_ms: self.min_delay_ms,
                max_ms: self.max_delay_ms,
            });
        }
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::NoPayloadLimit);
        }
        if self.shutdown_timeout_ms == 0 {
            return Err(ConfigError::NoShutdownTimeout);
        }
        Ok(())
    }

    pub fn admission(&self) -> AdmissionPolicy {
        match self.admission_policy {
            AdmissionPolicyArg::Block => AdmissionPolicy::Block {
                timeout: Duration::from_millis(self.submit_timeout_ms),
            },
            AdmissionPolicyArg::Reject => AdmissionPolicy::Reject,
        }
    }

    pub fn shutdown(&self) -> ShutdownMode {
        match self.shutdown_mode {
            ShutdownModeArg::Abandon => ShutdownMode::Abandon,
            ShutdownModeArg::Drain => ShutdownMode::Drain {
                timeout: Duration::from_millis(self.drain_timeout_ms),
            },
        }
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Límite del body HTTP.
    ///
    /// Un payload escapado en JSON (`\uXXXX`) ocupa hasta 6 bytes por byte.
    pub fn max_request_body_bytes(&self) -> usize {
        self.max_payload_bytes.saturating_mul(6).saturating_add(1024)
    }

    /// Loguea la configuración efectiva
    pub fn log_summary(&self) {
        tracing::info!(
            address = %self.address(),
            workers = self.workers,
            queue_capacity = self.queue_capacity,
            admission = ?self.admission(),
            "Network and worker pool"
        );
        tracing::info!(
            min_delay_ms = self.min_delay_ms,
            max_delay_ms = self.max_delay_ms,
            max_payload_bytes = self.max_payload_bytes,
            "Job processing"
        );
        tracing::info!(
            mode = ?self.shutdown(),
            shutdown_timeout_ms = self.shutdown_timeout_ms,
            "Shutdown"
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            workers: 5,
            queue_capacity: 100,
            admission_policy: AdmissionPolicyArg::Block,
            submit_timeout_ms: 5_000,
            min_delay_ms: 5_000,
            max_delay_ms: 30_000,
            max_payload_bytes: 64 * 1024,
            shutdown_mode: ShutdownModeArg::Abandon,
            drain_timeout_ms: 30_000,
            shutdown_timeout_ms: 45_000,
            log_filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.workers, 5);
        assert_eq!(config.queue_capacity, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_matches_cli_defaults() {
        let parsed = Config::try_parse_from(["job_server"]).unwrap();
        let default = Config::default();

        assert_eq!(parsed.port, default.port);
        assert_eq!(parsed.workers, default.workers);
        assert_eq!(parsed.queue_capacity, default.queue_capacity);
        assert_eq!(parsed.admission_policy, default.admission_policy);
        assert_eq!(parsed.shutdown_mode, default.shutdown_mode);
        assert_eq!(parsed.min_delay_ms, default.min_delay_ms);
        assert_eq!(parsed.max_delay_ms, default.max_delay_ms);
        assert_eq!(parsed.shutdown_timeout_ms, default.shutdown_timeout_ms);
    }

    #[test]
    fn test_parse_custom_flags() {
        let config = Config::try_parse_from([
            "job_server",
            "--port",
            "3000",
            "--workers",
            "2",
            "--admission-policy",
            "reject",
            "--shutdown-mode",
            "drain",
            "--drain-timeout-ms",
            "100",
        ])
        .unwrap();

        assert_eq!(config.address(), "127.0.0.1:3000");
        assert_eq!(config.workers, 2);
        assert_eq!(config.admission(), AdmissionPolicy::Reject);
        assert_eq!(
            config.shutdown(),
            ShutdownMode::Drain {
                timeout: Duration::from_millis(100)
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_policy() {
        assert!(Config::try_parse_from(["job_server", "--admission-policy", "drop"]).is_err());
    }

    #[test]
    fn test_block_policy_uses_submit_timeout() {
        let config = Config {
            submit_timeout_ms: 250,
            ..Config::default()
        };
        assert_eq!(
            config.admission(),
            AdmissionPolicy::Block {
                timeout: Duration::from_millis(250)
            }
        );
    }

    // ==================== Validation ====================

    #[test]
    fn test_validate_invalid_workers() {
        let config = Config {
            workers: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoWorkers));
    }

    #[test]
    fn test_validate_invalid_queue_capacity() {
        let config = Config {
            queue_capacity: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoQueueCapacity));
    }

    #[test]
    fn test_validate_inverted_delays() {
        let config = Config {
            min_delay_ms: 10,
            max_delay_ms: 5,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min delay (10 ms)"));
    }

    #[test]
    fn test_validate_equal_delays_ok() {
        let config = Config {
            min_delay_ms: 0,
            max_delay_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_payload_limit_and_timeout() {
        let config = Config {
            max_payload_bytes: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoPayloadLimit));

        let config = Config {
            shutdown_timeout_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoShutdownTimeout));
    }

    #[test]
    fn test_request_body_limit_covers_escaped_payload() {
        let config = Config {
            max_payload_bytes: 10,
            ..Config::default()
        };
        assert_eq!(config.max_request_body_bytes(), 10 * 6 + 1024);
    }

    #[test]
    fn test_config_log_summary() {
        // No debe hacer panic sin subscriber instalado
        Config::default().log_summary();
    }
}
