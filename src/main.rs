//! # Job Server - Entry Point
//! src/main.rs
//!
//! Arranca el servidor de jobs y espera SIGINT/SIGTERM para apagarlo.
//!
//! Códigos de salida:
//! - `0`: todos los workers terminaron a tiempo
//! - `1`: algún worker seguía ocupado en el deadline de apagado
//! - `2`: configuración inválida o error al arrancar

use clap::Parser;
use job_server::app::App;
use job_server::config::Config;
use job_server::shutdown::install_shutdown_handler;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return ExitCode::from(2);
    }
    config.log_summary();

    // Antes de arrancar workers, así una señal temprana no se pierde
    let shutdown = match install_shutdown_handler() {
        Ok(signal) => signal,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return ExitCode::from(2);
        }
    };

    let app = match App::start(&config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, address = %config.address(), "Failed to start server");
            return ExitCode::from(2);
        }
    };

    shutdown.wait();

    let report = app.shutdown();
    if report.is_clean() {
        tracing::info!(abandoned = report.abandoned, "Shutdown complete");
        ExitCode::SUCCESS
    } else {
        tracing::error!(stuck = ?report.stuck, "Shutdown deadline exceeded");
        ExitCode::from(1)
    }
}
