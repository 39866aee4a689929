//! # Cliente de Carga
//! src/bin/client.rs
//!
//! Simula varios clientes concurrentes: cada uno envía algunos jobs y
//! después consulta periódicamente el estado de todos los suyos.
//!
//! ```bash
//! ./job_client --clients 2 --requests 2 --checks 10
//! ```

use clap::Parser;
use job_server::client::JobClient;
use job_server::jobs::JobId;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "job_client")]
#[command(about = "Cliente de carga para el servidor de jobs")]
struct Args {
    /// Dirección del servidor (host:port)
    #[arg(long, default_value = "127.0.0.1:8080", env = "JOB_SERVER_ADDR")]
    server: String,

    /// Clientes concurrentes
    #[arg(long, default_value = "2")]
    clients: usize,

    /// Jobs por cliente
    #[arg(long, default_value = "2")]
    requests: usize,

    /// Rondas de consulta de estado
    #[arg(long, default_value = "10")]
    checks: usize,

    /// Pausa entre submissions
    #[arg(long, default_value = "500")]
    submit_interval_ms: u64,

    /// Pausa entre consultas de estado
    #[arg(long, default_value = "5000")]
    check_interval_ms: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    let args = Args::parse();
    let client = JobClient::new(args.server.clone());

    let handles: Vec<_> = (0..args.clients)
        .filter_map(|client_id| {
            let client = client.clone();
            let spawned = thread::Builder::new()
                .name(format!("client-{}", client_id))
                .spawn({
                    let requests = args.requests;
                    let checks = args.checks;
                    let submit_interval = Duration::from_millis(args.submit_interval_ms);
                    let check_interval = Duration::from_millis(args.check_interval_ms);
                    move || {
                        simulate_client(
                            &client,
                            client_id,
                            requests,
                            checks,
                            submit_interval,
                            check_interval,
                        )
                    }
                });

            match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::error!(client_id, error = %e, "Failed to spawn client thread");
                    None
                }
            }
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            tracing::error!("Client thread panicked");
        }
    }

    tracing::info!("All clients finished");
}

fn simulate_client(
    client: &JobClient,
    client_id: usize,
    requests: usize,
    checks: usize,
    submit_interval: Duration,
    check_interval: Duration,
) {
    tracing::info!(client_id, requests, "Sending job requests");

    let mut job_ids: Vec<JobId> = Vec::with_capacity(requests);
    for j in 0..requests {
        let payload = format!("Client {} Job {}", client_id, j);
        match client.submit(&payload) {
            Ok(job_id) => {
                tracing::info!(client_id, %job_id, "Job created");
                job_ids.push(job_id);
            }
            Err(e) => tracing::warn!(client_id, error = %e, "Job request failed"),
        }
        thread::sleep(submit_interval);
    }

    let start = Instant::now();
    for round in 0..checks {
        for job_id in &job_ids {
            match client.status(*job_id) {
                Ok(status) => tracing::info!(client_id, %job_id, %status, "Job status"),
                Err(e) => tracing::warn!(client_id, %job_id, error = %e, "Status query failed"),
            }
            thread::sleep(check_interval);
        }

        tracing::info!(
            client_id,
            round,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Status round finished"
        );
    }
}
