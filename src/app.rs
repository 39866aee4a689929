//! # Ensamblado del Servidor
//! src/app.rs
//!
//! Construye y conecta todos los componentes a partir de la `Config`:
//!
//! ```text
//! IdGenerator ─┐
//! JobRegistry ─┼─▶ JobGateway ─▶ handlers ─┐
//! JobQueue ────┘                           ├─▶ Router ─▶ Server (thread propio)
//! WorkerPool ─▶ LifecycleCoordinator ─▶ /metrics ─┘
//! ```
//!
//! El servidor HTTP y los workers tienen señales de stop distintas: al
//! apagar, primero se detienen los workers (el servidor sigue respondiendo
//! consultas de estado) y recién después el servidor.

use crate::config::Config;
use crate::jobs::gateway::JobGateway;
use crate::jobs::handlers;
use crate::jobs::ids::IdGenerator;
use crate::jobs::pool::WorkerPool;
use crate::jobs::processor::{JobProcessor, SimulatedProcessor};
use crate::jobs::queue::JobQueue;
use crate::jobs::registry::JobRegistry;
use crate::lifecycle::{LifecycleCoordinator, LifecycleHandle, ShutdownReport};
use crate::metrics::{self, EngineProbe, MetricsCollector};
use crate::router::Router;
use crate::server::Server;
use crate::shutdown::StopSignal;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct App {
    address: SocketAddr,
    gateway: JobGateway,
    coordinator: LifecycleCoordinator,
    server_stop: StopSignal,
    server_thread: Option<JoinHandle<io::Result<()>>>,
}

impl App {
    /// Arranca con el procesador simulado (delay aleatorio)
    pub fn start(config: &Config) -> io::Result<Self> {
        let processor = SimulatedProcessor::new(config.min_delay(), config.max_delay());
        Self::start_with_processor(config, Arc::new(processor))
    }

    pub fn start_with_processor(
        config: &Config,
        processor: Arc<dyn JobProcessor>,
    ) -> io::Result<Self> {
        let registry = JobRegistry::new();
        let queue = JobQueue::new(config.queue_capacity);
        let gateway = JobGateway::new(
            IdGenerator::new(),
            registry.clone(),
            queue.clone(),
            config.admission(),
        )
        .with_max_payload_bytes(config.max_payload_bytes);

        let worker_stop = StopSignal::new();
        let pool = WorkerPool::spawn(
            config.workers,
            queue.clone(),
            registry,
            processor,
            worker_stop.clone(),
        )?;
        let workers = pool.size();
        let busy_workers = pool.busy_counter();

        let coordinator = LifecycleCoordinator::new(
            queue,
            pool,
            worker_stop,
            config.shutdown(),
            config.shutdown_timeout(),
        );
        let probe = EngineProbe {
            gateway: gateway.clone(),
            workers,
            busy_workers,
            lifecycle: coordinator.handle(),
        };

        let collector = MetricsCollector::new();
        let mut router = Router::new();
        handlers::register_routes(&mut router, gateway.clone());
        metrics::register_routes(&mut router, collector.clone(), probe);

        let server_stop = StopSignal::new();
        let (address, server_thread) =
            match spawn_server(config, router, collector, server_stop.clone()) {
                Ok(started) => started,
                Err(e) => {
                    // Los workers ya corren: frenarlos antes de fallar
                    coordinator.shutdown();
                    return Err(e);
                }
            };

        tracing::info!(%address, workers = config.workers, "Job server started");

        Ok(Self {
            address,
            gateway,
            coordinator,
            server_stop,
            server_thread: Some(server_thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    pub fn gateway(&self) -> &JobGateway {
        &self.gateway
    }

    pub fn lifecycle(&self) -> LifecycleHandle {
        self.coordinator.handle()
    }

    /// Apaga workers y después el servidor HTTP
    pub fn shutdown(mut self) -> ShutdownReport {
        let report = self.coordinator.shutdown();
        self.stop_server();
        report
    }

    fn stop_server(&mut self) {
        self.server_stop.cancel();
        if let Some(handle) = self.server_thread.take() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
                Err(_) => tracing::error!("HTTP server thread panicked"),
            }
        }
    }
}

/// Bind, dirección efectiva y thread del accept loop
fn spawn_server(
    config: &Config,
    router: Router,
    collector: MetricsCollector,
    stop: StopSignal,
) -> io::Result<(SocketAddr, JoinHandle<io::Result<()>>)> {
    let server = Server::bind(config.address(), router, collector)?
        .with_max_body_bytes(config.max_request_body_bytes());
    let address = server.local_addr()?;

    let handle = thread::Builder::new()
        .name("http-server".to_string())
        .spawn(move || server.run(&stop))?;

    Ok((address, handle))
}

impl Drop for App {
    fn drop(&mut self) {
        if self.server_thread.is_some() {
            self.coordinator.shutdown();
            self.stop_server();
        }
    }
}
