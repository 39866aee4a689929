//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! `GET /metrics` combina:
//! - Contadores y latencias HTTP (`MetricsCollector`)
//! - Jobs por estado, submissions aceptadas/rechazadas
//! - Ocupación de la cola y de los workers
//! - Fase del ciclo de vida

pub mod collector;

pub use collector::{MetricsCollector, MetricsSnapshot};

use crate::http::{Method, Request, Response};
use crate::jobs::gateway::JobGateway;
use crate::lifecycle::LifecycleHandle;
use crate::router::Router;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Vista de solo lectura del motor de jobs
#[derive(Clone)]
pub struct EngineProbe {
    pub gateway: JobGateway,
    pub workers: usize,
    pub busy_workers: Arc<AtomicUsize>,
    pub lifecycle: LifecycleHandle,
}

impl EngineProbe {
    pub fn to_json(&self) -> Value {
        json!({
            "state": self.lifecycle.state(),
            "jobs": {
                "submitted": self.gateway.submitted(),
                "rejected": self.gateway.rejected(),
                "by_status": self.gateway.registry().counts(),
            },
            "queue": self.gateway.queue().stats(),
            "workers": {
                "total": self.workers,
                "busy": self.busy_workers.load(Ordering::SeqCst),
            },
        })
    }
}

pub fn metrics_handler(collector: &MetricsCollector, probe: &EngineProbe) -> Response {
    let mut body = collector.to_json();
    if let (Some(body), Value::Object(engine)) = (body.as_object_mut(), probe.to_json()) {
        body.extend(engine);
    }
    Response::json(&body)
}

/// Registra `GET /metrics`
pub fn register_routes(router: &mut Router, collector: MetricsCollector, probe: EngineProbe) {
    router.register(Method::GET, "/metrics", move |_req: &Request| {
        metrics_handler(&collector, &probe)
    });
}
