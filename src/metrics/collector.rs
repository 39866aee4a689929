//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta y agrega métricas de la capa HTTP en tiempo real.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Máximo de latencias guardadas para calcular percentiles
const MAX_LATENCY_SAMPLES: usize = 10_000;

/// Collector de métricas thread-safe
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsData>>,
    start_time: Instant,
}

#[derive(Default)]
struct MetricsData {
    total_requests: u64,

    status_codes: HashMap<u16, u64>,

    /// Ventana de latencias en microsegundos (las más viejas salen primero)
    latencies: VecDeque<u64>,

    /// Requests por ruta (normalizada, ver `route_label`)
    requests_per_route: HashMap<String, u64>,

    active_connections: u64,
}

/// Snapshot de métricas (para uso externo)
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub active_connections: u64,
    pub uptime_secs: u64,
    pub latency_p50_us: u64,
    pub latency_p95_us: u64,
    pub latency_p99_us: u64,
    pub latency_avg_us: u64,
}

/// Agrupa los paths con ID en una sola etiqueta
///
/// `/status/42` → `/status/{id}`
pub fn route_label(path: &str) -> &str {
    if path.starts_with("/status/") {
        "/status/{id}"
    } else {
        path
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsData::default())),
            start_time: Instant::now(),
        }
    }

    fn data(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra un request ya respondido
    pub fn record_request(&self, path: &str, status_code: u16, latency: Duration) {
        let mut data = self.data();

        data.total_requests += 1;
        *data.status_codes.entry(status_code).or_insert(0) += 1;

        if data.latencies.len() >= MAX_LATENCY_SAMPLES {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);

        *data
            .requests_per_route
            .entry(route_label(path).to_string())
            .or_insert(0) += 1;
    }

    pub fn increment_active_connections(&self) {
        self.data().active_connections += 1;
    }

    pub fn decrement_active_connections(&self) {
        let mut data = self.data();
        data.active_connections = data.active_connections.saturating_sub(1);
    }

    /// Métricas HTTP en formato JSON
    pub fn to_json(&self) -> Value {
        let data = self.data();
        let (p50, p95, p99, avg) = calculate_percentiles(&data.latencies);
        let stddev = calculate_stddev(&data.latencies, avg);

        let status_codes: HashMap<String, u64> = data
            .status_codes
            .iter()
            .map(|(code, count)| (code.to_string(), *count))
            .collect();

        let mut routes: Vec<_> = data.requests_per_route.iter().collect();
        routes.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let top_routes: Vec<Value> = routes
            .iter()
            .take(10)
            .map(|(route, count)| json!({ "route": route, "count": count }))
            .collect();

        json!({
            "uptime_seconds": self.start_time.elapsed().as_secs(),
            "requests": {
                "total": data.total_requests,
                "active_connections": data.active_connections,
                "status_codes": status_codes,
                "top_routes": top_routes,
            },
            "latency_us": {
                "p50": p50,
                "p95": p95,
                "p99": p99,
                "avg": avg,
                "stddev": (stddev * 100.0).round() / 100.0,
                "samples": data.latencies.len(),
            },
        })
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let data = self.data();
        let (p50, p95, p99, avg) = calculate_percentiles(&data.latencies);

        MetricsSnapshot {
            total_requests: data.total_requests,
            active_connections: data.active_connections,
            uptime_secs: self.start_time.elapsed().as_secs(),
            latency_p50_us: p50,
            latency_p95_us: p95,
            latency_p99_us: p99,
            latency_avg_us: avg,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// (p50, p95, p99, promedio)
fn calculate_percentiles(latencies: &VecDeque<u64>) -> (u64, u64, u64, u64) {
    if latencies.is_empty() {
        return (0, 0, 0, 0);
    }

    let mut sorted: Vec<u64> = latencies.iter().copied().collect();
    sorted.sort_unstable();

    let len = sorted.len();
    let p50 = sorted[len * 50 / 100];
    let p95 = sorted[len * 95 / 100];
    let p99 = sorted[len * 99 / 100];
    let avg = sorted.iter().sum::<u64>() / len as u64;

    (p50, p95, p99, avg)
}

fn calculate_stddev(latencies: &VecDeque<u64>, avg: u64) -> f64 {
    if latencies.is_empty() {
        return 0.0;
    }

    let variance: f64 = latencies
        .iter()
        .map(|&x| {
            let diff = x as f64 - avg as f64;
            diff * diff
        })
        .sum::<f64>()
        / latencies.len() as f64;

    variance.sqrt()
}
