//! # Señales de Apagado
//! src/shutdown.rs
//!
//! - `StopSignal`: token de cancelación compartido entre threads. Se pasa
//!   explícitamente a cada worker y al loop de aceptación del servidor.
//! - `install_shutdown_handler`: escucha SIGINT/SIGTERM y levanta un
//!   `StopSignal` cuando llega cualquiera de las dos.

use std::io;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Token de cancelación cooperativa.
///
/// Una vez levantado no se puede bajar. Los clones comparten el mismo estado.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

#[derive(Debug, Default)]
struct StopInner {
    raised: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Levanta la señal y despierta a todos los que esperan en `wait`
    pub fn cancel(&self) {
        let mut raised = self.inner.raised.lock().unwrap_or_else(PoisonError::into_inner);
        *raised = true;
        self.inner.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.raised.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bloquea el thread actual hasta que la señal se levante
    pub fn wait(&self) {
        let mut raised = self.inner.raised.lock().unwrap_or_else(PoisonError::into_inner);
        while !*raised {
            raised = self
                .inner
                .condvar
                .wait(raised)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Como `wait`, pero con límite de tiempo.
    ///
    /// Retorna `true` si la señal se levantó antes del timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let raised = self.inner.raised.lock().unwrap_or_else(PoisonError::into_inner);
        let (raised, _) = self
            .inner
            .condvar
            .wait_timeout_while(raised, timeout, |raised| !*raised)
            .unwrap_or_else(PoisonError::into_inner);
        *raised
    }
}

/// Instala el handler de SIGINT/SIGTERM (Ctrl+C fuera de Unix).
///
/// Las señales se registran antes de retornar, así una señal que llegue
/// inmediatamente no se pierde. La espera corre en un runtime de tokio de un
/// solo thread, dentro de un thread dedicado.
pub fn install_shutdown_handler() -> io::Result<StopSignal> {
    let token = StopSignal::new();
    let trigger = token.clone();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;

    let listener = runtime.block_on(async { SignalListener::register() })?;

    thread::Builder::new()
        .name("signal-listener".to_string())
        .spawn(move || {
            runtime.block_on(listener.recv());
            trigger.cancel();
        })?;

    Ok(token)
}

#[cfg(unix)]
struct SignalListener {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    async fn recv(mut self) {
        tokio::select! {
            _ = self.sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = self.sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    }
}

#[cfg(not(unix))]
struct SignalListener;

#[cfg(not(unix))]
impl SignalListener {
    fn register() -> io::Result<Self> {
        Ok(Self)
    }

    async fn recv(self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    }
}
