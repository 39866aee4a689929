//! # Job Server
//! src/lib.rs
//!
//! Servidor HTTP/1.0 de jobs asíncronos: los clientes envían trabajos, un
//! pool fijo de workers los procesa desde una cola acotada y los clientes
//! consultan el estado de cada job por su ID.
//!
//! ## Arquitectura
//!
//! - `http`: Parsing y construcción de mensajes HTTP/1.0
//! - `server`: Accept loop TCP, un thread por conexión
//! - `router`: Enrutamiento por método y path
//! - `jobs`: Registro, cola, workers, gateway y handlers HTTP
//! - `lifecycle`: Apagado cooperativo `running → stopping → stopped`
//! - `shutdown`: Token de cancelación y señales del sistema
//! - `metrics`: Métricas HTTP y del motor de jobs
//! - `config`: CLI y variables de entorno
//! - `app`: Ensamblado de todos los componentes
//! - `client`: Cliente HTTP bloqueante
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use job_server::app::App;
//! use job_server::config::Config;
//!
//! let config = Config::default();
//! let app = App::start(&config).expect("Error al iniciar servidor");
//! println!("Escuchando en {}", app.local_addr());
//! let report = app.shutdown();
//! assert!(report.is_clean());
//! ```

pub mod app;
pub mod client;
pub mod config;
pub mod http;
pub mod jobs;
pub mod lifecycle;
pub mod metrics;
pub mod router;
pub mod server;
pub mod shutdown;
