//! # Sistema de Jobs
//!
//! Motor de ciclo de vida de jobs:
//!
//! ```text
//!  submit ──▶ JobGateway ──▶ JobQueue (acotada) ──▶ WorkerPool ──▶ JobProcessor
//!                │                                      │
//!                └──────────▶ JobRegistry ◀─────────────┘
//!  query  ──▶ JobGateway ──▶ JobRegistry
//! ```
//!
//! ## Endpoints
//!
//! - `POST /job` - Encolar job
//! - `GET /status/{id}` - Consultar estado

pub mod error;
pub mod gateway;
pub mod handlers;
pub mod ids;
pub mod pool;
pub mod processor;
pub mod queue;
pub mod registry;
pub mod types;

pub use error::{JobError, ProcessingError};
pub use gateway::JobGateway;
pub use ids::IdGenerator;
pub use pool::{JoinReport, WorkerPool};
pub use processor::{JobProcessor, SimulatedProcessor};
pub use queue::{AdmissionPolicy, Dequeued, JobQueue};
pub use registry::{JobRegistry, StatusCounts};
pub use types::{Job, JobId, JobStatus};
