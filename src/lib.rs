//! Deadline-bounded sub-request fan-out service library

pub mod config;
pub mod context;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod orchestrator;

pub use config::schema::ServiceConfig;
pub use context::{CancelGuard, ContextError, DeadlineContext};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
