//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router built once, middleware)
//!     → request.rs (request ID)
//!     → handlers.rs (parse timeout → DeadlineContext → orchestrator)
//!     → text or JSON report to the client
//! ```

pub mod handlers;
pub mod params;
pub mod request;
pub mod server;

pub use request::{request_id, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerError};
