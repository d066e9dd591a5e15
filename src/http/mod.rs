//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum-server, graceful drain handle)
//!     → request.rs (request ID, request span)
//!     → body limit / timeout
//!     → registered route (POST /inject) or GET /healthz
//! ```

pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{ServerError, WebServer};
