//! Lifecycle contracts of the services the orchestrator drives.
//!
//! The orchestrator is the only caller of these methods. Implementations may
//! therefore assume a single writer and do not need to guard against
//! concurrent start/stop.

use async_trait::async_trait;
use axum::handler::Handler;
use axum::http::Method;

use crate::config::ServerConfig;

/// The HTTP listener hosting the admission route.
#[async_trait]
pub trait ListenerService: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Apply listener settings. Only valid before `start`.
    fn configure(&mut self, config: ServerConfig) -> Result<(), Self::Error>;

    /// Register `handler` for `method` requests on `path`. Only valid before `start`.
    fn add_route<H, T>(&mut self, method: Method, path: &str, handler: H) -> Result<(), Self::Error>
    where
        H: Handler<T, ()>,
        T: 'static;

    /// Begin serving in the background and return immediately.
    ///
    /// Errors while serving are logged by the service and reported by `stop`.
    fn start(&mut self);

    /// Stop serving, draining in-flight requests first.
    async fn stop(&mut self) -> Result<(), Self::Error>;
}

/// The cluster watch/reconcile loop.
#[async_trait]
pub trait ReconcileController: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Establish the watch loop. Returns only once it runs, or with an error.
    async fn start(&mut self) -> Result<(), Self::Error>;

    /// Tear the watch loop down and wait for it to finish.
    async fn stop(&mut self) -> Result<(), Self::Error>;
}
