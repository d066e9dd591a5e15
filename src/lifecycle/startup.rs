//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the admission handler from its configuration
//! - Configure the web server and register the admission route
//! - Start the ingress controller, then the web server
//! - Hand over to the termination wait
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Services start in order, not concurrently
//! - The web server starts last (traffic only once the controller runs)

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};

use crate::config::{ControllerConfig, InjectorConfig, ServerConfig, ShutdownConfig};
use crate::injector::Injector;
use crate::lifecycle::services::{ListenerService, ReconcileController};
use crate::lifecycle::signals::Termination;
use crate::lifecycle::{LifecycleError, Stage};
use crate::observability::metrics;

/// Path the admission webhook is served on.
pub const INJECT_PATH: &str = "/inject";

/// Drives the web server and the ingress controller through their lifecycle.
pub struct Orchestrator<L, C> {
    pub(super) listener: L,
    pub(super) controller: C,
    server_config: ServerConfig,
    injector_config: InjectorConfig,
    pub(super) shutdown_config: ShutdownConfig,
    stage: Stage,
}

impl<L, C> Orchestrator<L, C>
where
    L: ListenerService,
    C: ReconcileController,
{
    /// Take ownership of both services and the config sections they need.
    pub fn new(listener: L, controller: C, config: &ControllerConfig) -> Self {
        Self {
            listener,
            controller,
            server_config: config.server.clone(),
            injector_config: config.injector.clone(),
            shutdown_config: config.shutdown.clone(),
            stage: Stage::Unstarted,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run the whole lifecycle: start, wait for `termination`, stop.
    ///
    /// Returns `Ok(())` only if every step succeeded. Any error is fatal and
    /// leaves whatever was started running; the caller is expected to exit.
    pub async fn run(mut self, termination: Termination) -> Result<(), LifecycleError> {
        self.start_services().await?;

        self.advance(Stage::Running);
        tracing::info!("Waiting for termination signal");
        let escalation = termination.requested().await;

        self.stop_services(escalation).await
    }

    async fn start_services(&mut self) -> Result<(), LifecycleError> {
        let injector = Injector::from_config(self.injector_config.clone())
            .map(Arc::new)
            .map_err(LifecycleError::Injector)?;

        self.listener
            .configure(self.server_config.clone())
            .map_err(|e| LifecycleError::Configure(Box::new(e)))?;
        self.advance(Stage::Configured);

        let handler = move |headers: HeaderMap, body: Bytes| {
            let injector = Arc::clone(&injector);
            async move { injector.review(&headers, &body) }
        };
        self.listener
            .add_route(Method::POST, INJECT_PATH, handler)
            .map_err(|e| LifecycleError::Route {
                path: INJECT_PATH,
                source: Box::new(e),
            })?;
        self.advance(Stage::Registered);

        self.controller
            .start()
            .await
            .map_err(|e| LifecycleError::ControllerStart(Box::new(e)))?;
        tracing::info!("Ingress controller started");
        self.advance(Stage::ControllerRunning);

        self.listener.start();
        tracing::info!("Web server started");
        self.advance(Stage::ServerRunning);

        Ok(())
    }

    pub(super) fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "lifecycle stage moved backwards");
        tracing::debug!(from = %self.stage, to = %next, "Lifecycle stage changed");
        self.stage = next;
        metrics::record_stage(next);
    }
}
