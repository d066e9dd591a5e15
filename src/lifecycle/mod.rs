//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build admission handler → Configure web server → Register /inject
//!     → Start ingress controller (blocking) → Start web server (background)
//!
//! Wait (signals.rs):
//!     SIGTERM/SIGINT → one-shot termination request
//!
//! Shutdown (shutdown.rs):
//!     Stop web server → Stop ingress controller → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any error at any stage is fatal, nothing is retried
//! - Services are constructed by the caller and moved in
//! - Shutdown is the reverse of service startup, each stop is time-bounded
//! - A second termination request during shutdown forces a failing exit

use std::fmt;
use std::time::Duration;

use crate::injector::InjectorError;

pub mod services;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use services::{ListenerService, ReconcileController};
pub use signals::{listen_for_signals, termination, Delivery, Escalation, Termination, TerminationTrigger};
pub use startup::{Orchestrator, INJECT_PATH};

/// Boxed collaborator error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Position of the orchestrator in the process lifecycle.
///
/// Transitions are strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Unstarted,
    Configured,
    Registered,
    ControllerRunning,
    ServerRunning,
    Running,
    Stopping,
    Stopped,
}

impl Stage {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Unstarted => "unstarted",
            Stage::Configured => "configured",
            Stage::Registered => "registered",
            Stage::ControllerRunning => "controller_running",
            Stage::ServerRunning => "server_running",
            Stage::Running => "running",
            Stage::Stopping => "stopping",
            Stage::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal lifecycle failure. Every variant ends the process.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("couldn't build admission handler: {0}")]
    Injector(#[source] InjectorError),

    #[error("unable to configure web server: {0}")]
    Configure(#[source] BoxError),

    #[error("unable to register route {path}: {source}")]
    Route {
        path: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("unable to start ingress controller: {0}")]
    ControllerStart(#[source] BoxError),

    #[error("unable to stop web server: {0}")]
    ServerStop(#[source] BoxError),

    #[error("unable to stop ingress controller: {0}")]
    ControllerStop(#[source] BoxError),

    #[error("{component} did not stop within {timeout:?}")]
    StopTimeout {
        component: &'static str,
        timeout: Duration,
    },

    #[error("shutdown forced by a repeated termination request")]
    ForcedShutdown,
}

impl LifecycleError {
    /// The stage the orchestrator was in when the failure happened.
    pub fn stage(&self) -> Stage {
        match self {
            LifecycleError::Injector(_) | LifecycleError::Configure(_) => Stage::Unstarted,
            LifecycleError::Route { .. } => Stage::Configured,
            LifecycleError::ControllerStart(_) => Stage::Registered,
            LifecycleError::ServerStop(_)
            | LifecycleError::ControllerStop(_)
            | LifecycleError::StopTimeout { .. }
            | LifecycleError::ForcedShutdown => Stage::Stopping,
        }
    }
}
