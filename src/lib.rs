//! Kubernetes gateway controller library.
//!
//! Hosts a sidecar-injecting admission webhook and an ingress watch loop
//! that keeps gateway API definitions in step with the cluster.

pub mod config;
pub mod http;
pub mod ingress;
pub mod injector;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ControllerConfig;
pub use http::WebServer;
pub use ingress::IngressController;
pub use injector::Injector;
pub use lifecycle::{LifecycleError, Orchestrator, Stage};
