//! Ingress controller: Kubernetes ingresses → gateway API definitions.
//!
//! # Data Flow
//! ```text
//! kube watcher (Ingress events)
//!     → controller.rs (watch loop, reconnect backoff)
//!     → reconcile.rs (class filter, definition mapping, registry)
//!     → gateway.rs (admin API: upsert, delete, reload)
//! ```

pub mod controller;
pub mod gateway;
pub mod reconcile;

pub use controller::{ControllerError, IngressController};
pub use gateway::{ApiDefinition, GatewayApi, GatewayError, HttpGateway};
pub use reconcile::IngressReconciler;
