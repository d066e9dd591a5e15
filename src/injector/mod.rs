//! Sidecar injector (mutating admission webhook).
//!
//! # Data Flow
//! ```text
//! POST /inject (AdmissionReview JSON)
//!     → webhook.rs (decode, decide, reply)
//!     → patch.rs (JSON patch: containers, volumes, status annotation)
//!     → admission.rs (AdmissionReview response, base64 patch)
//! ```
//!
//! # Design Decisions
//! - Pods opt in through an annotation; already-injected pods are skipped
//! - Request errors are answered in HTTP, never surfaced to the caller
//!   that registered the route

pub mod admission;
pub mod patch;
pub mod webhook;

pub use webhook::{Injector, STATUS_INJECTED};

/// Why an injector could not be built from its configuration.
#[derive(Debug, thiserror::Error)]
pub enum InjectorError {
    #[error("no sidecar containers configured")]
    NoContainers,

    #[error("sidecar container #{0} has no name")]
    UnnamedContainer(usize),

    #[error("sidecar container '{0}' has no image")]
    MissingImage(String),

    #[error("sidecar container '{0}' is configured twice")]
    DuplicateContainer(String),

    #[error("injector.{0} must not be empty")]
    EmptyAnnotation(&'static str),
}
