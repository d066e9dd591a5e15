//! Resilience helpers.
//!
//! # Design Decisions
//! - Only the ingress watch loop retries; lifecycle transitions never do
//! - Reconnect delays are jittered and capped

pub mod backoff;
