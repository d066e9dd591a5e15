//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate signals into a one-shot termination request
//! - Escalate a repeated signal into a forced shutdown
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are installed before any service starts, so a signal that
//!   arrives during startup is kept until the orchestrator waits for it
//! - Each request is a `oneshot` channel: it can fire at most once

use std::future;

use tokio::sync::oneshot;

/// What a delivered termination request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// First request: graceful shutdown.
    Graceful,
    /// Second request: abort the graceful shutdown.
    Forced,
    /// Both requests were already delivered.
    Ignored,
}

/// Sending half of a termination request pair.
#[derive(Debug)]
pub struct TerminationTrigger {
    requested: Option<oneshot::Sender<()>>,
    forced: Option<oneshot::Sender<()>>,
}

impl TerminationTrigger {
    /// Deliver one termination request.
    pub fn fire(&mut self) -> Delivery {
        if let Some(tx) = self.requested.take() {
            let _ = tx.send(());
            return Delivery::Graceful;
        }
        if let Some(tx) = self.forced.take() {
            let _ = tx.send(());
            return Delivery::Forced;
        }
        Delivery::Ignored
    }
}

/// Receiving half: the orchestrator's view of the termination source.
#[derive(Debug)]
pub struct Termination {
    requested: oneshot::Receiver<()>,
    forced: oneshot::Receiver<()>,
}

impl Termination {
    /// Wait for the first termination request.
    ///
    /// Never resolves if the trigger is dropped without firing; losing the
    /// signal source is not a reason to stop.
    pub async fn requested(self) -> Escalation {
        if self.requested.await.is_err() {
            future::pending::<()>().await;
        }
        Escalation {
            forced: self.forced,
        }
    }
}

/// Watches for a second termination request once shutdown has begun.
#[derive(Debug)]
pub struct Escalation {
    forced: oneshot::Receiver<()>,
}

impl Escalation {
    /// Resolves when a second request arrives.
    pub async fn forced(self) {
        if self.forced.await.is_err() {
            future::pending::<()>().await;
        }
    }
}

/// Create a connected trigger/termination pair.
pub fn termination() -> (TerminationTrigger, Termination) {
    let (requested_tx, requested_rx) = oneshot::channel();
    let (forced_tx, forced_rx) = oneshot::channel();
    (
        TerminationTrigger {
            requested: Some(requested_tx),
            forced: Some(forced_tx),
        },
        Termination {
            requested: requested_rx,
            forced: forced_rx,
        },
    )
}

/// Subscribe to process termination signals.
///
/// Must be called inside a Tokio runtime. Handler registration happens before
/// this returns; the signals are then watched by a background task.
pub fn listen_for_signals() -> std::io::Result<Termination> {
    let (trigger, termination) = termination();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let interrupt = signal(SignalKind::interrupt())?;
        let terminate = signal(SignalKind::terminate())?;
        tokio::spawn(watch_unix_signals(trigger, interrupt, terminate));
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(watch_ctrl_c(trigger));
    }

    Ok(termination)
}

#[cfg(unix)]
async fn watch_unix_signals(
    mut trigger: TerminationTrigger,
    mut interrupt: tokio::signal::unix::Signal,
    mut terminate: tokio::signal::unix::Signal,
) {
    loop {
        let name = tokio::select! {
            received = interrupt.recv() => match received {
                Some(()) => "SIGINT",
                None => break,
            },
            received = terminate.recv() => match received {
                Some(()) => "SIGTERM",
                None => break,
            },
        };

        if !deliver(&mut trigger, name) {
            break;
        }
    }
}

#[cfg(not(unix))]
async fn watch_ctrl_c(mut trigger: TerminationTrigger) {
    while tokio::signal::ctrl_c().await.is_ok() {
        if !deliver(&mut trigger, "ctrl-c") {
            break;
        }
    }
}

/// Returns whether further signals are still meaningful.
fn deliver(trigger: &mut TerminationTrigger, signal: &'static str) -> bool {
    match trigger.fire() {
        Delivery::Graceful => {
            tracing::info!(signal, "Shutdown signal received");
            true
        }
        Delivery::Forced => {
            tracing::warn!(signal, "Second shutdown signal received, forcing exit");
            false
        }
        Delivery::Ignored => false,
    }
}
