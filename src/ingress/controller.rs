//! Ingress watch loop.
//!
//! # Responsibilities
//! - Initial list + reconcile on start (a failing list fails the start)
//! - Background watch with reconnect backoff
//! - Cancellation and join on stop

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, ListParams};
use kube::runtime::watcher::{self, Event};
use kube::Client;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::config::IngressConfig;
use crate::ingress::gateway::{GatewayApi, GatewayError, HttpGateway};
use crate::ingress::reconcile::{ingress_key, IngressReconciler};
use crate::lifecycle::ReconcileController;
use crate::resilience::backoff::{ReconnectBackoff, WATCH_BASE_DELAY, WATCH_MAX_DELAY};

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("ingress controller is already running")]
    AlreadyRunning,

    #[error("ingress controller is not running")]
    NotRunning,

    #[error("failed to create Kubernetes client: {0}")]
    Client(#[source] kube::Error),

    #[error("failed to list ingresses: {0}")]
    List(#[source] kube::Error),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("watch task failed: {0}")]
    Task(#[from] JoinError),
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Keeps gateway API definitions in step with the cluster's ingresses.
pub struct IngressController {
    config: IngressConfig,
    running: Option<Running>,
}

impl IngressController {
    /// Construction does no I/O; the cluster and gateway are reached in `start`.
    pub fn new(config: IngressConfig) -> Self {
        Self {
            config,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn api(&self, client: Client) -> Api<Ingress> {
        match &self.config.namespace {
            Some(namespace) => Api::namespaced(client, namespace),
            None => Api::all(client),
        }
    }
}

#[async_trait]
impl ReconcileController for IngressController {
    type Error = ControllerError;

    async fn start(&mut self) -> Result<(), ControllerError> {
        if self.running.is_some() {
            return Err(ControllerError::AlreadyRunning);
        }

        let gateway: Arc<dyn GatewayApi> = Arc::new(HttpGateway::new(&self.config.gateway)?);
        let reconciler = Arc::new(IngressReconciler::new(gateway, &self.config));

        let client = Client::try_default().await.map_err(ControllerError::Client)?;
        let api = self.api(client);

        let ingresses = api
            .list(&ListParams::default())
            .await
            .map_err(ControllerError::List)?;
        for ingress in &ingresses.items {
            // Logged by the reconciler; the watch retries on the next event.
            let _ = reconciler.apply(ingress).await;
        }
        tracing::info!(
            listed = ingresses.items.len(),
            tracked = reconciler.tracked_count(),
            namespace = self.config.namespace.as_deref().unwrap_or("*"),
            class = %self.config.ingress_class,
            "Initial ingress sync complete"
        );

        let cancel = CancellationToken::new();
        let task = tokio::spawn(watch_loop(api, reconciler, cancel.clone()));
        self.running = Some(Running { cancel, task });
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ControllerError> {
        let running = self.running.take().ok_or(ControllerError::NotRunning)?;
        running.cancel.cancel();
        running.task.await?;
        tracing::info!("Ingress watch stopped");
        Ok(())
    }
}

async fn watch_loop(api: Api<Ingress>, reconciler: Arc<IngressReconciler>, cancel: CancellationToken) {
    let mut backoff = ReconnectBackoff::new(WATCH_BASE_DELAY, WATCH_MAX_DELAY);

    loop {
        let mut synced = false;
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return,
            outcome = watch_ingresses(&api, &reconciler, &mut synced) => outcome,
        };
        if synced {
            backoff.reset();
        }

        match outcome {
            Ok(()) => {
                tracing::warn!("Ingress watch stream ended, reconnecting");
                backoff.reset();
            }
            Err(e) => {
                let delay = backoff.failed();
                tracing::error!(
                    error = %e,
                    attempt = backoff.attempt(),
                    delay_ms = delay.as_millis() as u64,
                    "Ingress watch failed"
                );

                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

/// Run one watch until it ends. `synced` is set once the initial listing completed.
async fn watch_ingresses(
    api: &Api<Ingress>,
    reconciler: &IngressReconciler,
    synced: &mut bool,
) -> Result<(), watcher::Error> {
    let mut stream = watcher::watcher(api.clone(), watcher::Config::default()).boxed();
    let mut live = HashSet::new();

    while let Some(event) = stream.try_next().await? {
        match event {
            Event::Init => {
                live.clear();
                tracing::debug!("Ingress watch (re)initializing");
            }
            Event::InitApply(ingress) => {
                live.insert(ingress_key(&ingress));
                let _ = reconciler.apply(&ingress).await;
            }
            Event::InitDone => {
                if let Err(e) = reconciler.prune(&live).await {
                    tracing::warn!(error = %e, "Pruning vanished ingresses failed");
                }
                *synced = true;
                tracing::info!(tracked = reconciler.tracked_count(), "Ingress watch synced");
            }
            Event::Apply(ingress) => {
                let _ = reconciler.apply(&ingress).await;
            }
            Event::Delete(ingress) => {
                if let Err(e) = reconciler.remove(&ingress).await {
                    tracing::warn!(ingress = %ingress_key(&ingress), error = %e, "Ingress removal failed");
                }
            }
        }
    }

    Ok(())
}
