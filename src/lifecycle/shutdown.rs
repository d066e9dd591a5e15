//! Shutdown coordination.
//!
//! Stops the web server before the ingress controller so inbound admission
//! traffic is cut off before the loop it may depend on goes away. A stop
//! failure is fatal immediately; the remaining service is not stopped.

use std::time::Duration;

use crate::lifecycle::services::{ListenerService, ReconcileController};
use crate::lifecycle::signals::Escalation;
use crate::lifecycle::startup::Orchestrator;
use crate::lifecycle::{LifecycleError, Stage};

const WEB_SERVER: &str = "web server";
const INGRESS_CONTROLLER: &str = "ingress controller";

impl<L, C> Orchestrator<L, C>
where
    L: ListenerService,
    C: ReconcileController,
{
    pub(super) async fn stop_services(&mut self, escalation: Escalation) -> Result<(), LifecycleError> {
        self.advance(Stage::Stopping);

        let timeout = Duration::from_secs(self.shutdown_config.timeout_secs);
        let listener = &mut self.listener;
        let controller = &mut self.controller;

        let teardown = async move {
            match tokio::time::timeout(timeout, listener.stop()).await {
                Err(_) => {
                    return Err(LifecycleError::StopTimeout {
                        component: WEB_SERVER,
                        timeout,
                    })
                }
                Ok(Err(e)) => return Err(LifecycleError::ServerStop(Box::new(e))),
                Ok(Ok(())) => tracing::info!("Web server stopped"),
            }

            match tokio::time::timeout(timeout, controller.stop()).await {
                Err(_) => Err(LifecycleError::StopTimeout {
                    component: INGRESS_CONTROLLER,
                    timeout,
                }),
                Ok(Err(e)) => Err(LifecycleError::ControllerStop(Box::new(e))),
                Ok(Ok(())) => {
                    tracing::info!("Ingress controller stopped");
                    Ok(())
                }
            }
        };

        tokio::select! {
            result = teardown => result?,
            () = escalation.forced() => return Err(LifecycleError::ForcedShutdown),
        }

        self.advance(Stage::Stopped);
        tracing::info!("Shutdown complete");
        Ok(())
    }
}
