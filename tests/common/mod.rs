//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::handler::Handler;
use axum::http::Method;
use k8s_openapi::api::core::v1::Container;

use gateway_controller::config::{
    ControllerConfig, IngressConfig, InjectorConfig, ObservabilityConfig, ServerConfig,
    ShutdownConfig,
};
use gateway_controller::lifecycle::{ListenerService, ReconcileController};

/// One observed call on a fake service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Configure,
    AddRoute(Method, String),
    ListenerStart,
    ListenerStop,
    ControllerStart,
    ControllerStop,
}

/// Call log shared by the fake listener and controller.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, call: &Call) -> bool {
        self.0.lock().unwrap().contains(call)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FakeError(pub &'static str);

/// How a fake step behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Behavior {
    #[default]
    Succeed,
    Fail,
    Hang,
}

async fn act(behavior: Behavior, what: &'static str) -> Result<(), FakeError> {
    match behavior {
        Behavior::Succeed => Ok(()),
        Behavior::Fail => Err(FakeError(what)),
        Behavior::Hang => future::pending().await,
    }
}

#[derive(Debug, Default)]
pub struct FakeListener {
    pub log: CallLog,
    pub configure: Behavior,
    pub route: Behavior,
    pub stop: Behavior,
}

impl FakeListener {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ListenerService for FakeListener {
    type Error = FakeError;

    fn configure(&mut self, _config: ServerConfig) -> Result<(), FakeError> {
        if self.configure == Behavior::Fail {
            return Err(FakeError("configure failed"));
        }
        self.log.push(Call::Configure);
        Ok(())
    }

    fn add_route<H, T>(&mut self, method: Method, path: &str, _handler: H) -> Result<(), FakeError>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        if self.route == Behavior::Fail {
            return Err(FakeError("route rejected"));
        }
        self.log.push(Call::AddRoute(method, path.to_string()));
        Ok(())
    }

    fn start(&mut self) {
        self.log.push(Call::ListenerStart);
    }

    async fn stop(&mut self) -> Result<(), FakeError> {
        self.log.push(Call::ListenerStop);
        act(self.stop, "listener stop failed").await
    }
}

#[derive(Debug, Default)]
pub struct FakeController {
    pub log: CallLog,
    pub start: Behavior,
    pub stop: Behavior,
}

impl FakeController {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ReconcileController for FakeController {
    type Error = FakeError;

    async fn start(&mut self) -> Result<(), FakeError> {
        self.log.push(Call::ControllerStart);
        act(self.start, "controller start failed").await
    }

    async fn stop(&mut self) -> Result<(), FakeError> {
        self.log.push(Call::ControllerStop);
        act(self.stop, "controller stop failed").await
    }
}

pub fn sidecar() -> Container {
    Container {
        name: "gateway".into(),
        image: Some("gateway:5".into()),
        ..Default::default()
    }
}

/// A complete config with one sidecar container and a loopback listener.
pub fn test_config() -> ControllerConfig {
    ControllerConfig {
        server: ServerConfig {
            listen_address: "127.0.0.1:0".into(),
            ..Default::default()
        },
        injector: InjectorConfig {
            containers: vec![sidecar()],
            ..Default::default()
        },
        ingress: IngressConfig::default(),
        shutdown: ShutdownConfig { timeout_secs: 5 },
        observability: ObservabilityConfig::default(),
    }
}
