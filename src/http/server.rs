//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Collect routes registered before start
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Serve plain HTTP or TLS in a background task
//! - Drain connections on stop, bounded by the configured drain timeout

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::DefaultBodyLimit;
use axum::handler::Handler;
use axum::http::Method;
use axum::routing::{get, on, MethodFilter};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::timeout::TimeoutLayer;

use crate::config::ServerConfig;
use crate::http::request::with_request_tracing;
use crate::lifecycle::ListenerService;

/// Error type for web server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("web server already started")]
    AlreadyStarted,

    #[error("web server is not running")]
    NotRunning,

    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: Method, path: String },

    #[error("route path '{0}' must start with '/'")]
    InvalidPath(String),

    #[error("unsupported route method {0}")]
    UnsupportedMethod(Method),

    #[error("invalid listen address '{address}': {source}")]
    Address {
        address: String,
        source: std::net::AddrParseError,
    },

    #[error("unable to load TLS certificate: {0}")]
    Tls(#[source] std::io::Error),

    #[error("serve failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

enum ServerState {
    Idle,
    Running {
        handle: Handle,
        task: JoinHandle<Result<(), ServerError>>,
        failed: watch::Receiver<bool>,
    },
    Failed(ServerError),
    Stopped,
}

/// HTTP server hosting the admission webhook.
pub struct WebServer {
    config: ServerConfig,
    router: Router,
    routes: HashSet<(Method, String)>,
    state: ServerState,
}

impl WebServer {
    /// Create an unconfigured, unstarted server.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            router: Router::new(),
            routes: HashSet::new(),
            state: ServerState::Idle,
        }
    }

    /// Wait until the server is bound and return its address.
    ///
    /// Resolves to `None` when the server is not running or failed to bind.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let ServerState::Running { handle, failed, .. } = &self.state else {
            return None;
        };
        let mut failed = failed.clone();
        tokio::select! {
            addr = handle.listening() => addr,
            _ = failed.wait_for(|failed| *failed) => None,
        }
    }

    fn is_claimed(&self, method: &Method, path: &str) -> bool {
        let claimed = |m: Method| self.routes.contains(&(m, path.to_string()));
        // GET routes answer HEAD as well.
        match *method {
            Method::GET | Method::HEAD => claimed(Method::GET) || claimed(Method::HEAD),
            _ => claimed(method.clone()),
        }
    }

    #[allow(deprecated)]
    fn build_app(&mut self) -> Router {
        let mut router = std::mem::take(&mut self.router);

        let health_path = self.config.health_path.clone();
        if !self.is_claimed(&Method::GET, &health_path) {
            router = router.route(&health_path, get(health));
        }

        let router = router
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(self.config.request_timeout_secs)));

        with_request_tracing(router)
    }
}

impl Default for WebServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListenerService for WebServer {
    type Error = ServerError;

    fn configure(&mut self, config: ServerConfig) -> Result<(), ServerError> {
        if !matches!(self.state, ServerState::Idle) {
            return Err(ServerError::AlreadyStarted);
        }
        self.config = config;
        Ok(())
    }

    fn add_route<H, T>(&mut self, method: Method, path: &str, handler: H) -> Result<(), ServerError>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        if !matches!(self.state, ServerState::Idle) {
            return Err(ServerError::AlreadyStarted);
        }
        if !path.starts_with('/') {
            return Err(ServerError::InvalidPath(path.to_string()));
        }
        if self.is_claimed(&method, path) {
            return Err(ServerError::DuplicateRoute {
                method,
                path: path.to_string(),
            });
        }
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| ServerError::UnsupportedMethod(method.clone()))?;

        self.router = std::mem::take(&mut self.router).route(path, on(filter, handler));
        self.routes.insert((method.clone(), path.to_string()));

        tracing::debug!(method = %method, path, "Route registered");
        Ok(())
    }

    fn start(&mut self) {
        if !matches!(self.state, ServerState::Idle) {
            tracing::warn!("Web server start requested twice, ignoring");
            return;
        }

        let addr: SocketAddr = match self.config.listen_address.parse() {
            Ok(addr) => addr,
            Err(source) => {
                let err = ServerError::Address {
                    address: self.config.listen_address.clone(),
                    source,
                };
                tracing::error!(error = %err, "Web server failed");
                self.state = ServerState::Failed(err);
                return;
            }
        };

        let app = self.build_app();
        let handle = Handle::new();
        let (failed_tx, failed) = watch::channel(false);
        let tls = self.config.tls.clone();
        let task_handle = handle.clone();

        let task = tokio::spawn(async move {
            let result = serve(app, addr, tls, task_handle).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "Web server failed");
                let _ = failed_tx.send(true);
            }
            result
        });

        self.state = ServerState::Running {
            handle,
            task,
            failed,
        };
    }

    async fn stop(&mut self) -> Result<(), ServerError> {
        match std::mem::replace(&mut self.state, ServerState::Stopped) {
            ServerState::Running { handle, task, .. } => {
                let drain = Duration::from_secs(self.config.drain_timeout_secs);
                tracing::info!(
                    connections = handle.connection_count(),
                    drain_timeout = ?drain,
                    "Web server draining"
                );
                handle.graceful_shutdown(Some(drain));
                task.await?
            }
            ServerState::Failed(err) => Err(err),
            ServerState::Idle => {
                self.state = ServerState::Idle;
                Err(ServerError::NotRunning)
            }
            ServerState::Stopped => Err(ServerError::NotRunning),
        }
    }
}

async fn serve(
    app: Router,
    addr: SocketAddr,
    tls: Option<crate::config::TlsConfig>,
    handle: Handle,
) -> Result<(), ServerError> {
    let service = app.into_make_service();

    match tls {
        Some(tls) => {
            let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .map_err(ServerError::Tls)?;
            tracing::info!(address = %addr, "Web server listening (TLS)");
            axum_server::bind_rustls(addr, rustls)
                .handle(handle)
                .serve(service)
                .await?;
        }
        None => {
            tracing::info!(address = %addr, "Web server listening");
            axum_server::bind(addr).handle(handle).serve(service).await?;
        }
    }

    tracing::info!("Web server stopped serving");
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}
