//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the controller.
//! All types derive Serde traits for deserialization from config files.

use k8s_openapi::api::core::v1::{Container, Volume};
use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration for the controller process.
///
/// `server` and `injector` have no defaults: a config file without them is
/// rejected at load time.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Web server (listener) settings.
    pub server: ServerConfig,

    /// Sidecar injector (admission webhook) settings.
    pub injector: InjectorConfig,

    /// Ingress controller settings.
    #[serde(default)]
    pub ingress: IngressConfig,

    /// Shutdown bounds.
    #[serde(default)]
    pub shutdown: ShutdownConfig,

    /// Logging and metrics settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Web server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8443").
    pub listen_address: String,

    /// Optional TLS configuration. Admission webhooks need this in-cluster.
    pub tls: Option<TlsConfig>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// How long open connections may drain after stop is requested.
    pub drain_timeout_secs: u64,

    /// Largest accepted request body.
    pub max_body_bytes: usize,

    /// Liveness probe path.
    pub health_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8443".to_string(),
            tls: None,
            request_timeout_secs: 10,
            drain_timeout_secs: 15,
            max_body_bytes: 1024 * 1024,
            health_path: "/healthz".to_string(),
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Sidecar injector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InjectorConfig {
    /// Pod annotation that opts a pod into injection.
    pub inject_annotation: String,

    /// Pod annotation written once a pod has been injected.
    pub status_annotation: String,

    /// Namespaces whose pods are never mutated.
    pub ignored_namespaces: Vec<String>,

    /// Containers appended to every injected pod.
    pub containers: Vec<Container>,

    /// Volumes appended to every injected pod.
    pub volumes: Vec<Volume>,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            inject_annotation: "injector.gateway-controller.io/inject".to_string(),
            status_annotation: "injector.gateway-controller.io/status".to_string(),
            ignored_namespaces: vec!["kube-system".to_string(), "kube-public".to_string()],
            containers: Vec::new(),
            volumes: Vec::new(),
        }
    }
}

/// Ingress controller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngressConfig {
    /// Ingress class this controller is responsible for.
    pub ingress_class: String,

    /// Restrict the watch to one namespace. `None` watches all namespaces.
    pub namespace: Option<String>,

    /// Cluster DNS domain used to build service URLs.
    pub cluster_domain: String,

    /// Gateway admin API the reconciled definitions are pushed to.
    pub gateway: GatewayConfig,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            ingress_class: "gateway".to_string(),
            namespace: None,
            cluster_domain: "cluster.local".to_string(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Gateway admin API client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the admin API.
    pub url: Url,

    /// Shared secret sent with every admin request.
    pub secret: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:8080").expect("static URL is valid"),
            secret: String::new(),
            request_timeout_secs: 5,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Upper bound for each service's stop call, in seconds.
    pub timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
