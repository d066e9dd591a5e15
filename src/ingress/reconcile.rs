//! Ingress → gateway API definition reconciliation.
//!
//! # Responsibilities
//! - Decide which ingresses belong to this controller (ingress class)
//! - Map ingress rules to API definitions
//! - Push changes to the gateway and remember what was pushed
//!
//! # Design Decisions
//! - Unchanged ingresses cause no gateway traffic
//! - Every definition that may have reached the gateway is remembered before
//!   the push, so a later delete removes it even if the push failed halfway
//! - A failed push marks the ingress unsynced; its next event pushes again
//! - No DashMap guard is held across an await

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use k8s_openapi::api::networking::v1::{Ingress, IngressBackend};
use sha2::{Digest, Sha256};

use crate::config::IngressConfig;
use crate::ingress::gateway::{ApiDefinition, GatewayApi, GatewayError};
use crate::observability::metrics;

pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// `namespace/name` of an ingress.
pub fn ingress_key(ingress: &Ingress) -> String {
    format!(
        "{}/{}",
        ingress.metadata.namespace.as_deref().unwrap_or("default"),
        ingress.metadata.name.as_deref().unwrap_or("unknown")
    )
}

/// Whether `ingress` is assigned to `class`.
pub fn matches_class(ingress: &Ingress, class: &str) -> bool {
    let by_spec = ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.ingress_class_name.as_deref())
        == Some(class);
    let by_annotation = ingress
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(INGRESS_CLASS_ANNOTATION))
        .map(String::as_str)
        == Some(class);
    by_spec || by_annotation
}

/// Lowercase, dash-separated, alphanumeric identifier.
pub fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// Gateway ID of the route for `path` on `host` of one ingress.
///
/// Readable slug of the parts followed by a digest of the raw parts, so
/// inputs that slug identically (`a-b/c`, `a/b-c`) still get distinct IDs.
pub fn api_id(namespace: &str, name: &str, host: Option<&str>, path: &str) -> String {
    let parts = [namespace, name, host.unwrap_or(""), path];

    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let digest = format!("{:x}", hasher.finalize());

    let readable = parts
        .iter()
        .map(|part| slug(part))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    format!("{readable}-{}", &digest[..12])
}

/// API definitions for every routable path of `ingress`.
pub fn definitions_for(ingress: &Ingress, cluster_domain: &str) -> Vec<ApiDefinition> {
    let namespace = ingress.metadata.namespace.as_deref().unwrap_or("default");
    let name = ingress.metadata.name.as_deref().unwrap_or("unknown");
    let Some(spec) = &ingress.spec else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut definitions = Vec::new();
    let mut push = |host: Option<&str>, path: &str, backend: &IngressBackend| {
        let Some(service) = &backend.service else {
            tracing::warn!(namespace, ingress = name, path, "Backend has no service, skipping");
            return;
        };
        let Some(port) = service.port.as_ref().and_then(|p| p.number) else {
            tracing::warn!(
                namespace,
                ingress = name,
                service = %service.name,
                "Backend has no numeric port, skipping"
            );
            return;
        };

        let api_id = api_id(namespace, name, host, path);
        if !seen.insert(api_id.clone()) {
            tracing::warn!(
                namespace,
                ingress = name,
                host = host.unwrap_or(""),
                path,
                "Path listed twice, keeping the first backend"
            );
            return;
        }

        definitions.push(ApiDefinition {
            api_id,
            name: format!("{namespace}/{name} {}{path}", host.unwrap_or("")),
            listen_path: path.to_string(),
            target_url: format!(
                "http://{}.{namespace}.svc.{cluster_domain}:{port}",
                service.name
            ),
            hostname: host.map(str::to_string),
            active: true,
        });
    };

    if let Some(backend) = &spec.default_backend {
        push(None, "/", backend);
    }
    for rule in spec.rules.iter().flatten() {
        let host = rule.host.as_deref().filter(|h| !h.is_empty());
        for path in rule.http.iter().flat_map(|http| http.paths.iter()) {
            push(host, path.path.as_deref().unwrap_or("/"), &path.backend);
        }
    }

    definitions
}

/// What the gateway may hold for one ingress.
#[derive(Debug, Clone)]
struct Tracked {
    definitions: Vec<ApiDefinition>,
    /// The last push for these definitions completed.
    synced: bool,
}

/// Keeps the gateway in step with the ingresses of one class.
pub struct IngressReconciler {
    gateway: Arc<dyn GatewayApi>,
    ingress_class: String,
    cluster_domain: String,
    tracked: DashMap<String, Tracked>,
}

impl IngressReconciler {
    pub fn new(gateway: Arc<dyn GatewayApi>, config: &IngressConfig) -> Self {
        Self {
            gateway,
            ingress_class: config.ingress_class.clone(),
            cluster_domain: config.cluster_domain.clone(),
            tracked: DashMap::new(),
        }
    }

    /// Definitions the gateway may hold for `key`.
    pub fn tracked(&self, key: &str) -> Option<Vec<ApiDefinition>> {
        self.tracked.get(key).map(|entry| entry.definitions.clone())
    }

    /// Whether the last push for `key` completed.
    pub fn is_synced(&self, key: &str) -> bool {
        self.tracked.get(key).is_some_and(|entry| entry.synced)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Reconcile a created or updated ingress.
    pub async fn apply(&self, ingress: &Ingress) -> Result<(), GatewayError> {
        let key = ingress_key(ingress);
        if !matches_class(ingress, &self.ingress_class) {
            return self.forget(&key).await;
        }

        let desired = definitions_for(ingress, &self.cluster_domain);
        let previous = self.tracked.get(&key).map(|entry| entry.value().clone());
        if previous
            .as_ref()
            .is_some_and(|prev| prev.synced && prev.definitions == desired)
        {
            metrics::record_reconcile("unchanged");
            return Ok(());
        }
        let previous = previous.map(|prev| prev.definitions).unwrap_or_default();

        let mut pending = previous.clone();
        for definition in &desired {
            if !pending.iter().any(|p| p.api_id == definition.api_id) {
                pending.push(definition.clone());
            }
        }
        self.tracked.insert(
            key.clone(),
            Tracked {
                definitions: pending,
                synced: false,
            },
        );

        let result = self.push(&desired, &previous).await;
        match &result {
            Ok(()) => {
                tracing::info!(ingress = %key, definitions = desired.len(), "Ingress reconciled");
                metrics::record_reconcile("applied");
                self.tracked.insert(
                    key,
                    Tracked {
                        definitions: desired,
                        synced: true,
                    },
                );
            }
            Err(e) => {
                tracing::warn!(ingress = %key, error = %e, "Ingress reconcile failed");
                metrics::record_reconcile("error");
            }
        }
        result
    }

    /// Reconcile a deleted ingress.
    pub async fn remove(&self, ingress: &Ingress) -> Result<(), GatewayError> {
        self.forget(&ingress_key(ingress)).await
    }

    /// Forget every tracked ingress whose key is not in `live`.
    pub async fn prune(&self, live: &HashSet<String>) -> Result<(), GatewayError> {
        let stale: Vec<String> = self
            .tracked
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| !live.contains(key))
            .collect();

        for key in stale {
            self.forget(&key).await?;
        }
        Ok(())
    }

    async fn push(
        &self,
        desired: &[ApiDefinition],
        previous: &[ApiDefinition],
    ) -> Result<(), GatewayError> {
        for definition in desired {
            self.gateway.upsert(definition).await?;
        }
        for old in previous {
            if !desired.iter().any(|d| d.api_id == old.api_id) {
                self.gateway.delete(&old.api_id).await?;
            }
        }
        self.gateway.reload().await
    }

    async fn forget(&self, key: &str) -> Result<(), GatewayError> {
        let Some(previous) = self.tracked(key) else {
            return Ok(());
        };

        for definition in &previous {
            self.gateway.delete(&definition.api_id).await?;
        }
        self.gateway.reload().await?;

        self.tracked.remove(key);
        tracing::info!(ingress = %key, definitions = previous.len(), "Ingress removed from gateway");
        metrics::record_reconcile("removed");
        Ok(())
    }
}
