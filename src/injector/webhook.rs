//! Admission webhook that injects the gateway sidecar.

use std::collections::{BTreeMap, HashSet};

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use k8s_openapi::api::core::v1::Pod;

use crate::config::InjectorConfig;
use crate::injector::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use crate::injector::patch::{self, PatchOperation};
use crate::injector::InjectorError;
use crate::observability::metrics;

/// Value of the status annotation once a pod has been mutated.
pub const STATUS_INJECTED: &str = "injected";

const OPT_IN_VALUES: [&str; 4] = ["y", "yes", "true", "on"];

/// Mutating admission handler. Immutable after construction, safe to share.
#[derive(Debug)]
pub struct Injector {
    config: InjectorConfig,
}

impl Injector {
    /// Validate `config` and build the handler.
    pub fn from_config(config: InjectorConfig) -> Result<Self, InjectorError> {
        if config.inject_annotation.trim().is_empty() {
            return Err(InjectorError::EmptyAnnotation("inject_annotation"));
        }
        if config.status_annotation.trim().is_empty() {
            return Err(InjectorError::EmptyAnnotation("status_annotation"));
        }
        if config.containers.is_empty() {
            return Err(InjectorError::NoContainers);
        }

        let mut names = HashSet::new();
        for (index, container) in config.containers.iter().enumerate() {
            if container.name.trim().is_empty() {
                return Err(InjectorError::UnnamedContainer(index));
            }
            if container.image.as_deref().map_or(true, |i| i.trim().is_empty()) {
                return Err(InjectorError::MissingImage(container.name.clone()));
            }
            if !names.insert(container.name.as_str()) {
                return Err(InjectorError::DuplicateContainer(container.name.clone()));
            }
        }

        tracing::info!(
            containers = config.containers.len(),
            volumes = config.volumes.len(),
            annotation = %config.inject_annotation,
            "Sidecar injector configured"
        );

        Ok(Self { config })
    }

    /// Whether a pod in `namespace` with `annotations` should be mutated.
    pub fn mutation_required(
        &self,
        namespace: &str,
        annotations: Option<&BTreeMap<String, String>>,
    ) -> bool {
        if self.config.ignored_namespaces.iter().any(|ns| ns == namespace) {
            return false;
        }

        let Some(annotations) = annotations else {
            return false;
        };

        if annotations
            .get(&self.config.status_annotation)
            .is_some_and(|status| status.eq_ignore_ascii_case(STATUS_INJECTED))
        {
            return false;
        }

        annotations
            .get(&self.config.inject_annotation)
            .map(|value| value.to_ascii_lowercase())
            .is_some_and(|value| OPT_IN_VALUES.contains(&value.as_str()))
    }

    /// Build the patch that injects the configured sidecar into `pod`.
    pub fn patch_for(&self, pod: &Pod) -> Vec<PatchOperation> {
        let mut ops = Vec::new();

        let spec = pod.spec.as_ref();
        let containers = spec.map(|s| s.containers.as_slice()).unwrap_or(&[]);
        patch::add_containers(&mut ops, containers, &self.config.containers);

        if !self.config.volumes.is_empty() {
            patch::add_volumes(&mut ops, spec.and_then(|s| s.volumes.as_ref()), &self.config.volumes);
        }

        let updates = BTreeMap::from([(
            self.config.status_annotation.clone(),
            STATUS_INJECTED.to_string(),
        )]);
        patch::update_annotations(&mut ops, pod.metadata.annotations.as_ref(), &updates);

        ops
    }

    /// Decide on one admission request.
    pub fn admit(&self, request: &AdmissionRequest) -> AdmissionResponse {
        let object = request.object.clone().unwrap_or_default();
        let pod: Pod = match serde_json::from_value(object) {
            Ok(pod) => pod,
            Err(e) => {
                tracing::warn!(uid = %request.uid, error = %e, "Could not decode pod");
                metrics::record_admission("denied");
                return AdmissionResponse::deny(&request.uid, e.to_string());
            }
        };

        let namespace = request
            .namespace
            .as_deref()
            .or(pod.metadata.namespace.as_deref())
            .unwrap_or("default");
        let name = request
            .name
            .as_deref()
            .or(pod.metadata.name.as_deref())
            .or(pod.metadata.generate_name.as_deref())
            .unwrap_or("unknown");

        if !self.mutation_required(namespace, pod.metadata.annotations.as_ref()) {
            tracing::debug!(namespace, pod = name, "Skipping sidecar injection");
            metrics::record_admission("skipped");
            return AdmissionResponse::allow(&request.uid);
        }

        let ops = self.patch_for(&pod);
        match serde_json::to_vec(&ops) {
            Ok(bytes) => {
                tracing::info!(namespace, pod = name, operations = ops.len(), "Injecting sidecar");
                metrics::record_admission("injected");
                AdmissionResponse::allow(&request.uid).with_patch(STANDARD.encode(bytes))
            }
            Err(e) => {
                metrics::record_admission("denied");
                AdmissionResponse::deny(&request.uid, e.to_string())
            }
        }
    }

    /// HTTP entry point: decode the review, admit it, encode the reply.
    pub fn review(&self, headers: &HeaderMap, body: &[u8]) -> Response {
        if body.is_empty() {
            return (StatusCode::BAD_REQUEST, "empty body").into_response();
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if content_type.split(';').next().map(str::trim) != Some("application/json") {
            tracing::warn!(content_type, "Rejecting admission review");
            return (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "expected Content-Type application/json",
            )
                .into_response();
        }

        let review: AdmissionReview = match serde_json::from_slice(body) {
            Ok(review) => review,
            Err(e) => {
                tracing::warn!(error = %e, "Could not decode admission review");
                return (StatusCode::BAD_REQUEST, format!("invalid admission review: {e}"))
                    .into_response();
            }
        };

        let Some(request) = review.request.as_ref() else {
            return (StatusCode::BAD_REQUEST, "admission review has no request").into_response();
        };

        let response = self.admit(request);
        Json(review.reply(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Container;
    use serde_json::json;

    fn config() -> InjectorConfig {
        InjectorConfig {
            containers: vec![Container {
                name: "gateway".into(),
                image: Some("gateway:5".into()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_construction_errors() {
        let empty = InjectorConfig::default();
        assert!(matches!(Injector::from_config(empty), Err(InjectorError::NoContainers)));

        let mut no_image = config();
        no_image.containers[0].image = None;
        assert!(matches!(Injector::from_config(no_image), Err(InjectorError::MissingImage(_))));

        let mut dup = config();
        dup.containers.push(dup.containers[0].clone());
        assert!(matches!(Injector::from_config(dup), Err(InjectorError::DuplicateContainer(_))));

        let mut blank = config();
        blank.status_annotation = " ".into();
        assert!(matches!(Injector::from_config(blank), Err(InjectorError::EmptyAnnotation(_))));
    }

    #[test]
    fn test_mutation_required() {
        let injector = Injector::from_config(config()).unwrap();
        let inject = "injector.gateway-controller.io/inject";
        let status = "injector.gateway-controller.io/status";

        assert!(injector.mutation_required("apps", Some(&annotations(&[(inject, "true")]))));
        assert!(injector.mutation_required("apps", Some(&annotations(&[(inject, "YES")]))));
        assert!(!injector.mutation_required("apps", Some(&annotations(&[(inject, "false")]))));
        assert!(!injector.mutation_required("apps", None));
        assert!(!injector.mutation_required("kube-system", Some(&annotations(&[(inject, "on")]))));
        assert!(!injector.mutation_required(
            "apps",
            Some(&annotations(&[(inject, "y"), (status, "injected")]))
        ));
    }

    #[test]
    fn test_admit_undecodable_pod_is_denied() {
        let injector = Injector::from_config(config()).unwrap();
        let request = AdmissionRequest {
            uid: "abc".into(),
            namespace: Some("apps".into()),
            name: None,
            operation: Some("CREATE".into()),
            object: Some(json!({"metadata": "not-an-object"})),
        };

        let response = injector.admit(&request);
        assert_eq!(response.uid, "abc");
        assert!(!response.allowed);
        assert!(response.status.is_some());
        assert!(response.patch.is_none());
    }

    #[test]
    fn test_admit_opted_in_pod_gets_patch() {
        let injector = Injector::from_config(config()).unwrap();
        let request = AdmissionRequest {
            uid: "xyz".into(),
            namespace: Some("apps".into()),
            name: Some("web".into()),
            operation: Some("CREATE".into()),
            object: Some(json!({
                "metadata": {
                    "name": "web",
                    "annotations": {"injector.gateway-controller.io/inject": "true"}
                },
                "spec": {"containers": [{"name": "app", "image": "app:1"}]}
            })),
        };

        let response = injector.admit(&request);
        assert!(response.allowed);
        assert_eq!(response.patch_type.as_deref(), Some("JSONPatch"));

        let decoded = STANDARD.decode(response.patch.unwrap()).unwrap();
        let ops: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(ops[0]["path"], "/spec/containers/-");
        assert_eq!(ops[0]["value"]["name"], "gateway");
        assert_eq!(ops[1]["path"], "/metadata/annotations/injector.gateway-controller.io~1status");
        assert_eq!(ops[1]["value"], "injected");
    }

    #[test]
    fn test_review_rejects_bad_requests() {
        let injector = Injector::from_config(config()).unwrap();

        let mut json_headers = HeaderMap::new();
        json_headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());

        assert_eq!(injector.review(&json_headers, b"").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            injector.review(&HeaderMap::new(), b"{}").status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(injector.review(&json_headers, b"{not json").status(), StatusCode::BAD_REQUEST);

        let no_request = br#"{"apiVersion":"admission.k8s.io/v1","kind":"AdmissionReview"}"#;
        assert_eq!(injector.review(&json_headers, no_request).status(), StatusCode::BAD_REQUEST);
    }
}
