//! JSON patch construction for sidecar injection.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, Volume};
use serde::Serialize;

/// One RFC 6902 operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOperation {
    pub op: &'static str,
    pub path: String,
    pub value: serde_json::Value,
}

impl PatchOperation {
    fn add(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            op: "add",
            path: path.into(),
            value,
        }
    }

    fn replace(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            op: "replace",
            path: path.into(),
            value,
        }
    }
}

/// Escape a map key for use as a JSON pointer segment.
pub fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Append `added` to the array at `base`, creating it when `existing` is empty.
fn append<T: Serialize>(ops: &mut Vec<PatchOperation>, base: &str, existing: usize, added: &[T]) {
    let mut first = existing == 0;
    for item in added {
        let value = serde_json::to_value(item).unwrap_or(serde_json::Value::Null);
        if first {
            ops.push(PatchOperation::add(base, serde_json::Value::Array(vec![value])));
            first = false;
        } else {
            ops.push(PatchOperation::add(format!("{base}/-"), value));
        }
    }
}

pub fn add_containers(ops: &mut Vec<PatchOperation>, existing: &[Container], added: &[Container]) {
    append(ops, "/spec/containers", existing.len(), added);
}

pub fn add_volumes(ops: &mut Vec<PatchOperation>, existing: Option<&Vec<Volume>>, added: &[Volume]) {
    append(ops, "/spec/volumes", existing.map_or(0, Vec::len), added);
}

/// Set `updates` on the pod annotations, creating the map when absent.
pub fn update_annotations(
    ops: &mut Vec<PatchOperation>,
    existing: Option<&BTreeMap<String, String>>,
    updates: &BTreeMap<String, String>,
) {
    let Some(existing) = existing else {
        let value = serde_json::to_value(updates).unwrap_or_default();
        ops.push(PatchOperation::add("/metadata/annotations", value));
        return;
    };

    for (key, value) in updates {
        let path = format!("/metadata/annotations/{}", escape_pointer(key));
        let value = serde_json::Value::String(value.clone());
        if existing.contains_key(key) {
            ops.push(PatchOperation::replace(path, value));
        } else {
            ops.push(PatchOperation::add(path, value));
        }
    }
}
