//! Accessors over untyped object JSON.

use crate::{GroupVersionKind, ObjectRef};
use serde_json::Value;

pub fn name_of(obj: &Value) -> &str {
    obj.get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

pub fn namespace_of(obj: &Value) -> &str {
    obj.get("metadata")
        .and_then(|m| m.get("namespace"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

pub fn object_ref(obj: &Value) -> ObjectRef {
    ObjectRef::new(name_of(obj), namespace_of(obj))
}

/// Read `apiVersion` + `kind`. Returns `None` when either is missing, which
/// marks the document as something other than a Kubernetes object.
pub fn gvk_of(obj: &Value) -> Option<GroupVersionKind> {
    let api_version = obj.get("apiVersion")?.as_str()?;
    let kind = obj.get("kind")?.as_str()?;
    if kind.is_empty() {
        return None;
    }
    Some(GroupVersionKind::from_api_version(api_version, kind))
}

/// Clear `metadata.resourceVersion`, producing the canonical form used for
/// snapshots, templates, and the tracked cache.
pub fn clear_resource_version(obj: &mut Value) {
    if let Some(meta) = obj.get_mut("metadata").and_then(|m| m.as_object_mut()) {
        meta.remove("resourceVersion");
    }
}
