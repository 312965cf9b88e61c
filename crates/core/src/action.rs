//! The `action.kectl.io/v1alpha1` timeline document.

use crate::{GroupVersionResource, ObjectRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const GROUP_VERSION: &str = "action.kectl.io/v1alpha1";
pub const RESOURCE_PATCH_KIND: &str = "ResourcePatch";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchMethod {
    Create,
    Patch,
    Delete,
}

/// One timeline event: a create, patch, or delete at an offset from the
/// first recorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePatch {
    pub api_version: String,
    pub kind: String,
    pub resource: GroupVersionResource,
    pub target: ObjectRef,
    pub method: PatchMethod,
    /// Raw JSON text: the full object for creates, the strategic merge
    /// patch for patches, empty for deletes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub template: String,
    #[serde(default)]
    pub duration_nanosecond: i64,
}

impl ResourcePatch {
    pub fn new(resource: GroupVersionResource, target: ObjectRef, method: PatchMethod) -> Self {
        Self {
            api_version: GROUP_VERSION.to_string(),
            kind: RESOURCE_PATCH_KIND.to_string(),
            resource,
            target,
            method,
            template: String::new(),
            duration_nanosecond: 0,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.duration_nanosecond.max(0) as u64)
    }

    pub fn set_duration(&mut self, dur: Duration) {
        self.duration_nanosecond = dur.as_nanos().min(i64::MAX as u128) as i64;
    }
}

/// Whether a decoded document is a `ResourcePatch` sentinel rather than a
/// snapshot object.
pub fn is_resource_patch(doc: &Value) -> bool {
    doc.get("kind").and_then(|v| v.as_str()) == Some(RESOURCE_PATCH_KIND)
        && doc.get("apiVersion").and_then(|v| v.as_str()) == Some(GROUP_VERSION)
}
