//! Registry of known object kinds: canonical plural form, strategic-merge
//! metadata, and the pluggable per-kind body codecs for the protobuf
//! envelope.

use crate::strategic::PatchMeta;
use anyhow::Result;
use kectl_core::GroupVersionKind;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Serializer for one kind's envelope body. Implementations are supplied by
/// the embedder; a stock build registers none and stores JSON instead.
pub trait ObjectCodec: Send + Sync {
    fn decode(&self, raw: &[u8]) -> Result<Value>;
    fn encode(&self, obj: &Value) -> Result<Vec<u8>>;
}

/// Static description of one kind.
pub struct KindSpec {
    pub group: &'static str,
    pub kind: &'static str,
    /// Path-addressed merge keys for lists that merge element-wise,
    /// e.g. `("spec.containers", "name")`. Array indices do not appear in
    /// paths.
    pub merge_keys: &'static [(&'static str, &'static str)],
}

// Lists that merge by key on every kind.
const UNIVERSAL_MERGE_KEYS: &[(&str, &str)] = &[("metadata.ownerReferences", "uid")];

const POD_MERGE_KEYS: &[(&str, &str)] = &[
    ("spec.containers", "name"),
    ("spec.containers.env", "name"),
    ("spec.containers.ports", "containerPort"),
    ("spec.containers.volumeMounts", "mountPath"),
    ("spec.initContainers", "name"),
    ("spec.initContainers.env", "name"),
    ("spec.initContainers.volumeMounts", "mountPath"),
    ("spec.volumes", "name"),
    ("spec.imagePullSecrets", "name"),
    ("status.conditions", "type"),
];

const POD_TEMPLATE_MERGE_KEYS: &[(&str, &str)] = &[
    ("spec.template.spec.containers", "name"),
    ("spec.template.spec.containers.env", "name"),
    ("spec.template.spec.containers.ports", "containerPort"),
    ("spec.template.spec.containers.volumeMounts", "mountPath"),
    ("spec.template.spec.initContainers", "name"),
    ("spec.template.spec.initContainers.env", "name"),
    ("spec.template.spec.initContainers.volumeMounts", "mountPath"),
    ("spec.template.spec.volumes", "name"),
    ("spec.template.spec.imagePullSecrets", "name"),
    ("status.conditions", "type"),
];

const SERVICE_MERGE_KEYS: &[(&str, &str)] = &[("spec.ports", "port")];

const CONDITIONS_ONLY: &[(&str, &str)] = &[("status.conditions", "type")];

static KINDS: &[KindSpec] = &[
    KindSpec { group: "", kind: "ConfigMap", merge_keys: &[] },
    KindSpec { group: "", kind: "Endpoints", merge_keys: &[] },
    KindSpec { group: "", kind: "Event", merge_keys: &[] },
    KindSpec { group: "", kind: "Namespace", merge_keys: CONDITIONS_ONLY },
    KindSpec { group: "", kind: "Node", merge_keys: CONDITIONS_ONLY },
    KindSpec { group: "", kind: "PersistentVolume", merge_keys: &[] },
    KindSpec { group: "", kind: "PersistentVolumeClaim", merge_keys: CONDITIONS_ONLY },
    KindSpec { group: "", kind: "Pod", merge_keys: POD_MERGE_KEYS },
    KindSpec { group: "", kind: "ReplicationController", merge_keys: POD_TEMPLATE_MERGE_KEYS },
    KindSpec { group: "", kind: "Secret", merge_keys: &[] },
    KindSpec { group: "", kind: "Service", merge_keys: SERVICE_MERGE_KEYS },
    KindSpec { group: "", kind: "ServiceAccount", merge_keys: &[("secrets", "name")] },
    KindSpec { group: "apps", kind: "DaemonSet", merge_keys: POD_TEMPLATE_MERGE_KEYS },
    KindSpec { group: "apps", kind: "Deployment", merge_keys: POD_TEMPLATE_MERGE_KEYS },
    KindSpec { group: "apps", kind: "ReplicaSet", merge_keys: POD_TEMPLATE_MERGE_KEYS },
    KindSpec { group: "apps", kind: "StatefulSet", merge_keys: POD_TEMPLATE_MERGE_KEYS },
    KindSpec { group: "batch", kind: "CronJob", merge_keys: &[] },
    KindSpec { group: "batch", kind: "Job", merge_keys: POD_TEMPLATE_MERGE_KEYS },
    KindSpec { group: "coordination.k8s.io", kind: "Lease", merge_keys: &[] },
    KindSpec { group: "networking.k8s.io", kind: "Ingress", merge_keys: &[] },
];

type CodecMap = HashMap<String, Arc<dyn ObjectCodec>>;

static CODECS: Lazy<RwLock<CodecMap>> = Lazy::new(|| RwLock::new(HashMap::new()));

pub fn kind_spec(gvk: &GroupVersionKind) -> Option<&'static KindSpec> {
    KINDS.iter().find(|spec| spec.group == gvk.group && spec.kind == gvk.kind)
}

/// Strategic-merge metadata for a kind. Kinds the registry does not know
/// get the empty table, which degrades the patch engine to plain JSON
/// merge-patch semantics.
pub fn patch_meta(gvk: &GroupVersionKind) -> PatchMeta {
    let mut pairs: Vec<(&str, &str)> = UNIVERSAL_MERGE_KEYS.to_vec();
    if let Some(spec) = kind_spec(gvk) {
        pairs.extend_from_slice(spec.merge_keys);
    }
    PatchMeta::new(&pairs)
}

/// Register a body codec for one kind. Registration marks the kind's group
/// as protobuf-native for `media_type_for_gvr`.
pub fn register_codec(gvk: GroupVersionKind, codec: Arc<dyn ObjectCodec>) {
    CODECS.write().unwrap().insert(gvk.to_string(), codec);
}

pub fn codec_for(gvk: &GroupVersionKind) -> Option<Arc<dyn ObjectCodec>> {
    CODECS.read().unwrap().get(&gvk.to_string()).cloned()
}

pub fn group_has_codec(group: &str) -> bool {
    CODECS.read().unwrap().keys().any(|key| {
        // Keys render as `version/Kind` for the core group and
        // `group/version/Kind` otherwise.
        match key.splitn(3, '/').collect::<Vec<_>>().as_slice() {
            [_, _] => group.is_empty(),
            [g, _, _] => *g == group,
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_kinds_have_specs() {
        let pod = GroupVersionKind::new("", "v1", "Pod");
        assert!(kind_spec(&pod).is_some());
        let deploy = GroupVersionKind::new("apps", "v1", "Deployment");
        assert!(kind_spec(&deploy).is_some());
        let widget = GroupVersionKind::new("example.com", "v1", "Widget");
        assert!(kind_spec(&widget).is_none());
    }

    #[test]
    fn patch_meta_includes_universal_keys() {
        let meta = patch_meta(&GroupVersionKind::new("example.com", "v1", "Widget"));
        assert_eq!(meta.merge_key("metadata.ownerReferences"), Some("uid"));
        assert_eq!(meta.merge_key("spec.containers"), None);

        let meta = patch_meta(&GroupVersionKind::new("", "v1", "Pod"));
        assert_eq!(meta.merge_key("spec.containers"), Some("name"));
        assert_eq!(meta.merge_key("spec.containers.env"), Some("name"));
    }

    struct NullCodec;
    impl ObjectCodec for NullCodec {
        fn decode(&self, _raw: &[u8]) -> Result<Value> {
            Ok(Value::Null)
        }
        fn encode(&self, _obj: &Value) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn codec_registration_marks_group() {
        let gvk = GroupVersionKind::new("codec-test.example.com", "v1", "Thing");
        assert!(!group_has_codec("codec-test.example.com"));
        register_codec(gvk.clone(), Arc::new(NullCodec));
        assert!(group_has_codec("codec-test.example.com"));
        assert!(codec_for(&gvk).is_some());
        assert!(!group_has_codec("other.example.com"));
    }
}
