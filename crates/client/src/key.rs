//! The canonical key layout: `{prefix}/{storage-path}[/{namespace}]/{name}`,
//! where the storage path comes from the catalog. Built-in resources sit
//! directly under their path and custom resources under a group directory,
//! preserving the on-disk convention.

use kectl_core::{Error, GroupResource};

/// Build a point key (name set) or list prefix (name empty, optionally
/// namespace empty too).
pub fn build_prefix(prefix: &str, gr: &GroupResource, namespace: &str, name: &str) -> String {
    let mut key = prefix.trim_end_matches('/').to_string();
    key.push('/');
    key.push_str(&kectl_wellknown::storage_path(gr));
    if !namespace.is_empty() {
        key.push('/');
        key.push_str(namespace);
    }
    if !name.is_empty() {
        key.push('/');
        key.push_str(name);
    }
    key
}

/// Invert [`build_prefix`] for a full (named) key. Returns the canonical
/// group/resource, the namespace when the key carries one, and the name.
pub fn split_key(prefix: &str, key: &str) -> Result<(GroupResource, Option<String>, String), Error> {
    let invalid = || Error::InvalidKey { key: key.to_string() };

    let rel = key
        .strip_prefix(prefix.trim_end_matches('/'))
        .and_then(|r| r.strip_prefix('/'))
        .ok_or_else(invalid)?;
    let segs: Vec<&str> = rel.split('/').collect();
    if segs.len() < 2 || segs.iter().any(|s| s.is_empty()) {
        return Err(invalid());
    }

    let (gr, used) = kectl_wellknown::resource_for_key_segments(&segs).ok_or_else(invalid)?;
    match &segs[used..] {
        [name] => Ok((gr, None, name.to_string())),
        [namespace, name] => Ok((gr, Some(namespace.to_string()), name.to_string())),
        _ => Err(invalid()),
    }
}

/// The exclusive upper bound of a prefix range scan: the prefix with its
/// last incrementable byte bumped, as the store's range API expects.
pub fn prefix_range_end(prefix: &str) -> Vec<u8> {
    let mut end = prefix.as_bytes().to_vec();
    while let Some(last) = end.last().copied() {
        if last < 0xff {
            *end.last_mut().unwrap() = last + 1;
            return end;
        }
        end.pop();
    }
    // Unbounded: scan to the end of the key space.
    vec![0]
}

/// The key immediately after `key` in byte order; resumes a paged scan.
pub fn next_key(key: &[u8]) -> Vec<u8> {
    let mut next = key.to_vec();
    next.push(0);
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_core_and_grouped_keys() {
        let pods = GroupResource::new("", "pods");
        assert_eq!(build_prefix("/registry", &pods, "default", "web-0"), "/registry/pods/default/web-0");
        assert_eq!(build_prefix("/registry", &pods, "", ""), "/registry/pods");

        // Built-in grouped resources have no group directory on disk.
        let leases = GroupResource::new("coordination.k8s.io", "leases");
        assert_eq!(
            build_prefix("/registry", &leases, "kube-system", ""),
            "/registry/leases/kube-system"
        );
        let deployments = GroupResource::new("apps", "deployments");
        assert_eq!(
            build_prefix("/registry", &deployments, "default", "web"),
            "/registry/deployments/default/web"
        );

        // Custom resources do.
        let widgets = GroupResource::new("example.com", "widgets");
        assert_eq!(
            build_prefix("/registry", &widgets, "default", "w1"),
            "/registry/example.com/widgets/default/w1"
        );
    }

    #[test]
    fn builds_legacy_storage_paths() {
        let services = GroupResource::new("", "services");
        assert_eq!(
            build_prefix("/registry", &services, "default", "kubernetes"),
            "/registry/services/specs/default/kubernetes"
        );
        let nodes = GroupResource::new("", "nodes");
        assert_eq!(build_prefix("/registry", &nodes, "", "node-1"), "/registry/minions/node-1");
        let crds = GroupResource::new("apiextensions.k8s.io", "customresourcedefinitions");
        assert_eq!(
            build_prefix("/registry", &crds, "", "widgets.example.com"),
            "/registry/apiextensions.k8s.io/customresourcedefinitions/widgets.example.com"
        );
    }

    #[test]
    fn split_inverts_build() {
        let cases = [
            ("", "services", "default", "kubernetes"),
            ("", "pods", "kube-system", "dns"),
            ("", "nodes", "", "node-1"),
            ("coordination.k8s.io", "leases", "kube-system", "scheduler"),
            ("apps", "deployments", "default", "web"),
            ("example.com", "widgets", "default", "w1"),
            ("apiextensions.k8s.io", "customresourcedefinitions", "", "widgets.example.com"),
        ];
        for (group, resource, ns, name) in cases {
            let gr = GroupResource::new(group, resource);
            let key = build_prefix("/registry", &gr, ns, name);
            let (back, back_ns, back_name) = split_key("/registry", &key).unwrap();
            assert_eq!(back, gr, "key {key}");
            assert_eq!(back_ns.as_deref(), if ns.is_empty() { None } else { Some(ns) });
            assert_eq!(back_name, name);
        }
    }

    #[test]
    fn split_rejects_foreign_and_short_keys() {
        assert!(matches!(
            split_key("/registry", "/other/pods/default/a"),
            Err(Error::InvalidKey { .. })
        ));
        assert!(matches!(split_key("/registry", "/registry/pods"), Err(Error::InvalidKey { .. })));
        assert!(matches!(
            split_key("/registry", "/registry/pods//a"),
            Err(Error::InvalidKey { .. })
        ));
        assert!(matches!(
            split_key("/registry", "/registry/pods/ns/name/extra"),
            Err(Error::InvalidKey { .. })
        ));
    }

    #[test]
    fn range_end_increments_last_byte() {
        assert_eq!(prefix_range_end("/registry/pods/"), b"/registry/pods0".to_vec());
        assert_eq!(next_key(b"/registry/pods/a"), b"/registry/pods/a\0".to_vec());
    }
}
