//! Well-known resource metadata: canonical plurals, short names, scope, and
//! on-disk storage paths, with the alias-correction lookup used by the CLI
//! and the record/replay engines.

#![forbid(unsafe_code)]

mod table;

use kectl_core::GroupResource;
use table::RESOURCES;
use tracing::warn;

/// Resolve a user-supplied (group, alias) pair to its canonical
/// (group, plural) form plus the namespaced flag.
///
/// The alias is matched case-insensitively with the preference order
/// canonical plural, then singular, then short name. An empty group leaves
/// the group unconstrained; when several groups match at the same rank the
/// first by sorted group name wins and a warning is logged, since this
/// lookup is a human-facing convenience.
pub fn correct_group_resource(gr: &GroupResource) -> Option<(GroupResource, bool)> {
    let alias = gr.resource.to_ascii_lowercase();
    let mut best: Option<(usize, &table::Resource)> = None;
    let mut ties = 0usize;

    for res in RESOURCES {
        if !gr.group.is_empty() && res.group != gr.group {
            continue;
        }
        let rank = match res.names.iter().position(|n| *n == alias) {
            Some(0) => 0,
            Some(1) => 1,
            Some(_) => 2,
            None => continue,
        };
        match best {
            Some((r, _)) if r < rank => {}
            Some((r, prev)) if r == rank => {
                if prev.group != res.group {
                    ties += 1;
                }
            }
            _ => {
                best = Some((rank, res));
                ties = 0;
            }
        }
    }

    let (_, res) = best?;
    if ties > 0 {
        warn!(
            alias = %alias,
            group = %res.group,
            "resource alias matches multiple groups; using the first by sorted group name"
        );
    }
    Some((GroupResource::new(res.group, res.names[0]), res.namespaced))
}

/// The path a resource occupies under the root prefix. Built-in resources
/// live directly under their storage path with no group directory,
/// matching the on-disk convention, with a handful of legacy spellings
/// (`services` is stored under `services/specs`, `nodes` under `minions`)
/// and the group-qualified exceptions (CRDs, APIServices). Resources the
/// catalog does not know are custom: group-qualified when they have a
/// group.
pub fn storage_path(gr: &GroupResource) -> String {
    for res in RESOURCES {
        if res.group == gr.group && res.names[0] == gr.resource {
            return if res.path.is_empty() { res.names[0].to_string() } else { res.path.to_string() };
        }
    }
    if gr.group.is_empty() {
        gr.resource.clone()
    } else {
        format!("{}/{}", gr.group, gr.resource)
    }
}

/// Invert [`storage_path`]: map the leading segments of a key (relative to
/// the root prefix) back to a group/resource. Returns the canonical pair
/// and how many segments the path consumed.
pub fn resource_for_key_segments(segs: &[&str]) -> Option<(GroupResource, usize)> {
    let first = *segs.first()?;

    // Two-segment storage paths win over any single-segment entry.
    if let Some(second) = segs.get(1) {
        let two = format!("{first}/{second}");
        for res in RESOURCES {
            if res.path == two {
                return Some((GroupResource::new(res.group, res.names[0]), 2));
            }
        }
    }
    for res in RESOURCES {
        let path = if res.path.is_empty() { res.names[0] } else { res.path };
        if path == first {
            return Some((GroupResource::new(res.group, res.names[0]), 1));
        }
    }

    // Unknown: a dotted leading segment is a custom resource's group
    // directory, anything else a core-group resource.
    if first.contains('.') {
        let second = segs.get(1)?;
        Some((GroupResource::new(first, *second), 2))
    } else {
        Some((GroupResource::new("", first), 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_resolve() {
        let (gr, namespaced) = correct_group_resource(&GroupResource::parse("deploy")).unwrap();
        assert_eq!(gr, GroupResource::new("apps", "deployments"));
        assert!(namespaced);

        let (gr, namespaced) = correct_group_resource(&GroupResource::parse("svc")).unwrap();
        assert_eq!(gr, GroupResource::new("", "services"));
        assert!(namespaced);

        let (gr, namespaced) = correct_group_resource(&GroupResource::parse("crd")).unwrap();
        assert_eq!(gr, GroupResource::new("apiextensions.k8s.io", "customresourcedefinitions"));
        assert!(!namespaced);
    }

    #[test]
    fn singular_and_case_insensitive() {
        let (gr, _) = correct_group_resource(&GroupResource::parse("Deployment.apps")).unwrap();
        assert_eq!(gr.resource, "deployments");

        let (gr, namespaced) = correct_group_resource(&GroupResource::parse("node")).unwrap();
        assert_eq!(gr, GroupResource::new("", "nodes"));
        assert!(!namespaced);
    }

    #[test]
    fn canonical_is_idempotent() {
        let (gr, _) = correct_group_resource(&GroupResource::new("coordination.k8s.io", "leases")).unwrap();
        assert_eq!(gr, GroupResource::new("coordination.k8s.io", "leases"));
        let (again, _) = correct_group_resource(&gr).unwrap();
        assert_eq!(again, gr);
    }

    #[test]
    fn ambiguous_alias_prefers_sorted_group() {
        // `events` exists in the core group and in events.k8s.io; the core
        // group sorts first.
        let (gr, _) = correct_group_resource(&GroupResource::parse("events")).unwrap();
        assert_eq!(gr.group, "");

        let (gr, _) =
            correct_group_resource(&GroupResource::parse("events.events.k8s.io")).unwrap();
        assert_eq!(gr.group, "events.k8s.io");
    }

    #[test]
    fn group_constrains_lookup() {
        assert!(correct_group_resource(&GroupResource::new("apps", "services")).is_none());
    }

    #[test]
    fn storage_paths() {
        assert_eq!(storage_path(&GroupResource::new("", "services")), "services/specs");
        assert_eq!(storage_path(&GroupResource::new("", "endpoints")), "services/endpoints");
        assert_eq!(storage_path(&GroupResource::new("", "nodes")), "minions");
        assert_eq!(storage_path(&GroupResource::new("networking.k8s.io", "ingresses")), "ingress");
        // Built-in grouped resources carry no group directory.
        assert_eq!(storage_path(&GroupResource::new("coordination.k8s.io", "leases")), "leases");
        assert_eq!(storage_path(&GroupResource::new("apps", "deployments")), "deployments");
        // The aggregation machinery is group-qualified.
        assert_eq!(
            storage_path(&GroupResource::new("apiextensions.k8s.io", "customresourcedefinitions")),
            "apiextensions.k8s.io/customresourcedefinitions"
        );
        // So are custom resources.
        assert_eq!(storage_path(&GroupResource::new("example.com", "widgets")), "example.com/widgets");
        assert_eq!(storage_path(&GroupResource::new("", "oddballs")), "oddballs");
    }

    #[test]
    fn storage_path_inverse() {
        let (gr, used) = resource_for_key_segments(&["services", "specs", "default", "kubernetes"]).unwrap();
        assert_eq!(gr.resource, "services");
        assert_eq!(used, 2);

        let (gr, used) = resource_for_key_segments(&["minions", "node-1"]).unwrap();
        assert_eq!(gr, GroupResource::new("", "nodes"));
        assert_eq!(used, 1);

        let (gr, used) = resource_for_key_segments(&["leases", "kube-system", "scheduler"]).unwrap();
        assert_eq!(gr, GroupResource::new("coordination.k8s.io", "leases"));
        assert_eq!(used, 1);

        let (gr, used) =
            resource_for_key_segments(&["apiextensions.k8s.io", "customresourcedefinitions", "widgets.example.com"]).unwrap();
        assert_eq!(gr.resource, "customresourcedefinitions");
        assert_eq!(used, 2);

        let (gr, used) = resource_for_key_segments(&["example.com", "widgets", "default", "w1"]).unwrap();
        assert_eq!(gr, GroupResource::new("example.com", "widgets"));
        assert_eq!(used, 2);

        let (gr, used) = resource_for_key_segments(&["no-such-thing", "x"]).unwrap();
        assert_eq!(gr, GroupResource::new("", "no-such-thing"));
        assert_eq!(used, 1);
    }
}
