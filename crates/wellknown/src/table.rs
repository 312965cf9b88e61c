//! Don't edit this file directly. It is regenerated from API discovery
//! against a recent control plane; entries are sorted by group, then by
//! canonical plural.

pub(crate) struct Resource {
    /// Canonical plural first, then the singular, then short names.
    pub names: &'static [&'static str],
    pub namespaced: bool,
    pub group: &'static str,
    /// Storage path under the root prefix when it differs from the
    /// canonical plural; empty otherwise. Built-in resources live directly
    /// under their path with no group directory; the aggregation and CRD
    /// machinery are the group-qualified exceptions.
    pub path: &'static str,
}

pub(crate) static RESOURCES: &[Resource] = &[
    Resource { names: &["componentstatuses", "componentstatus", "cs"], namespaced: false, group: "", path: "" },
    Resource { names: &["configmaps", "configmap", "cm"], namespaced: true, group: "", path: "" },
    Resource { names: &["endpoints", "ep"], namespaced: true, group: "", path: "services/endpoints" },
    Resource { names: &["events", "event", "ev"], namespaced: true, group: "", path: "" },
    Resource { names: &["limitranges", "limitrange", "limits"], namespaced: true, group: "", path: "" },
    Resource { names: &["namespaces", "namespace", "ns"], namespaced: false, group: "", path: "" },
    Resource { names: &["nodes", "node", "no"], namespaced: false, group: "", path: "minions" },
    Resource { names: &["persistentvolumeclaims", "persistentvolumeclaim", "pvc"], namespaced: true, group: "", path: "" },
    Resource { names: &["persistentvolumes", "persistentvolume", "pv"], namespaced: false, group: "", path: "" },
    Resource { names: &["pods", "pod", "po"], namespaced: true, group: "", path: "" },
    Resource { names: &["podtemplates", "podtemplate"], namespaced: true, group: "", path: "" },
    Resource { names: &["replicationcontrollers", "replicationcontroller", "rc"], namespaced: true, group: "", path: "" },
    Resource { names: &["resourcequotas", "resourcequota", "quota"], namespaced: true, group: "", path: "" },
    Resource { names: &["secrets", "secret"], namespaced: true, group: "", path: "" },
    Resource { names: &["serviceaccounts", "serviceaccount", "sa"], namespaced: true, group: "", path: "" },
    Resource { names: &["services", "service", "svc"], namespaced: true, group: "", path: "services/specs" },
    Resource { names: &["mutatingwebhookconfigurations", "mutatingwebhookconfiguration"], namespaced: false, group: "admissionregistration.k8s.io", path: "" },
    Resource { names: &["validatingadmissionpolicies", "validatingadmissionpolicy"], namespaced: false, group: "admissionregistration.k8s.io", path: "" },
    Resource { names: &["validatingadmissionpolicybindings", "validatingadmissionpolicybinding"], namespaced: false, group: "admissionregistration.k8s.io", path: "" },
    Resource { names: &["validatingwebhookconfigurations", "validatingwebhookconfiguration"], namespaced: false, group: "admissionregistration.k8s.io", path: "" },
    Resource { names: &["customresourcedefinitions", "customresourcedefinition", "crd", "crds"], namespaced: false, group: "apiextensions.k8s.io", path: "apiextensions.k8s.io/customresourcedefinitions" },
    Resource { names: &["apiservices", "apiservice"], namespaced: false, group: "apiregistration.k8s.io", path: "apiregistration.k8s.io/apiservices" },
    Resource { names: &["controllerrevisions", "controllerrevision"], namespaced: true, group: "apps", path: "" },
    Resource { names: &["daemonsets", "daemonset", "ds"], namespaced: true, group: "apps", path: "" },
    Resource { names: &["deployments", "deployment", "deploy"], namespaced: true, group: "apps", path: "" },
    Resource { names: &["replicasets", "replicaset", "rs"], namespaced: true, group: "apps", path: "" },
    Resource { names: &["statefulsets", "statefulset", "sts"], namespaced: true, group: "apps", path: "" },
    Resource { names: &["horizontalpodautoscalers", "horizontalpodautoscaler", "hpa"], namespaced: true, group: "autoscaling", path: "" },
    Resource { names: &["cronjobs", "cronjob", "cj"], namespaced: true, group: "batch", path: "" },
    Resource { names: &["jobs", "job"], namespaced: true, group: "batch", path: "" },
    Resource { names: &["certificatesigningrequests", "certificatesigningrequest", "csr"], namespaced: false, group: "certificates.k8s.io", path: "" },
    Resource { names: &["leases", "lease"], namespaced: true, group: "coordination.k8s.io", path: "" },
    Resource { names: &["endpointslices", "endpointslice"], namespaced: true, group: "discovery.k8s.io", path: "" },
    Resource { names: &["events", "event", "ev"], namespaced: true, group: "events.k8s.io", path: "" },
    Resource { names: &["flowschemas", "flowschema"], namespaced: false, group: "flowcontrol.apiserver.k8s.io", path: "" },
    Resource { names: &["prioritylevelconfigurations", "prioritylevelconfiguration"], namespaced: false, group: "flowcontrol.apiserver.k8s.io", path: "" },
    Resource { names: &["ingressclasses", "ingressclass"], namespaced: false, group: "networking.k8s.io", path: "" },
    Resource { names: &["ingresses", "ingress", "ing"], namespaced: true, group: "networking.k8s.io", path: "ingress" },
    Resource { names: &["networkpolicies", "networkpolicy", "netpol"], namespaced: true, group: "networking.k8s.io", path: "" },
    Resource { names: &["runtimeclasses", "runtimeclass"], namespaced: false, group: "node.k8s.io", path: "" },
    Resource { names: &["poddisruptionbudgets", "poddisruptionbudget", "pdb"], namespaced: true, group: "policy", path: "" },
    Resource { names: &["clusterrolebindings", "clusterrolebinding"], namespaced: false, group: "rbac.authorization.k8s.io", path: "" },
    Resource { names: &["clusterroles", "clusterrole"], namespaced: false, group: "rbac.authorization.k8s.io", path: "" },
    Resource { names: &["rolebindings", "rolebinding"], namespaced: true, group: "rbac.authorization.k8s.io", path: "" },
    Resource { names: &["roles", "role"], namespaced: true, group: "rbac.authorization.k8s.io", path: "" },
    Resource { names: &["priorityclasses", "priorityclass", "pc"], namespaced: false, group: "scheduling.k8s.io", path: "" },
    Resource { names: &["csidrivers", "csidriver"], namespaced: false, group: "storage.k8s.io", path: "" },
    Resource { names: &["csinodes", "csinode"], namespaced: false, group: "storage.k8s.io", path: "" },
    Resource { names: &["csistoragecapacities", "csistoragecapacity"], namespaced: true, group: "storage.k8s.io", path: "" },
    Resource { names: &["storageclasses", "storageclass", "sc"], namespaced: false, group: "storage.k8s.io", path: "" },
    Resource { names: &["volumeattachments", "volumeattachment"], namespaced: false, group: "storage.k8s.io", path: "" },
];
