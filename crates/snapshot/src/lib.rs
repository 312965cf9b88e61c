//! Snapshot, record, and replay of the store's state as a YAML timeline
//! stream.

#![forbid(unsafe_code)]

mod cache;
pub mod handle;
pub mod heap;
mod load;
mod save;
pub mod stream;

pub use cache::TrackedCache;
pub use load::Loader;
pub use save::Saver;

use kectl_core::{meta, GroupResource, GroupVersionResource};
use serde_json::Value;

/// Derive the collection address for an object from its kind, consulting
/// the catalog for the canonical plural. Kinds the catalog does not know
/// fall back to naive pluralization.
pub(crate) fn gvr_for_object(obj: &Value) -> Option<GroupVersionResource> {
    let gvk = meta::gvk_of(obj)?;
    let guess = GroupResource::new(gvk.group.as_str(), gvk.kind.to_ascii_lowercase());
    let gr = match kectl_wellknown::correct_group_resource(&guess) {
        Some((gr, _)) => gr,
        None => GroupResource::new(gvk.group.as_str(), format!("{}s", gvk.kind.to_ascii_lowercase())),
    };
    Some(GroupVersionResource::new(gr.group, gvk.version, gr.resource))
}
