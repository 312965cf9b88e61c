//! Tracked-object cache: the last canonical JSON written for each object,
//! keyed by collection and then by identity. Owned by exactly one saver or
//! loader per run.

use kectl_core::{GroupVersionResource, ObjectRef};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

#[derive(Debug, Default)]
pub struct TrackedCache {
    map: HashMap<GroupVersionResource, HashMap<ObjectRef, Value>>,
}

impl TrackedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, gvr: &GroupVersionResource, target: &ObjectRef) -> Option<&Value> {
        self.map.get(gvr)?.get(target)
    }

    pub fn insert(&mut self, gvr: GroupVersionResource, target: ObjectRef, obj: Value) {
        self.map.entry(gvr).or_default().insert(target, obj);
    }

    /// Insert an object that must not already be tracked; a collision means
    /// the input stream carried the same identity twice.
    pub fn insert_new(&mut self, gvr: GroupVersionResource, target: ObjectRef, obj: Value) {
        if let Some(prior) = self.map.entry(gvr.clone()).or_default().insert(target.clone(), obj) {
            if !prior.is_null() {
                warn!(gvr = %gvr, target = %target, "duplicate object in stream; keeping the later one");
            }
        }
    }

    pub fn remove(&mut self, gvr: &GroupVersionResource, target: &ObjectRef) {
        if let Some(objects) = self.map.get_mut(gvr) {
            objects.remove(target);
        }
    }

    pub fn len(&self) -> usize {
        self.map.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
