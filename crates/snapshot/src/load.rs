//! Replay loader: applies the snapshot section directly, then schedules
//! `ResourcePatch` documents through the reorder window with wall-clock
//! pacing and interactive speed control.

use crate::cache::TrackedCache;
use crate::handle::Handle;
use crate::heap::{TimelineHeap, DEFAULT_WINDOW};
use crate::stream::Decoder;
use anyhow::Result;
use kectl_core::action::{self, PatchMethod, ResourcePatch};
use kectl_core::{meta, Error, GroupVersionResource, MediaType, ObjectRef};
use kectl_client::{Client, OpOptions};
use kectl_encoding::{detect, media_type_for_gvr, scheme, strategic};
use metrics::counter;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::warn;

// Events this far behind the scheduler's clock mean the producer ran faster
// than the reorder window could absorb.
const OUT_OF_ORDER_TOLERANCE: Duration = Duration::from_secs(1);
const PAUSE_POLL: Duration = Duration::from_millis(100);
const SLEEP_STEP: Duration = Duration::from_secs(1);

pub struct Loader<C: Client> {
    client: C,
    prefix: String,
    track: TrackedCache,
    handle: Option<Arc<Handle>>,
    window: usize,
}

impl<C: Client> Loader<C> {
    pub fn new(client: C, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
            track: TrackedCache::new(),
            handle: None,
            window: DEFAULT_WINDOW,
        }
    }

    /// Attach interactive pause/speed control.
    pub fn attach_handle(&mut self, handle: Arc<Handle>) {
        self.handle = Some(handle);
    }

    /// Shrink the reorder window (tests).
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Phase A: apply snapshot documents as direct puts until the first
    /// `ResourcePatch`, which is pushed back for [`replay`](Self::replay).
    pub async fn load(&mut self, ctx: &CancellationToken, decoder: &mut Decoder) -> Result<()> {
        while !ctx.is_cancelled() {
            let doc = match decoder.next_document() {
                None => break,
                Some(Ok(doc)) => doc,
                Some(Err(err)) => {
                    warn!(error = %err, "failed to decode object");
                    continue;
                }
            };
            if doc.is_null() {
                continue;
            }
            if action::is_resource_patch(&doc) {
                // Leave the patch for the replay phase.
                decoder.push_back(doc);
                break;
            }
            if let Err(err) = self.apply_snapshot_object(ctx, doc).await {
                warn!(error = %err, "failed to apply snapshot object");
            }
        }
        Ok(())
    }

    /// Phase B: decode `ResourcePatch` documents through the reorder window
    /// and hand them to the scheduler in duration order.
    pub async fn replay(&mut self, ctx: &CancellationToken, decoder: &mut Decoder) -> Result<()> {
        let mut heap: TimelineHeap<ResourcePatch> = TimelineHeap::with_window(self.window);
        let mut last_applied = Duration::ZERO;

        while !ctx.is_cancelled() {
            let doc = match decoder.next_document() {
                None => break,
                Some(Ok(doc)) => doc,
                Some(Err(err)) => {
                    warn!(error = %err, "failed to decode timeline document");
                    continue;
                }
            };
            if doc.is_null() {
                continue;
            }
            if !action::is_resource_patch(&doc) {
                warn!(
                    kind = doc.get("kind").and_then(|v| v.as_str()).unwrap_or(""),
                    api_version = doc.get("apiVersion").and_then(|v| v.as_str()).unwrap_or(""),
                    "unexpected document in timeline; skipping"
                );
                continue;
            }
            let patch: ResourcePatch = match serde_json::from_value(doc) {
                Ok(patch) => patch,
                Err(err) => {
                    warn!(error = %err, "failed to decode resource patch");
                    continue;
                }
            };
            if let Some((_, ready)) = heap.push(patch.duration(), patch) {
                self.schedule(ctx, ready, &mut last_applied).await;
            }
        }

        while let Some((_, ready)) = heap.pop() {
            if ctx.is_cancelled() {
                break;
            }
            self.schedule(ctx, ready, &mut last_applied).await;
        }
        Ok(())
    }

    // Pace one patch relative to the previous one, then apply it. Apply
    // time is charged back to the clock so slow writes do not accumulate
    // lag.
    async fn schedule(&mut self, ctx: &CancellationToken, patch: ResourcePatch, last_applied: &mut Duration) {
        let t = patch.duration();
        let mut d = Duration::ZERO;
        if t > *last_applied {
            d = t - *last_applied;
            *last_applied = t;
        } else if *last_applied - t > OUT_OF_ORDER_TOLERANCE {
            if let Some(handle) = &self.handle {
                let rate = handle.speed_down();
                warn!(
                    rate,
                    over = ?(*last_applied - t),
                    current = ?t,
                    "events arriving out of order beyond the window; speeding down"
                );
                *last_applied = t;
            }
        }

        while !d.is_zero() {
            self.poll_pause(ctx).await;
            if ctx.is_cancelled() {
                return;
            }
            let mut step = SLEEP_STEP.min(d);
            d -= step;
            if let Some(handle) = &self.handle {
                step /= handle.speed() as u32;
            }
            if !step.is_zero() {
                tokio::select! {
                    _ = ctx.cancelled() => return,
                    _ = tokio::time::sleep(step) => {}
                }
            }
        }
        self.poll_pause(ctx).await;
        if ctx.is_cancelled() {
            return;
        }

        let start = Instant::now();
        self.apply_resource_patch(ctx, patch).await;
        let mut spent = start.elapsed();
        if !spent.is_zero() {
            if let Some(handle) = &self.handle {
                spent *= handle.speed() as u32;
            }
            *last_applied += spent;
        }
    }

    async fn poll_pause(&self, ctx: &CancellationToken) {
        let Some(handle) = &self.handle else { return };
        while handle.is_paused() && !ctx.is_cancelled() {
            tokio::select! {
                _ = ctx.cancelled() => return,
                _ = tokio::time::sleep(PAUSE_POLL) => {}
            }
        }
    }

    async fn apply_resource_patch(&mut self, ctx: &CancellationToken, patch: ResourcePatch) {
        counter!("replay_patches_total", 1u64);
        let gvr = patch.resource.clone();
        let target = patch.target.clone();
        match patch.method {
            PatchMethod::Delete => {
                let opts = OpOptions::default()
                    .with_group_resource(gvr.group_resource())
                    .with_name(&target.name, &target.namespace);
                match self.client.delete(ctx, &self.prefix, opts).await {
                    Ok(()) => self.track.remove(&gvr, &target),
                    Err(err) => warn!(gvr = %gvr, target = %target, error = %err, "failed to delete resource"),
                }
            }
            PatchMethod::Create => {
                let obj: Value = match serde_json::from_str(&patch.template) {
                    Ok(obj) => obj,
                    Err(err) => {
                        warn!(gvr = %gvr, target = %target, error = %err, "failed to decode create template");
                        return;
                    }
                };
                if let Err(err) = self.put_object(ctx, &gvr, obj).await {
                    warn!(gvr = %gvr, target = %target, error = %err, "failed to create resource");
                }
            }
            PatchMethod::Patch => {
                let prior = match self.track.get(&gvr, &target) {
                    Some(prior) => prior.clone(),
                    None => match self.fetch_object(ctx, &gvr, &target).await {
                        Ok(live) => {
                            warn!(gvr = %gvr, target = %target, "modify a resource that is not currently created");
                            self.track.insert(gvr.clone(), target.clone(), live.clone());
                            live
                        }
                        Err(err) => {
                            warn!(gvr = %gvr, target = %target, error = %err, "failed to get original resource");
                            return;
                        }
                    },
                };
                let diff: Value = match serde_json::from_str(&patch.template) {
                    Ok(diff) => diff,
                    Err(err) => {
                        warn!(gvr = %gvr, target = %target, error = %err, "failed to decode patch template");
                        return;
                    }
                };
                let patch_meta = match meta::gvk_of(&prior) {
                    Some(gvk) => scheme::patch_meta(&gvk),
                    None => strategic::PatchMeta::empty(),
                };
                let merged = match strategic::apply_patch(&prior, &diff, &patch_meta) {
                    Ok(merged) => merged,
                    Err(err) => {
                        warn!(gvr = %gvr, target = %target, error = %err, "failed to merge patch");
                        return;
                    }
                };
                if let Err(err) = self.put_object(ctx, &gvr, merged).await {
                    warn!(gvr = %gvr, target = %target, error = %err, "failed to patch resource");
                }
            }
        }
    }

    async fn apply_snapshot_object(&mut self, ctx: &CancellationToken, obj: Value) -> Result<()> {
        let gvr = crate::gvr_for_object(&obj).ok_or_else(|| Error::StreamMalformed {
            reason: "snapshot document has no apiVersion/kind".into(),
        })?;
        self.put_object(ctx, &gvr, obj).await
    }

    // Write canonical JSON under the object's key, converted to the media
    // type the store expects, and track it for later patches.
    async fn put_object(&mut self, ctx: &CancellationToken, gvr: &GroupVersionResource, mut obj: Value) -> Result<()> {
        meta::clear_resource_version(&mut obj);
        let target = meta::object_ref(&obj);
        if target.name.is_empty() {
            return Err(Error::StreamMalformed { reason: "object has no name".into() }.into());
        }
        let data = serde_json::to_vec(&obj)?;
        let media = media_type_for_gvr(gvr);
        let stored = if media == MediaType::Json {
            data
        } else {
            kectl_encoding::convert(MediaType::Json, media, &data)?
        };
        let opts = OpOptions::default()
            .with_group_resource(gvr.group_resource())
            .with_name(&target.name, &target.namespace);
        self.client.put(ctx, &self.prefix, stored, opts).await?;
        self.track.insert(gvr.clone(), target, obj);
        Ok(())
    }

    async fn fetch_object(&self, ctx: &CancellationToken, gvr: &GroupVersionResource, target: &ObjectRef) -> Result<Value> {
        let opts = OpOptions::default()
            .with_group_resource(gvr.group_resource())
            .with_name(&target.name, &target.namespace);
        let mut stored: Option<Vec<u8>> = None;
        self.client
            .get(ctx, &self.prefix, opts, &mut |kv| {
                stored = kv.value.clone();
                Ok(())
            })
            .await?;
        let data = stored.filter(|d| !d.is_empty()).ok_or(Error::ResourceNotFound)?;
        let media = detect(&data)?;
        let mut obj = kectl_encoding::decode(media, &data)?;
        meta::clear_resource_version(&mut obj);
        Ok(obj)
    }
}
