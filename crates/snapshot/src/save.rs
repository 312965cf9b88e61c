//! Snapshot saver and record engine: walk the key space into a YAML stream,
//! then turn watch events into `ResourcePatch` timeline documents.

use crate::cache::TrackedCache;
use crate::stream::Encoder;
use anyhow::Result;
use kectl_core::action::{PatchMethod, ResourcePatch};
use kectl_core::{meta, KeyValue};
use kectl_client::{Client, OpOptions};
use kectl_encoding::{detect, scheme, strategic};
use metrics::counter;
use serde_json::Value;
use std::io::Write;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct Saver<C: Client> {
    client: C,
    prefix: String,
    rev: i64,
    track: TrackedCache,
    base_time: Option<Instant>,
}

impl<C: Client> Saver<C> {
    pub fn new(client: C, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
            rev: 0,
            track: TrackedCache::new(),
            base_time: None,
        }
    }

    /// The revision observed at the start of the snapshot; the baseline for
    /// a follow-up [`record`](Self::record).
    pub fn revision(&self) -> i64 {
        self.rev
    }

    /// Walk the entire key space and emit one YAML document per object.
    /// Undecodable and name-less entries are skipped, not fatal.
    pub async fn save<W: Write + Send>(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut Encoder<W>,
    ) -> Result<()> {
        let Self { client, prefix, track, .. } = &mut *self;
        let mut saved = 0usize;
        let mut on_kv = |kv: &KeyValue| {
            if save_kv(track, encoder, kv)? {
                saved += 1;
            }
            Ok(())
        };
        let rev = client.get(ctx, prefix, OpOptions::default(), &mut on_kv).await?;
        self.rev = rev;
        info!(objects = saved, revision = rev, "snapshot saved");
        Ok(())
    }

    /// Stream watch events from the snapshot baseline onward, emitting one
    /// `ResourcePatch` document per change.
    pub async fn record<W: Write + Send>(
        &mut self,
        ctx: &CancellationToken,
        encoder: &mut Encoder<W>,
    ) -> Result<()> {
        let Self { client, prefix, track, rev, base_time } = &mut *self;
        let opts = OpOptions::default().with_revision(*rev);
        let mut on_kv = |kv: &KeyValue| {
            let elapsed = base_time.map(|t| t.elapsed()).unwrap_or_default();
            match resource_patch_for(track, kv, elapsed) {
                Ok(Some(patch)) => {
                    if base_time.is_none() {
                        *base_time = Some(Instant::now());
                    }
                    counter!("record_events_total", 1u64);
                    encoder.encode(&patch)
                }
                Ok(None) => Ok(()),
                Err(err) => {
                    warn!(key = %kv.key, error = %err, "skipping unrecordable event");
                    Ok(())
                }
            }
        };
        client.watch(ctx, prefix, opts, &mut on_kv).await
    }
}

// Returns true when an object document was written.
fn save_kv<W: Write>(track: &mut TrackedCache, encoder: &mut Encoder<W>, kv: &KeyValue) -> Result<bool> {
    let Some(payload) = kv.payload() else { return Ok(false) };
    let mut obj = match decode_payload(payload) {
        Ok(obj) => obj,
        Err(err) => {
            warn!(key = %kv.key, error = %err, "skipping undecodable object");
            return Ok(false);
        }
    };
    if meta::name_of(&obj).is_empty() {
        return Ok(false);
    }
    let Some(gvr) = crate::gvr_for_object(&obj) else { return Ok(false) };
    meta::clear_resource_version(&mut obj);
    encoder.encode(&obj)?;
    let target = meta::object_ref(&obj);
    track.insert_new(gvr, target, obj);
    Ok(true)
}

fn decode_payload(payload: &[u8]) -> Result<Value> {
    let media = detect(payload)?;
    kectl_encoding::decode(media, payload)
}

/// Build the timeline document for one watch event against the tracked
/// cache: create on first sight, a strategic-merge diff on update, delete on
/// removal. Returns `None` for entries that decode to nothing usable.
pub(crate) fn resource_patch_for(
    track: &mut TrackedCache,
    kv: &KeyValue,
    elapsed: Duration,
) -> Result<Option<ResourcePatch>> {
    let Some(payload) = kv.payload() else { return Ok(None) };
    let mut obj = decode_payload(payload)?;
    if meta::name_of(&obj).is_empty() {
        return Ok(None);
    }
    let Some(gvk) = meta::gvk_of(&obj) else { return Ok(None) };
    let Some(gvr) = crate::gvr_for_object(&obj) else { return Ok(None) };
    let target = meta::object_ref(&obj);

    if kv.is_delete() {
        let mut patch = ResourcePatch::new(gvr.clone(), target.clone(), PatchMethod::Delete);
        patch.set_duration(elapsed);
        track.remove(&gvr, &target);
        return Ok(Some(patch));
    }

    meta::clear_resource_version(&mut obj);
    let (method, template) = match track.get(&gvr, &target) {
        None => (PatchMethod::Create, serde_json::to_string(&obj)?),
        Some(prior) => {
            let diff = strategic::create_two_way_patch(prior, &obj, &scheme::patch_meta(&gvk));
            (PatchMethod::Patch, serde_json::to_string(&diff)?)
        }
    };
    let mut patch = ResourcePatch::new(gvr.clone(), target.clone(), method);
    patch.set_duration(elapsed);
    patch.template = template;
    track.insert(gvr, target, obj);
    Ok(Some(patch))
}
