//! In-memory backend: a sorted map plus an event log with the same
//! revision/watch semantics as the real store. Backs tests and offline runs.

use crate::{OnResponse, OpOptions};
use anyhow::{bail, Result};
use async_trait::async_trait;
use kectl_core::{Error, KeyValue};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct MemState {
    data: BTreeMap<String, Vec<u8>>,
    revision: i64,
    log: Vec<KeyValue>,
}

#[derive(Clone)]
pub struct MemClient {
    state: Arc<Mutex<MemState>>,
    events: broadcast::Sender<KeyValue>,
    get_calls: Arc<AtomicU64>,
}

impl MemClient {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(4096);
        Self {
            state: Arc::new(Mutex::new(MemState::default())),
            events,
            get_calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Snapshot of the raw key space, for assertions.
    pub fn contents(&self) -> BTreeMap<String, Vec<u8>> {
        self.state.lock().unwrap().data.clone()
    }

    /// Mutation events in commit order, for assertions.
    pub fn history(&self) -> Vec<KeyValue> {
        self.state.lock().unwrap().log.clone()
    }

    /// Number of `get` calls served.
    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::Relaxed)
    }

    fn matches(target: &str, point: bool, key: &str) -> bool {
        if point {
            key == target
        } else {
            key.starts_with(target)
        }
    }
}

impl Default for MemClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl crate::Client for MemClient {
    async fn get(
        &self,
        ctx: &CancellationToken,
        prefix: &str,
        opts: OpOptions,
        on_kv: &mut OnResponse<'_>,
    ) -> Result<i64> {
        if ctx.is_cancelled() {
            bail!("get cancelled");
        }
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        let (target, point) = opts.key_for(prefix);
        let (revision, matched): (i64, Vec<(String, Vec<u8>)>) = {
            let state = self.state.lock().unwrap();
            let matched = state
                .data
                .iter()
                .filter(|(k, _)| Self::matches(&target, point, k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (state.revision, matched)
        };
        for (k, v) in matched {
            let kv = KeyValue {
                key: k,
                value: Some(if opts.keys_only { Vec::new() } else { v }),
                prev_value: None,
                revision,
            };
            on_kv(&kv)?;
        }
        Ok(revision)
    }

    async fn put(&self, ctx: &CancellationToken, prefix: &str, value: Vec<u8>, opts: OpOptions) -> Result<()> {
        let (target, point) = opts.key_for(prefix);
        if !point {
            bail!("put requires a resource and name");
        }
        if ctx.is_cancelled() {
            bail!("put cancelled");
        }
        let event = {
            let mut state = self.state.lock().unwrap();
            state.revision += 1;
            let prev = state.data.insert(target.clone(), value.clone());
            let event = KeyValue {
                key: target,
                value: Some(value),
                prev_value: prev,
                revision: state.revision,
            };
            state.log.push(event.clone());
            event
        };
        let _ = self.events.send(event);
        Ok(())
    }

    async fn delete(&self, ctx: &CancellationToken, prefix: &str, opts: OpOptions) -> Result<()> {
        let (target, point) = opts.key_for(prefix);
        if !point {
            bail!("delete requires a resource and name");
        }
        if ctx.is_cancelled() {
            bail!("delete cancelled");
        }
        let event = {
            let mut state = self.state.lock().unwrap();
            state.revision += 1;
            let prev = state.data.remove(&target);
            let event = KeyValue { key: target, value: None, prev_value: prev, revision: state.revision };
            state.log.push(event.clone());
            event
        };
        let _ = self.events.send(event);
        Ok(())
    }

    async fn watch(
        &self,
        ctx: &CancellationToken,
        prefix: &str,
        opts: OpOptions,
        on_kv: &mut OnResponse<'_>,
    ) -> Result<()> {
        let (target, point) = opts.key_for(prefix);
        // Subscribe before replaying the backlog so nothing slips between.
        let mut rx = self.events.subscribe();
        let mut delivered = 0i64;
        let backlog: Vec<KeyValue> = {
            let state = self.state.lock().unwrap();
            state
                .log
                .iter()
                .filter(|kv| opts.revision > 0 && kv.revision >= opts.revision)
                .filter(|kv| Self::matches(&target, point, &kv.key))
                .cloned()
                .collect()
        };
        for kv in backlog {
            delivered = kv.revision;
            on_kv(&kv)?;
        }
        loop {
            let received = tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                received = rx.recv() => received,
            };
            match received {
                Ok(kv) => {
                    if kv.revision <= delivered || !Self::matches(&target, point, &kv.key) {
                        continue;
                    }
                    delivered = kv.revision;
                    on_kv(&kv)?;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Err(Error::WatchLost { reason: format!("dropped {n} events") }.into())
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Client;
    use kectl_core::GroupResource;

    fn opts(name: &str, ns: &str) -> OpOptions {
        OpOptions::default()
            .with_group_resource(GroupResource::new("", "pods"))
            .with_name(name, ns)
    }

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let client = MemClient::new();
        let ctx = CancellationToken::new();
        client.put(&ctx, "/registry", b"one".to_vec(), opts("a", "default")).await.unwrap();
        client.put(&ctx, "/registry", b"two".to_vec(), opts("b", "default")).await.unwrap();

        let mut seen = Vec::new();
        let rev = client
            .get(&ctx, "/registry", opts("", "default"), &mut |kv| {
                seen.push((kv.key.clone(), kv.value.clone().unwrap()));
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(rev, 2);
        assert_eq!(
            seen,
            vec![
                ("/registry/pods/default/a".to_string(), b"one".to_vec()),
                ("/registry/pods/default/b".to_string(), b"two".to_vec()),
            ]
        );

        client.delete(&ctx, "/registry", opts("a", "default")).await.unwrap();
        assert_eq!(client.contents().len(), 1);
    }

    #[tokio::test]
    async fn watch_replays_backlog_then_streams() {
        let client = MemClient::new();
        let ctx = CancellationToken::new();
        client.put(&ctx, "/registry", b"v1".to_vec(), opts("a", "default")).await.unwrap();

        let watcher = client.clone();
        let watch_ctx = ctx.clone();
        let collected = Arc::new(Mutex::new(Vec::new()));
        let sink = collected.clone();
        let task = tokio::spawn(async move {
            let mut on = move |kv: &KeyValue| {
                sink.lock().unwrap().push((kv.revision, kv.is_delete()));
                Ok(())
            };
            watcher
                .watch(&watch_ctx, "/registry", opts("", "default").with_revision(1), &mut on)
                .await
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        client.put(&ctx, "/registry", b"v2".to_vec(), opts("a", "default")).await.unwrap();
        client.delete(&ctx, "/registry", opts("a", "default")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        ctx.cancel();
        task.await.unwrap().unwrap();

        let events = collected.lock().unwrap().clone();
        assert_eq!(events, vec![(1, false), (2, false), (3, true)]);
    }
}
