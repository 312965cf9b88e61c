//! etcd v3 backend for the client facade.

use crate::{key, OnResponse, OpOptions};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use etcd_client::{DeleteOptions, GetOptions, SortOrder, SortTarget, WatchOptions};
use kectl_core::{Error, KeyValue};
use metrics::{counter, histogram};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Facade implementation over the etcd v3 gRPC client. Cloning is cheap;
/// the underlying channel is shared.
#[derive(Clone)]
pub struct EtcdClient {
    client: etcd_client::Client,
}

impl EtcdClient {
    pub async fn connect(endpoints: &[String]) -> Result<Self> {
        let client = etcd_client::Client::connect(endpoints, None)
            .await
            .with_context(|| format!("connecting to etcd at {}", endpoints.join(",")))?;
        Ok(Self { client })
    }
}

fn to_key_value(kv: &etcd_client::KeyValue, keys_only: bool) -> KeyValue {
    KeyValue {
        key: String::from_utf8_lossy(kv.key()).into_owned(),
        value: Some(if keys_only { Vec::new() } else { kv.value().to_vec() }),
        prev_value: None,
        revision: kv.mod_revision(),
    }
}

#[async_trait]
impl crate::Client for EtcdClient {
    async fn get(
        &self,
        ctx: &CancellationToken,
        prefix: &str,
        opts: OpOptions,
        on_kv: &mut OnResponse<'_>,
    ) -> Result<i64> {
        let mut kv_client = self.client.kv_client();
        let (target, point) = opts.key_for(prefix);

        if point {
            let mut get_opts = GetOptions::new();
            if opts.revision > 0 {
                get_opts = get_opts.with_revision(opts.revision);
            }
            if opts.keys_only {
                get_opts = get_opts.with_keys_only();
            }
            let resp = kv_client
                .get(target.as_str(), Some(get_opts))
                .await
                .context("point get")?;
            let rev = resp.header().map(|h| h.revision()).unwrap_or(0);
            for item in resp.kvs() {
                on_kv(&to_key_value(item, opts.keys_only))?;
            }
            return Ok(rev);
        }

        let end = key::prefix_range_end(&target);
        let limit = opts.page_limit_or_default();
        let mut start = target.into_bytes();
        let mut first_rev = 0i64;
        loop {
            if ctx.is_cancelled() {
                bail!("get cancelled");
            }
            let mut get_opts = GetOptions::new()
                .with_range(end.clone())
                .with_limit(limit)
                .with_sort(SortTarget::Key, SortOrder::Ascend);
            if opts.keys_only {
                get_opts = get_opts.with_keys_only();
            }
            if opts.revision > 0 {
                get_opts = get_opts.with_revision(opts.revision);
            } else if first_rev > 0 {
                // Pin later pages to the first page's revision so the scan
                // is a consistent snapshot.
                get_opts = get_opts.with_revision(first_rev);
            }
            let resp = kv_client
                .get(start.clone(), Some(get_opts))
                .await
                .context("range get")?;
            if first_rev == 0 {
                first_rev = resp.header().map(|h| h.revision()).unwrap_or(0);
            }
            counter!("client_get_pages_total", 1u64);
            histogram!("client_get_page_kvs", resp.kvs().len() as f64);
            for item in resp.kvs() {
                on_kv(&to_key_value(item, opts.keys_only))?;
            }
            if !resp.more() {
                break;
            }
            match resp.kvs().last() {
                Some(last) => start = key::next_key(last.key()),
                None => break,
            }
        }
        Ok(first_rev)
    }

    async fn put(&self, ctx: &CancellationToken, prefix: &str, value: Vec<u8>, opts: OpOptions) -> Result<()> {
        let (target, point) = opts.key_for(prefix);
        if !point {
            bail!("put requires a resource and name");
        }
        if ctx.is_cancelled() {
            bail!("put cancelled");
        }
        let mut kv_client = self.client.kv_client();
        kv_client
            .put(target.as_str(), value, None)
            .await
            .with_context(|| format!("putting {target}"))?;
        counter!("client_puts_total", 1u64);
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
        let mut kv_client = self.client.kv_client();
        kv_client
            .delete(target.as_str(), Some(DeleteOptions::new()))
            .await
            .with_context(|| format!("deleting {target}"))?;
        counter!("client_deletes_total", 1u64);
        Ok(())
    }

    async fn watch(
        &self,
        ctx: &CancellationToken,
        prefix: &str,
        opts: OpOptions,
        on_kv: &mut OnResponse<'_>,
    ) -> Result<()> {
        let mut watch_client = self.client.watch_client();
        let (target, point) = opts.key_for(prefix);
        let mut watch_opts = WatchOptions::new().with_prev_key();
        if !point {
            watch_opts = watch_opts.with_range(key::prefix_range_end(&target));
        }
        if opts.revision > 0 {
            watch_opts = watch_opts.with_start_revision(opts.revision);
        }
        let (mut watcher, mut stream) = watch_client
            .watch(target.as_str(), Some(watch_opts))
            .await
            .context("starting watch")?;
        debug!(target = %target, revision = opts.revision, "watch started");

        loop {
            let message = tokio::select! {
                _ = ctx.cancelled() => {
                    let _ = watcher.cancel().await;
                    return Ok(());
                }
                message = stream.message() => message,
            };
            let resp = match message {
                Ok(Some(resp)) => resp,
                Ok(None) => {
                    return Err(Error::WatchLost { reason: "stream closed by server".into() }.into())
                }
                Err(err) => return Err(Error::WatchLost { reason: err.to_string() }.into()),
            };
            if resp.compact_revision() > 0 {
                return Err(Error::WatchCompacted { compact_revision: resp.compact_revision() }.into());
            }
            if resp.canceled() {
                return Err(Error::WatchLost { reason: "watch cancelled by server".into() }.into());
            }
            for event in resp.events() {
                let Some(kv) = event.kv() else { continue };
                counter!("client_watch_events_total", 1u64);
                let mapped = KeyValue {
                    key: String::from_utf8_lossy(kv.key()).into_owned(),
                    value: match event.event_type() {
                        etcd_client::EventType::Put => Some(kv.value().to_vec()),
                        etcd_client::EventType::Delete => None,
                    },
                    prev_value: event.prev_kv().map(|p| p.value().to_vec()),
                    revision: kv.mod_revision(),
                };
                on_kv(&mapped)?;
            }
        }
    }
}
