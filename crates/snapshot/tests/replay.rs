#![forbid(unsafe_code)]

use kectl_client::{Client, MemClient, OpOptions};
use kectl_core::action::{PatchMethod, ResourcePatch};
use kectl_core::{GroupResource, GroupVersionResource, ObjectRef};
use kectl_snapshot::stream::{Decoder, Encoder};
use kectl_snapshot::{handle::Handle, Loader};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn configmap(name: &str, value: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": name, "namespace": "default" },
        "data": { "value": value }
    })
}

fn patch(method: PatchMethod, name: &str, template: Value, nanos: i64) -> ResourcePatch {
    let mut rp = ResourcePatch::new(
        GroupVersionResource::new("", "v1", "configmaps"),
        ObjectRef::new(name, "default"),
        method,
    );
    if !template.is_null() {
        rp.template = serde_json::to_string(&template).unwrap();
    }
    rp.duration_nanosecond = nanos;
    rp
}

fn timeline(snapshot: &[Value], patches: &[ResourcePatch]) -> Decoder {
    let mut enc = Encoder::new(Vec::new());
    for obj in snapshot {
        enc.encode(obj).unwrap();
    }
    for rp in patches {
        enc.encode(rp).unwrap();
    }
    Decoder::new(std::io::Cursor::new(enc.into_inner()))
}

fn stored(client: &MemClient, name: &str) -> Option<Value> {
    client
        .contents()
        .get(&format!("/registry/configmaps/default/{name}"))
        .map(|raw| serde_json::from_slice(raw).unwrap())
}

#[tokio::test]
async fn load_applies_snapshot_and_stops_at_first_patch() {
    let client = MemClient::new();
    let ctx = CancellationToken::new();
    let mut dec = timeline(
        &[configmap("a", "1"), configmap("b", "2")],
        &[patch(PatchMethod::Delete, "a", Value::Null, 0)],
    );

    let mut loader = Loader::new(client.clone(), "/registry");
    loader.load(&ctx, &mut dec).await.unwrap();

    assert_eq!(client.contents().len(), 2);
    assert_eq!(stored(&client, "a").unwrap()["data"]["value"], "1");

    // The sentinel is still in the stream for the replay phase.
    loader.replay(&ctx, &mut dec).await.unwrap();
    assert!(stored(&client, "a").is_none());
    assert!(stored(&client, "b").is_some());
}

#[tokio::test]
async fn replay_applies_create_patch_delete() {
    let client = MemClient::new();
    let ctx = CancellationToken::new();
    let mut dec = timeline(
        &[configmap("a", "1")],
        &[
            patch(PatchMethod::Create, "b", configmap("b", "fresh"), 0),
            patch(PatchMethod::Patch, "a", json!({ "data": { "value": "updated" } }), 1),
            patch(PatchMethod::Delete, "b", Value::Null, 2),
        ],
    );

    let mut loader = Loader::new(client.clone(), "/registry").with_window(4);
    loader.load(&ctx, &mut dec).await.unwrap();
    loader.replay(&ctx, &mut dec).await.unwrap();

    assert_eq!(stored(&client, "a").unwrap()["data"]["value"], "updated");
    assert!(stored(&client, "b").is_none());
}

#[tokio::test]
async fn patch_from_tracked_cache_issues_no_get() {
    let client = MemClient::new();
    let ctx = CancellationToken::new();
    let mut dec = timeline(
        &[configmap("a", "1")],
        &[patch(PatchMethod::Patch, "a", json!({ "data": { "value": "2" } }), 0)],
    );

    let mut loader = Loader::new(client.clone(), "/registry");
    loader.load(&ctx, &mut dec).await.unwrap();
    loader.replay(&ctx, &mut dec).await.unwrap();

    assert_eq!(client.get_calls(), 0);
    assert_eq!(stored(&client, "a").unwrap()["data"]["value"], "2");
}

#[tokio::test]
async fn patch_on_untracked_object_falls_back_to_live_get() {
    let client = MemClient::new();
    let ctx = CancellationToken::new();

    // Object exists in the store but not in this loader's cache.
    let opts = OpOptions::default()
        .with_group_resource(GroupResource::new("", "configmaps"))
        .with_name("orphan", "default");
    client
        .put(&ctx, "/registry", serde_json::to_vec(&configmap("orphan", "live")).unwrap(), opts)
        .await
        .unwrap();

    let mut dec = timeline(
        &[],
        &[patch(PatchMethod::Patch, "orphan", json!({ "data": { "value": "patched" } }), 0)],
    );
    let mut loader = Loader::new(client.clone(), "/registry");
    loader.load(&ctx, &mut dec).await.unwrap();
    loader.replay(&ctx, &mut dec).await.unwrap();

    assert_eq!(client.get_calls(), 1);
    assert_eq!(stored(&client, "orphan").unwrap()["data"]["value"], "patched");
}

#[tokio::test]
async fn out_of_order_events_apply_in_duration_order() {
    let client = MemClient::new();
    let ctx = CancellationToken::new();
    // Durations arrive as [0, 2, 1, 3]; the window must reorder them.
    let mut dec = timeline(
        &[],
        &[
            patch(PatchMethod::Create, "t0", configmap("t0", "x"), 0),
            patch(PatchMethod::Create, "t2", configmap("t2", "x"), 2),
            patch(PatchMethod::Create, "t1", configmap("t1", "x"), 1),
            patch(PatchMethod::Create, "t3", configmap("t3", "x"), 3),
        ],
    );

    let mut loader = Loader::new(client.clone(), "/registry").with_window(4);
    loader.load(&ctx, &mut dec).await.unwrap();
    loader.replay(&ctx, &mut dec).await.unwrap();

    let order: Vec<String> = client
        .history()
        .iter()
        .map(|kv| kv.key.rsplit('/').next().unwrap().to_string())
        .collect();
    assert_eq!(order, vec!["t0", "t1", "t2", "t3"]);
}

#[tokio::test]
async fn pause_blocks_writes_until_resume() {
    let client = MemClient::new();
    let ctx = CancellationToken::new();
    let mut dec = timeline(&[], &[patch(PatchMethod::Create, "a", configmap("a", "1"), 0)]);

    let handle = Arc::new(Handle::new());
    handle.pause();
    let mut loader = Loader::new(client.clone(), "/registry");
    loader.attach_handle(handle.clone());
    loader.load(&ctx, &mut dec).await.unwrap();

    let observer = client.clone();
    let controller_handle = handle.clone();
    let replay = async { loader.replay(&ctx, &mut dec).await.unwrap() };
    let controller = async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(observer.history().is_empty(), "no writes may happen while paused");
        controller_handle.resume();
    };
    tokio::join!(replay, controller);

    assert_eq!(client.history().len(), 1);
}

#[tokio::test]
async fn malformed_documents_are_skipped() {
    let client = MemClient::new();
    let ctx = CancellationToken::new();

    let mut enc = Encoder::new(Vec::new());
    enc.encode(&configmap("a", "1")).unwrap();
    let mut bytes = enc.into_inner();
    bytes.extend_from_slice(b"---\n- just\n- a\n- list\n");
    let mut enc = Encoder::new(bytes);
    enc.encode(&patch(PatchMethod::Create, "b", configmap("b", "2"), 0)).unwrap();
    let mut dec = Decoder::new(std::io::Cursor::new(enc.into_inner()));

    let mut loader = Loader::new(client.clone(), "/registry");
    loader.load(&ctx, &mut dec).await.unwrap();
    loader.replay(&ctx, &mut dec).await.unwrap();

    assert!(stored(&client, "a").is_some());
    assert!(stored(&client, "b").is_some());
}
