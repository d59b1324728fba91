use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use streamgate_core::{error::DeliveryError, ConnectionRegistry, DownstreamClient, StreamError, SubscribeParams};
use streamgate_observability::GatewayMetrics;
use streamgate_registry::{MemoryStorage, SchemaRegistry};
use streamgate_stream::{
    BroadcastRouter, ClientHub, FilterPolicy, FilterRequest, MemoryStreams, SubscriptionRegistry,
};
use tokio::sync::mpsc::Receiver;

struct Harness {
    streams: Arc<MemoryStreams>,
    registry: Arc<SchemaRegistry>,
    hub: Arc<ClientHub>,
    metrics: GatewayMetrics,
    subs: SubscriptionRegistry,
}

async fn harness() -> Harness {
    let streams = Arc::new(MemoryStreams::with_publisher("0xpub"));
    let registry = Arc::new(
        SchemaRegistry::open(
            Arc::new(MemoryStorage::new()),
            streams.clone(),
            Duration::from_secs(2),
        )
        .await
        .unwrap(),
    );
    let hub = Arc::new(ClientHub::new());
    let metrics = GatewayMetrics::new();
    let router = Arc::new(BroadcastRouter::new(
        hub.clone(),
        registry.clone(),
        metrics.clone(),
    ));
    let subs = SubscriptionRegistry::new(streams.clone(), router, Duration::from_secs(2));
    Harness {
        streams,
        registry,
        hub,
        metrics,
        subs,
    }
}

async fn next_frame(rx: &mut Receiver<String>) -> Value {
    let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("client channel closed");
    serde_json::from_str(&frame).unwrap()
}

fn marker() -> Value {
    json!({ "marker": true })
}

#[tokio::test]
async fn latest_only_uses_snapshot_taken_at_creation() {
    let h = harness().await;
    let a = h.registry.register_version("L", "1", "uint8 a", None, true).await.unwrap();
    let b = h.registry.register_version("L", "2", "uint16 a", None, true).await.unwrap();

    let policy = FilterPolicy::snapshot(
        FilterRequest {
            latest_only: true,
            labels: vec!["L".into()],
            ..Default::default()
        },
        &h.registry,
    );
    h.subs.create(policy, SubscribeParams::default()).await.unwrap();
    h.registry.set_latest("L", "2").await.unwrap();

    let (_, mut rx) = h.hub.register();
    h.streams.emit(json!({ "schemaId": b.schema_id }));
    h.streams.emit(json!({ "stream": { "schemaId": a.schema_id.to_uppercase() } }));

    let frame = next_frame(&mut rx).await;
    assert_eq!(frame["type"], "event");
    assert_eq!(frame["data"]["stream"]["schemaId"], a.schema_id.to_uppercase());
    assert_eq!(h.metrics.snapshot().filtered_not_latest, 1);
}

#[tokio::test]
async fn exclude_deprecated_ignores_identifier_casing() {
    let h = harness().await;
    let v1 = h.registry.register_version("temp", "1", "uint256 value", None, true).await.unwrap();
    h.registry.deprecate("temp", "1", true).await.unwrap();

    let policy = FilterPolicy::snapshot(
        FilterRequest {
            exclude_deprecated: true,
            ..Default::default()
        },
        &h.registry,
    );
    h.subs.create(policy, SubscribeParams::default()).await.unwrap();

    let (_, mut rx) = h.hub.register();
    h.streams.emit(json!({ "data": { "schemaId": v1.schema_id.to_uppercase() } }));
    h.streams.emit(marker());

    assert_eq!(next_frame(&mut rx).await["data"], marker());
    assert_eq!(h.metrics.snapshot().filtered_deprecated, 1);
}

#[tokio::test]
async fn events_keep_upstream_order() {
    let h = harness().await;
    h.subs
        .create(FilterPolicy::pass_all(), SubscribeParams::default())
        .await
        .unwrap();
    let (_, mut rx) = h.hub.register();
    for n in 0..20 {
        h.streams.emit(json!({ "n": n }));
    }
    for n in 0..20 {
        assert_eq!(next_frame(&mut rx).await["data"]["n"], n);
    }
}

struct DeadClient;

impl DownstreamClient for DeadClient {
    fn id(&self) -> u64 {
        0
    }

    fn send(&self, _: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::Disconnected { id: 0 })
    }
}

struct WithDeadClient(Arc<ClientHub>);

impl ConnectionRegistry for WithDeadClient {
    fn snapshot(&self) -> Vec<Arc<dyn DownstreamClient>> {
        let mut clients: Vec<Arc<dyn DownstreamClient>> = vec![Arc::new(DeadClient)];
        clients.extend(self.0.snapshot());
        clients
    }
}

#[tokio::test]
async fn dead_client_does_not_block_others() {
    let h = harness().await;
    let metrics = GatewayMetrics::new();
    let router = BroadcastRouter::new(
        Arc::new(WithDeadClient(h.hub.clone())),
        h.registry.clone(),
        metrics.clone(),
    );
    let (_, mut rx1) = h.hub.register();
    let (_, mut rx2) = h.hub.register();

    let delivered = router.broadcast(&json!({ "type": "event", "data": 1 }));
    assert_eq!(delivered, 2);
    assert_eq!(next_frame(&mut rx1).await["data"], 1);
    assert_eq!(next_frame(&mut rx2).await["data"], 1);
    assert_eq!(metrics.snapshot().delivery_failures, 1);
}

#[tokio::test]
async fn cancel_twice_reports_not_found() {
    let h = harness().await;
    let id = h
        .subs
        .create(FilterPolicy::pass_all(), SubscribeParams::default())
        .await
        .unwrap();
    assert_eq!(h.subs.list(), vec![id.clone()]);

    h.subs.cancel(&id).unwrap();
    assert!(matches!(
        h.subs.cancel(&id),
        Err(StreamError::SubscriptionNotFound { .. })
    ));
    assert!(matches!(
        h.subs.cancel("unknown"),
        Err(StreamError::SubscriptionNotFound { .. })
    ));
    assert!(h.subs.is_empty());
    assert_eq!(h.streams.open_feeds(), 0);
}

#[tokio::test]
async fn failed_cancel_keeps_subscription() {
    let h = harness().await;
    let id = h
        .subs
        .create(FilterPolicy::pass_all(), SubscribeParams::default())
        .await
        .unwrap();

    h.streams.set_fail_cancel(true);
    assert!(matches!(h.subs.cancel(&id), Err(StreamError::Remote(_))));
    assert_eq!(h.subs.list(), vec![id.clone()]);

    h.streams.set_fail_cancel(false);
    h.subs.cancel(&id).unwrap();
    assert!(h.subs.is_empty());
}

#[tokio::test]
async fn ids_are_unique_and_listed_in_creation_order() {
    let h = harness().await;
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(
            h.subs
                .create(FilterPolicy::pass_all(), SubscribeParams::default())
                .await
                .unwrap(),
        );
    }
    assert_eq!(h.subs.list(), ids);
    h.subs.cancel(&ids[1]).unwrap();
    assert_eq!(h.subs.list(), vec![ids[0].clone(), ids[2].clone()]);

    h.subs.cancel_all();
    assert!(h.subs.is_empty());
    assert_eq!(h.streams.open_feeds(), 0);
}

#[tokio::test]
async fn ended_feed_leaves_the_registry() {
    let h = harness().await;
    let id = h
        .subs
        .create(FilterPolicy::pass_all(), SubscribeParams::default())
        .await
        .unwrap();
    assert_eq!(h.subs.list(), vec![id.clone()]);

    h.streams.close_feeds();
    tokio::time::timeout(Duration::from_secs(2), async {
        while !h.subs.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscription not removed after its feed ended");
    assert!(matches!(
        h.subs.cancel(&id),
        Err(StreamError::SubscriptionNotFound { .. })
    ));
}
