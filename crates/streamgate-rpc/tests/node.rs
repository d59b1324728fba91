//! Client behaviour against a minimal in-process JSON-RPC node.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{json, Value};
use streamgate_core::{RemoteError, StreamsClient, SubscribeParams};
use streamgate_rpc::{RpcClientConfig, RpcStreamsClient};

fn reply(id: &Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn failure(id: &Value, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

async fn rpc(Json(req): Json<Value>) -> Json<Value> {
    let id = &req["id"];
    let params = &req["params"];
    Json(match req["method"].as_str().unwrap_or_default() {
        "streams_computeSchemaId" => reply(id, json!(format!("0xid:{}", params[0].as_str().unwrap_or("")))),
        "streams_registerDataSchemas" => reply(id, json!(params[0].as_array().map(Vec::len))),
        "streams_getByKey" => reply(id, params.clone()),
        "streams_set" => failure(id, -32000, "execution reverted"),
        _ => failure(id, -32601, "method not found"),
    })
}

async fn ws(upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(feed)
}

async fn feed(mut socket: WebSocket) {
    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else { continue };
        let Ok(req) = serde_json::from_str::<Value>(&text) else { continue };
        let id = &req["id"];
        let frames = match req["method"].as_str() {
            Some("streams_subscribe") if req["params"][0]["somniaStreamsEventId"] == "bad" => {
                vec![failure(id, -32602, "unknown event")]
            }
            Some("streams_subscribe") => {
                let mut frames = vec![reply(id, json!("0xsub"))];
                frames.push(json!({
                    "jsonrpc": "2.0",
                    "method": "streams_subscription",
                    "params": { "subscription": "0xother", "result": { "n": -1 } }
                }));
                for n in 0..3 {
                    frames.push(json!({
                        "jsonrpc": "2.0",
                        "method": "streams_subscription",
                        "params": { "subscription": "0xsub", "result": { "n": n } }
                    }));
                }
                frames
            }
            Some("streams_unsubscribe") => vec![reply(id, json!(true))],
            _ => vec![],
        };
        for frame in frames {
            if socket.send(Message::Text(frame.to_string())).await.is_err() {
                return;
            }
        }
    }
}

async fn spawn_node() -> SocketAddr {
    let app = Router::new().route("/", post(rpc)).route("/ws", get(ws));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, with_ws: bool) -> RpcStreamsClient {
    RpcStreamsClient::new(RpcClientConfig {
        rpc_url: format!("http://{addr}/"),
        streams_url: with_ws.then(|| format!("ws://{addr}/ws")),
        publisher: Some("0xpub".into()),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn calls_return_results_and_forward_node_errors() {
    let addr = spawn_node().await;
    let c = client(addr, false);

    assert_eq!(c.compute_schema_id("uint8 a").await.unwrap(), "0xid:uint8 a");
    assert_eq!(
        c.fetch_by_key("0x1", "0xpub", "0x2").await.unwrap(),
        json!(["0x1", "0xpub", "0x2"])
    );

    let err = c.submit_records(vec![]).await.unwrap_err();
    assert_eq!(
        err,
        RemoteError::Rpc {
            code: -32000,
            message: "execution reverted".into()
        }
    );
}

#[tokio::test]
async fn subscription_forwards_own_notifications_until_cancelled() {
    let addr = spawn_node().await;
    let c = client(addr, true);

    let mut feed = c.subscribe(SubscribeParams::default()).await.unwrap();
    for n in 0..3 {
        let event = tokio::time::timeout(Duration::from_secs(2), feed.events.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(event["n"], n);
    }

    feed.cancel.cancel().unwrap();
    feed.cancel.cancel().unwrap();
    let end = tokio::time::timeout(Duration::from_secs(2), feed.events.next())
        .await
        .unwrap();
    assert!(end.is_none());
}

#[tokio::test]
async fn rejected_subscription_surfaces_rpc_error() {
    let addr = spawn_node().await;
    let c = client(addr, true);
    let params = SubscribeParams {
        event_id: Some("bad".into()),
        ..SubscribeParams::default()
    };
    let err = c.subscribe(params).await.unwrap_err();
    assert!(matches!(err, RemoteError::Rpc { code: -32602, .. }));
}

#[tokio::test]
async fn subscribe_requires_streams_url() {
    let addr = spawn_node().await;
    let err = client(addr, false)
        .subscribe(SubscribeParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Other(_)));
}

#[test]
fn invalid_rpc_url_is_rejected() {
    let result = RpcStreamsClient::new(RpcClientConfig {
        rpc_url: "not a url".into(),
        streams_url: None,
        publisher: None,
        request_timeout: Duration::from_secs(1),
    });
    assert!(matches!(result, Err(RemoteError::Transport(_))));
}
