//! One upstream subscription over its own WebSocket connection.

use futures::{channel::mpsc, SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use streamgate_core::{CancelHandle, RemoteError, UpstreamFeed};
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::request::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RpcId};

const SUBSCRIBE_ID: u64 = 1;
const UNSUBSCRIBE_ID: u64 = 2;

pub const SUBSCRIBE_METHOD: &str = "streams_subscribe";
pub const UNSUBSCRIBE_METHOD: &str = "streams_unsubscribe";
pub const NOTIFICATION_METHOD: &str = "streams_subscription";

type EventSender = mpsc::UnboundedSender<Result<Value, RemoteError>>;

/// Stops the background task of one feed. Cancelling twice is a no-op.
struct WsCancel {
    stop: Mutex<Option<oneshot::Sender<()>>>,
}

impl CancelHandle for WsCancel {
    fn cancel(&self) -> Result<(), RemoteError> {
        if let Some(stop) = self.stop.lock().take() {
            // The task may already have exited on its own.
            let _ = stop.send(());
        }
        Ok(())
    }
}

/// Opens WebSocket subscriptions against a streams node.
pub struct WsFeed;

impl WsFeed {
    /// Connect, subscribe with `params`, and wait for the node to confirm.
    ///
    /// The returned feed yields `params.result` of every matching
    /// notification. A dropped connection ends the feed with
    /// [`RemoteError::Closed`].
    pub async fn open(url: &str, params: Value) -> Result<UpstreamFeed, RemoteError> {
        let (events_tx, events_rx) = mpsc::unbounded();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        tokio::spawn(run_feed(url.to_string(), params, ready_tx, events_tx, stop_rx));

        ready_rx.await.map_err(|_| RemoteError::Closed)??;
        Ok(UpstreamFeed {
            events: Box::pin(events_rx),
            cancel: Box::new(WsCancel {
                stop: Mutex::new(Some(stop_tx)),
            }),
        })
    }
}

fn send_ready(ready: &mut Option<oneshot::Sender<Result<(), RemoteError>>>, r: Result<(), RemoteError>) {
    if let Some(tx) = ready.take() {
        let _ = tx.send(r);
    }
}

/// Background task that owns the WebSocket connection of one feed.
async fn run_feed(
    url: String,
    params: Value,
    ready: oneshot::Sender<Result<(), RemoteError>>,
    mut events: EventSender,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ready = Some(ready);

    let (mut sink, mut stream) = match connect_async(url.as_str()).await {
        Ok((ws, _)) => ws.split(),
        Err(e) => {
            warn!(url = %url, error = %e, "WS connect failed");
            send_ready(&mut ready, Err(RemoteError::Transport(e.to_string())));
            return;
        }
    };

    let sub_req = JsonRpcRequest::new(SUBSCRIBE_ID, SUBSCRIBE_METHOD, vec![params]);
    let sent = match serde_json::to_string(&sub_req) {
        Ok(msg) => sink.send(Message::Text(msg.into())).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    if let Err(e) = sent {
        send_ready(&mut ready, Err(RemoteError::Transport(e)));
        return;
    }

    let mut subscription: Option<String> = None;

    loop {
        tokio::select! {
            _ = &mut stop => {
                if let Some(sub) = &subscription {
                    let req = JsonRpcRequest::new(UNSUBSCRIBE_ID, UNSUBSCRIBE_METHOD, vec![Value::String(sub.clone())]);
                    if let Ok(msg) = serde_json::to_string(&req) {
                        let _ = sink.send(Message::Text(msg.into())).await;
                    }
                }
                let _ = sink.close().await;
                debug!(url = %url, "feed cancelled");
                return;
            }
            msg = stream.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        info!(url = %url, "WS feed closed by node");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(url = %url, error = %e, "WS receive error");
                        break;
                    }
                };
                match classify(text.as_str(), subscription.as_deref()) {
                    Frame::Confirmed(id) => {
                        debug!(subscription = %id, "upstream subscription confirmed");
                        subscription = Some(id);
                        send_ready(&mut ready, Ok(()));
                    }
                    Frame::Rejected(e) => {
                        send_ready(&mut ready, Err(e));
                        return;
                    }
                    Frame::Event(payload) => {
                        if events.send(Ok(payload)).await.is_err() {
                            return;
                        }
                    }
                    Frame::Ignored => {}
                }
            }
        }
    }

    if ready.is_some() {
        send_ready(&mut ready, Err(RemoteError::Closed));
    } else {
        let _ = events.send(Err(RemoteError::Closed)).await;
    }
}

#[derive(Debug, PartialEq)]
enum Frame {
    Confirmed(String),
    Rejected(RemoteError),
    Event(Value),
    Ignored,
}

/// Sort one inbound text frame. Before confirmation only the subscribe
/// response matters; afterwards only notifications for our subscription.
fn classify(text: &str, subscription: Option<&str>) -> Frame {
    match subscription {
        None => {
            let Ok(resp) = serde_json::from_str::<JsonRpcResponse>(text) else {
                return Frame::Ignored;
            };
            if resp.id != RpcId::Number(SUBSCRIBE_ID) {
                return Frame::Ignored;
            }
            match resp.into_result() {
                Ok(Value::String(id)) => Frame::Confirmed(id),
                Ok(Value::Number(n)) => Frame::Confirmed(n.to_string()),
                Ok(other) => Frame::Rejected(RemoteError::Transport(format!(
                    "unexpected subscription id {other}"
                ))),
                Err(e) => Frame::Rejected(e),
            }
        }
        Some(ours) => match serde_json::from_str::<JsonRpcNotification>(text) {
            Ok(n) if n.method == NOTIFICATION_METHOD && n.params.subscription == ours => {
                Frame::Event(n.params.result)
            }
            _ => Frame::Ignored,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscribe_response_confirms_or_rejects() {
        assert_eq!(
            classify(r#"{"jsonrpc":"2.0","id":1,"result":"0xabc"}"#, None),
            Frame::Confirmed("0xabc".into())
        );
        assert!(matches!(
            classify(
                r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"bad params"}}"#,
                None
            ),
            Frame::Rejected(RemoteError::Rpc { code: -32602, .. })
        ));
        assert_eq!(
            classify(r#"{"jsonrpc":"2.0","id":5,"result":"0xabc"}"#, None),
            Frame::Ignored
        );
    }

    #[test]
    fn notifications_for_other_subscriptions_are_ignored() {
        let ours = r#"{"jsonrpc":"2.0","method":"streams_subscription","params":{"subscription":"0xabc","result":{"n":1}}}"#;
        let theirs = r#"{"jsonrpc":"2.0","method":"streams_subscription","params":{"subscription":"0xdef","result":{"n":2}}}"#;
        assert_eq!(classify(ours, Some("0xabc")), Frame::Event(json!({"n": 1})));
        assert_eq!(classify(theirs, Some("0xabc")), Frame::Ignored);
        assert_eq!(classify("not json", Some("0xabc")), Frame::Ignored);
    }
}
