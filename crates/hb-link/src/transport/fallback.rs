//! Socket.IO transport
//!
//! Frames travel as the argument of `message` events. The client's own
//! reconnection is off: the session owns every retry. On a constrained host
//! the link is pinned to HTTP long-polling. Closing emits a `close` event
//! before disconnecting.

use std::time::Duration;

use futures::FutureExt;
use rust_socketio::asynchronous::{Client, ClientBuilder};
use rust_socketio::{Event, Payload, TransportType};
use serde_json::Value;
use tokio::sync::mpsc;

use hb_core::error::TransportError;
use hb_protocol::InboundFrame;

use super::LinkTask;

/// Event name frames travel under, both directions
const MESSAGE_EVENT: &str = "message";

/// Event telling the daemon this side is going away
const CLOSE_EVENT: &str = "close";

/// What the client callbacks forward to the link task
#[derive(Debug)]
enum SocketEvent {
    Message(Payload),
    Closed,
}

/// Transport the client may use
fn transport_type(polling_only: bool) -> TransportType {
    if polling_only {
        TransportType::Polling
    } else {
        TransportType::Any
    }
}

/// Drive a Socket.IO link until it closes or is cancelled
pub(crate) async fn run(url: String, polling_only: bool, open_timeout: Duration, mut task: LinkTask) {
    tracing::debug!(
        "Opening {} link to {} (polling only: {})",
        task.kind,
        url,
        polling_only
    );

    let (inbound_tx, mut inbound) = mpsc::unbounded_channel();
    let on_message = inbound_tx.clone();
    let on_close = inbound_tx;

    let connect = ClientBuilder::new(url.as_str())
        .transport_type(transport_type(polling_only))
        .reconnect(false)
        .reconnect_on_disconnect(false)
        .on(Event::Message, move |payload: Payload, _: Client| {
            let _ = on_message.send(SocketEvent::Message(payload));
            async {}.boxed()
        })
        .on(Event::Close, move |_: Payload, _: Client| {
            let _ = on_close.send(SocketEvent::Closed);
            async {}.boxed()
        })
        .on(Event::Error, |payload: Payload, _: Client| {
            async move { tracing::debug!("Socket.IO client error: {:?}", payload) }.boxed()
        })
        .connect();

    let client = tokio::select! {
        _ = task.cancel.cancelled() => {
            tracing::trace!("{} link cancelled before open", task.kind);
            task.report_closed().await;
            return;
        }
        result = tokio::time::timeout(open_timeout, connect) => match result {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => {
                let err = TransportError::Handshake(e.to_string());
                tracing::debug!("{} link to {} failed: {}", task.kind, url, err);
                task.report_closed().await;
                return;
            }
            Err(_) => {
                let err = TransportError::Timeout(open_timeout);
                tracing::debug!("{} link to {} failed: {}", task.kind, url, err);
                task.report_closed().await;
                return;
            }
        },
    };

    if !task.report_opened().await {
        let _ = client.disconnect().await;
        return;
    }

    // Break value: whether the daemon should be told we are closing
    let notify_peer = loop {
        tokio::select! {
            biased;

            payload = task.outbound.recv() => {
                let Some(payload) = payload else { break true };
                let text = String::from_utf8_lossy(&payload).into_owned();
                if let Err(e) = client.emit(MESSAGE_EVENT, Payload::Text(vec![Value::String(text)])).await {
                    tracing::debug!("{} link send failed: {}", task.kind, e);
                    break false;
                }
            }

            _ = task.cancel.cancelled() => break true,

            event = inbound.recv() => match event {
                Some(SocketEvent::Message(payload)) => {
                    for frame in frames(payload) {
                        match frame {
                            Ok(frame) => {
                                if !task.report_frame(frame).await {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Dropping malformed frame on {} link: {}", task.kind, e);
                            }
                        }
                    }
                    if task.events.is_closed() {
                        break true;
                    }
                }
                Some(SocketEvent::Closed) | None => {
                    tracing::debug!("{} link closed by daemon", task.kind);
                    break false;
                }
            },
        }
    };

    if notify_peer {
        if let Err(e) = client.emit(CLOSE_EVENT, Payload::Text(Vec::new())).await {
            tracing::trace!("{} link close notification failed: {}", task.kind, e);
        }
    }
    if let Err(e) = client.disconnect().await {
        tracing::trace!("{} link disconnect failed: {}", task.kind, e);
    }

    task.report_closed().await;
}

/// Decode the arguments of one `message` event
///
/// The daemon sends each frame as serialized JSON text; plain objects are
/// accepted too. Binary attachments carry no frames.
#[allow(deprecated)]
fn frames(payload: Payload) -> Vec<Result<InboundFrame, hb_protocol::ProtocolError>> {
    match payload {
        Payload::Text(values) => values.into_iter().map(InboundFrame::from_value).collect(),
        Payload::String(text) => vec![InboundFrame::parse(text.as_bytes())],
        Payload::Binary(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constrained_host_pins_polling() {
        assert!(matches!(transport_type(true), TransportType::Polling));
        assert!(matches!(transport_type(false), TransportType::Any));
    }

    #[test]
    fn test_message_arguments_decode_to_frames() {
        let payload = Payload::Text(vec![
            json!(r#"{"company":2,"model":4}"#),
            json!({"company": 5, "model": 1, "IR1": 12}),
            json!(3),
        ]);

        let decoded = frames(payload);
        assert_eq!(decoded.len(), 3);
        assert_eq!(
            decoded[0].as_ref().unwrap().device_key().as_deref(),
            Some("24")
        );
        assert_eq!(
            decoded[1].as_ref().unwrap().device_key().as_deref(),
            Some("51")
        );
        assert!(decoded[2].is_err());
    }

    #[test]
    fn test_binary_attachment_carries_no_frames() {
        let payload = Payload::Binary(bytes::Bytes::from_static(b"\x00\x01"));
        assert!(frames(payload).is_empty());
    }
}
