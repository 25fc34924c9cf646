//! Raw WebSocket transport

use std::io;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

use hb_core::error::TransportError;
use hb_protocol::InboundFrame;

use super::LinkTask;

/// Drive a WebSocket link until it closes or is cancelled
pub(crate) async fn run(url: String, open_timeout: Duration, mut task: LinkTask) {
    tracing::debug!("Opening {} link to {}", task.kind, url);

    let connect = tokio::time::timeout(open_timeout, tokio_tungstenite::connect_async(url.as_str()));
    let stream = tokio::select! {
        _ = task.cancel.cancelled() => {
            tracing::trace!("{} link cancelled before open", task.kind);
            task.report_closed().await;
            return;
        }
        result = connect => match result {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                let err = open_error(&url, e);
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
        return;
    }

    let (mut sink, mut source) = stream.split();

    let notify_peer = loop {
        tokio::select! {
            // Drain pending output before honouring a close so a final
            // flush still reaches the daemon.
            biased;

            payload = task.outbound.recv() => {
                let Some(payload) = payload else { break true };
                let text = String::from_utf8_lossy(&payload).into_owned();
                if let Err(e) = sink.send(WsMessage::Text(text)).await {
                    tracing::debug!("{} link send failed: {}", task.kind, e);
                    break false;
                }
            }

            _ = task.cancel.cancelled() => break true,

            message = source.next() => match message {
                Some(Ok(WsMessage::Text(text))) => {
                    if !forward(&task, text.as_bytes()).await {
                        break true;
                    }
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    if !forward(&task, &data).await {
                        break true;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    tracing::debug!("{} link closed by daemon", task.kind);
                    break false;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("{} link error: {}", task.kind, e);
                    break false;
                }
            },
        }
    };

    if notify_peer {
        let _ = sink.send(WsMessage::Close(None)).await;
    }

    task.report_closed().await;
}

/// Classify a failed WebSocket open
fn open_error(url: &str, err: WsError) -> TransportError {
    match err {
        WsError::Io(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
            TransportError::Refused(url.to_string())
        }
        WsError::Io(e) => TransportError::Io(e),
        other => TransportError::Handshake(other.to_string()),
    }
}

/// Parse and report one inbound frame; false once the session is gone
async fn forward(task: &LinkTask, data: &[u8]) -> bool {
    match InboundFrame::parse(data) {
        Ok(frame) => task.report_frame(frame).await,
        Err(e) => {
            tracing::warn!("Dropping malformed frame on {} link: {}", task.kind, e);
            true
        }
    }
}
