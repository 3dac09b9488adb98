//! WebSocket event pump with reconnect backoff.

use crate::config::ReconnectConfig;
use futures_util::StreamExt;
use muster_core::SessionEvent;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

/// Connect to the session event endpoint and broadcast decoded lifecycle
/// events until the process ends, reconnecting with jittered backoff.
pub(crate) fn spawn_event_pump(
    ws_endpoint: String,
    reconnect: ReconnectConfig,
    sender: broadcast::Sender<SessionEvent>,
) {
    tokio::spawn(async move {
        let mut backoff = reconnect.initial_ms;
        loop {
            match tokio_tungstenite::connect_async(ws_endpoint.as_str()).await {
                Ok((mut stream, _)) => {
                    tracing::debug!("session event stream connected");
                    backoff = reconnect.initial_ms;

                    while let Some(message) = stream.next().await {
                        match message {
                            Ok(Message::Text(text)) => {
                                if let Some(event) = decode_frame(&text) {
                                    let _ = sender.send(event);
                                }
                            }
                            Ok(Message::Binary(_)) => {}
                            Ok(Message::Close(_)) => break,
                            Ok(_) => {}
                            Err(err) => {
                                tracing::warn!(error = %err, "session event stream error");
                                break;
                            }
                        }
                    }

                    tracing::debug!("session event stream disconnected");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "session event stream connect failed");
                }
            }

            let delay = jittered_backoff(backoff, reconnect.jitter_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let next = (backoff as f64 * reconnect.multiplier) as u64;
            backoff = next.min(reconnect.max_ms);
        }
    });
}

/// Decode one text frame. Malformed frames are dropped, never propagated;
/// the pump and its subscribers keep running.
fn decode_frame(text: &str) -> Option<SessionEvent> {
    match serde_json::from_str::<SessionEvent>(text) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::warn!(error = %err, "dropping malformed session event frame");
            None
        }
    }
}

fn jittered_backoff(base_ms: u64, jitter_ms: u64) -> u64 {
    if jitter_ms == 0 {
        return base_ms;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_nanos(0))
        .subsec_nanos() as u64;
    let jitter = nanos % jitter_ms;
    base_ms.saturating_add(jitter)
}
