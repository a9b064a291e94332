//! WebSocket channel for per-test events.
//!
//! Clients send JSON frames tagged by `action`:
//! `subscribe` / `unsubscribe` take a `/topic/test/{id}/events` destination,
//! `send` takes `/app/test/{id}/activity` plus an arbitrary `payload` that is
//! rebroadcast as an `ACTIVITY` event. Every event on a subscribed topic is
//! written back as `{"destination": .., "event": ..}`.

use std::collections::HashMap;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio::task::JoinHandle;

use crate::api::errors::ApiError;
use crate::api::guards::resolve_token;
use crate::core::state::AppState;
use crate::services::notifier::{parse_activity_destination, parse_topic, topic_for, TestEvent};

const OUTBOUND_BUFFER: usize = 64;

#[derive(Debug, Deserialize)]
pub(crate) struct WsParams {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum ClientFrame {
    Subscribe {
        destination: String,
    },
    Unsubscribe {
        destination: String,
    },
    Send {
        destination: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

#[derive(Serialize)]
struct EventFrame<'a> {
    destination: &'a str,
    event: &'a TestEvent,
}

#[derive(Serialize)]
struct ErrorFrame<'a> {
    error: &'a str,
}

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
) -> Result<Response, ApiError> {
    let user = match params.token.as_deref().map(str::trim).filter(|token| !token.is_empty()) {
        Some(token) => resolve_token(&state, token).await?,
        None => None,
    };
    let user_id = user.map(|user| user.id);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Option<String>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let identity = user_id.as_deref().unwrap_or("anonymous");
    tracing::debug!(user_id = identity, "Realtime client connected");
    metrics::gauge!("realtime_connections").increment(1.0);

    let mut session = Session::new(user_id, tx);
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => session.handle_text(&state, &text).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(error = %err, "Realtime socket error");
                break;
            }
        }
    }

    session.close(&state).await;
    let _ = writer.await;
    metrics::gauge!("realtime_connections").decrement(1.0);
    tracing::debug!("Realtime client disconnected");
}

/// Per-connection state: one forwarding task per subscribed test.
struct Session {
    user_id: Option<String>,
    outbound: mpsc::Sender<String>,
    subscriptions: HashMap<String, JoinHandle<()>>,
}

impl Session {
    fn new(user_id: Option<String>, outbound: mpsc::Sender<String>) -> Self {
        Self { user_id, outbound, subscriptions: HashMap::new() }
    }

    async fn handle_text(&mut self, state: &AppState, text: &str) {
        let frame = match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(error = %err, "Malformed realtime frame");
                self.reply_error("malformed frame").await;
                return;
            }
        };

        match frame {
            ClientFrame::Subscribe { destination } => match parse_topic(&destination) {
                Some(test_id) => self.subscribe(state, test_id).await,
                None => self.reply_error("unknown destination").await,
            },
            ClientFrame::Unsubscribe { destination } => match parse_topic(&destination) {
                Some(test_id) => self.unsubscribe(state, test_id).await,
                None => self.reply_error("unknown destination").await,
            },
            ClientFrame::Send { destination, payload } => {
                match parse_activity_destination(&destination) {
                    Some(test_id) => {
                        let event = TestEvent::activity(self.user_id.as_deref(), payload);
                        state.events().publish(test_id, event).await;
                    }
                    None => self.reply_error("unknown destination").await,
                }
            }
        }
    }

    async fn subscribe(&mut self, state: &AppState, test_id: &str) {
        if self.subscriptions.contains_key(test_id) {
            return;
        }

        let mut receiver = state.events().subscribe(test_id).await;
        let outbound = self.outbound.clone();
        let destination = topic_for(test_id);

        let forwarder = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        let frame = EventFrame { destination: &destination, event: &event };
                        let Ok(text) = serde_json::to_string(&frame) else {
                            continue;
                        };
                        if outbound.send(text).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(%destination, skipped, "Realtime subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        self.subscriptions.insert(test_id.to_string(), forwarder);
    }

    async fn unsubscribe(&mut self, state: &AppState, test_id: &str) {
        if let Some(forwarder) = self.subscriptions.remove(test_id) {
            stop(forwarder).await;
            state.events().prune(test_id).await;
        }
    }

    async fn reply_error(&self, error: &str) {
        if let Ok(text) = serde_json::to_string(&ErrorFrame { error }) {
            let _ = self.outbound.send(text).await;
        }
    }

    async fn close(mut self, state: &AppState) {
        for (test_id, forwarder) in self.subscriptions.drain() {
            stop(forwarder).await;
            state.events().prune(&test_id).await;
        }
    }
}

/// Aborts a forwarding task and waits until its receiver is dropped.
async fn stop(forwarder: JoinHandle<()>) {
    forwarder.abort();
    let _ = forwarder.await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::test_support;

    async fn next_frame(rx: &mut mpsc::Receiver<String>) -> serde_json::Value {
        let text = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("frame in time")
            .expect("channel open");
        serde_json::from_str(&text).expect("json frame")
    }

    #[tokio::test]
    async fn subscribed_session_receives_activity() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let state = test_support::lazy_state();

        let (tx, mut rx) = mpsc::channel(8);
        let mut session = Session::new(Some("user-1".to_string()), tx);

        session
            .handle_text(&state, r#"{"action":"subscribe","destination":"/topic/test/t1/events"}"#)
            .await;
        session
            .handle_text(
                &state,
                r#"{"action":"send","destination":"/app/test/t1/activity","payload":{"q":2}}"#,
            )
            .await;

        let frame = next_frame(&mut rx).await;
        assert_eq!(frame["destination"], "/topic/test/t1/events");
        assert_eq!(frame["event"]["type"], "ACTIVITY");
        assert_eq!(frame["event"]["user_id"], "user-1");
        assert_eq!(frame["event"]["payload"]["q"], 2);

        session.close(&state).await;
        assert_eq!(state.events().publish("t1", TestEvent::joined("s")).await, 0);
    }

    #[tokio::test]
    async fn malformed_and_unknown_frames_get_error_replies() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let state = test_support::lazy_state();

        let (tx, mut rx) = mpsc::channel(8);
        let mut session = Session::new(None, tx);

        session.handle_text(&state, "not json").await;
        assert_eq!(next_frame(&mut rx).await["error"], "malformed frame");

        session
            .handle_text(&state, r#"{"action":"subscribe","destination":"/topic/other"}"#)
            .await;
        assert_eq!(next_frame(&mut rx).await["error"], "unknown destination");
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        let state = test_support::lazy_state();

        let (tx, mut rx) = mpsc::channel(8);
        let mut session = Session::new(None, tx);
        let topic = r#"{"action":"%s","destination":"/topic/test/t2/events"}"#;

        session.handle_text(&state, &topic.replace("%s", "subscribe")).await;
        state.events().publish("t2", TestEvent::joined("s1")).await;
        assert_eq!(next_frame(&mut rx).await["event"]["type"], "JOINED");

        session.handle_text(&state, &topic.replace("%s", "unsubscribe")).await;
        assert_eq!(state.events().publish("t2", TestEvent::joined("s2")).await, 0);
        assert!(rx.try_recv().is_err());
    }
}
