//! One WebSocket connection: framed event batching, ping/pong latency
//! tracking, and the reader/writer task pair that keeps socket I/O off the
//! room's simulation loop.
//!
//! Mirrors the relay server's `handle_server_logic`/`handle_client_logic`
//! split: two tasks raced with `tokio::select!`, whichever finishes first
//! wins and the other is aborted, but frames JSON event arrays instead of
//! postcard-encoded binary messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use protocol::{EVENT_PING, EVENT_PONG, Frame, InboundItem, OutboundItem};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::rooms_controller::RoomsController;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Per-session soft deadline: an outbound frame that takes longer than this
/// to write forces the session closed.
const SEND_DEADLINE: Duration = Duration::from_secs(2);
const PING_INTERVAL: Duration = Duration::from_secs(1);

/// A handle the rest of the server holds onto a session: a channel to queue
/// outbound batches on, decoupled from the socket write itself.
pub type Outbox = mpsc::UnboundedSender<Vec<OutboundItem>>;

/// Allocates the next opaque session id, e.g. `"S1"`, `"S2"`, ... matching
/// the ids used throughout the wire protocol's examples.
fn next_session_id() -> String {
    format!("S{}", NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
}

pub fn now_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Drives one accepted WebSocket connection end to end: registers the
/// session with the [`RoomsController`], runs reader/writer tasks until one
/// side ends, then unregisters and notifies the session's room (if any).
pub async fn run(socket: WebSocket, controller: Arc<RoomsController>) {
    let id = next_session_id();
    let (sender, receiver) = socket.split();
    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel::<Vec<OutboundItem>>();

    controller.register_session(id.clone(), outbox_tx.clone()).await;
    tracing::info!(session = %id, "session connected");

    let mut writer_task = tokio::spawn(run_writer(sender, outbox_rx));
    let mut reader_task = tokio::spawn(run_reader(id.clone(), receiver, controller.clone()));
    let mut ping_task = tokio::spawn(run_pinger(outbox_tx.clone()));

    tokio::select! {
        _ = &mut writer_task => { reader_task.abort(); ping_task.abort(); }
        _ = &mut reader_task => { writer_task.abort(); ping_task.abort(); }
    }

    controller.unregister_session(&id).await;
    tracing::info!(session = %id, "session disconnected");
}

/// Sends queued outbound batches as they arrive, one JSON frame per batch.
/// A batch accumulated across a single Game tick lands in exactly one text
/// frame, per the wire contract.
async fn run_writer(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbox_rx: mpsc::UnboundedReceiver<Vec<OutboundItem>>,
) {
    while let Some(items) = outbox_rx.recv().await {
        if items.is_empty() {
            continue;
        }
        let text = match Frame::encode(&items) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(?err, "failed to encode outbound frame");
                continue;
            }
        };
        let sent = tokio::time::timeout(SEND_DEADLINE, sender.send(Message::Text(text.into()))).await;
        match sent {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(?err, "session write failed, closing");
                return;
            }
            Err(_) => {
                tracing::warn!("session write exceeded soft deadline, closing");
                return;
            }
        }
    }
}

/// Decodes inbound frames and dispatches each event to the
/// [`RoomsController`], which owns the full lobby/game routing table.
async fn run_reader(
    session_id: String,
    mut receiver: SplitStream<WebSocket>,
    controller: Arc<RoomsController>,
) {
    while let Some(message) = receiver.next().await {
        let message = match message {
            Ok(m) => m,
            Err(err) => {
                tracing::warn!(session = %session_id, ?err, "websocket error");
                return;
            }
        };
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => return,
            _ => continue,
        };
        let items = match Frame::decode(&text) {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(session = %session_id, ?err, "malformed inbound frame");
                continue;
            }
        };
        for item in items {
            match item {
                InboundItem::Event { name, data, ack_id: _ } if name == EVENT_PONG => {
                    controller.record_pong(&session_id, data).await;
                }
                InboundItem::Event { name, data, ack_id } => {
                    controller.dispatch(session_id.clone(), name, data, ack_id).await;
                }
                InboundItem::Ack { .. } => {
                    // This server never sends a client-acknowledged event
                    // (the optional outbound ack marker in the wire spec),
                    // so an ack response from the client has nothing to
                    // correlate to; ignore it.
                }
            }
        }
    }
}

/// Sends a `ping` with a monotonic timestamp roughly once a second; the
/// round-trip half-time is recorded by [`RoomsController::record_pong`] when
/// the echoed `pong` arrives.
async fn run_pinger(outbox: Outbox) {
    let mut interval = tokio::time::interval(PING_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let item = OutboundItem::event(EVENT_PING, serde_json::json!(now_millis()), None);
        if outbox.send(vec![item]).is_err() {
            return;
        }
    }
}
