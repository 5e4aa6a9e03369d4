use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::models::EventRecord;
use crate::registry::SharedRegistry;
use crate::AppState;

const REPLAY_BATCH: usize = 500;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Replay journal records after this sequence before streaming live.
    pub after: Option<u64>,
}

/// Position of one subscriber in the journal. Live records are only passed
/// through when they directly follow the last one delivered; anything else
/// is either a repeat (dropped) or a gap (filled from the journal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCursor {
    delivered: u64,
}

#[derive(Debug, PartialEq)]
pub enum LiveStep {
    Deliver(EventRecord),
    Skip,
    Gap,
}

impl EventCursor {
    /// Start after `after`, clamped to the journal head. Without `after` the
    /// stream starts at the head.
    pub async fn start(registry: &SharedRegistry, after: Option<u64>) -> Self {
        let head = registry.last_sequence().await;
        Self {
            delivered: after.map_or(head, |a| a.min(head)),
        }
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Next journal records past the cursor, up to one batch. Empty once
    /// caught up. The cursor moves past everything returned.
    pub async fn backfill(&mut self, registry: &SharedRegistry) -> Vec<EventRecord> {
        let batch = registry.events_after(self.delivered, REPLAY_BATCH).await;
        if let Some(last) = batch.last() {
            self.delivered = last.sequence;
        }
        batch
    }

    pub fn accept_live(&mut self, record: EventRecord) -> LiveStep {
        if record.sequence <= self.delivered {
            LiveStep::Skip
        } else if record.sequence == self.delivered + 1 {
            self.delivered = record.sequence;
            LiveStep::Deliver(record)
        } else {
            LiveStep::Gap
        }
    }
}

pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.after))
}

async fn send_record(socket: &mut WebSocket, record: &EventRecord) -> bool {
    match serde_json::to_string(record) {
        Ok(json) => socket.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize EventRecord");
            true
        }
    }
}

/// Send everything the journal holds past the cursor. False once the client
/// is gone.
async fn catch_up(socket: &mut WebSocket, cursor: &mut EventCursor, registry: &SharedRegistry) -> bool {
    loop {
        let batch = cursor.backfill(registry).await;
        if batch.is_empty() {
            return true;
        }
        for record in &batch {
            if !send_record(socket, record).await {
                return false;
            }
        }
    }
}

async fn handle_socket(mut socket: WebSocket, state: AppState, after: Option<u64>) {
    tracing::info!(after = ?after, "Event stream client connected");

    // Subscribe before reading the journal so nothing committed in between is missed.
    let mut rx = state.events_tx.subscribe();
    let mut cursor = EventCursor::start(&state.registry, after).await;

    if !catch_up(&mut socket, &mut cursor, &state.registry).await {
        return;
    }

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let needs_backfill = match msg {
                    Ok(record) => match cursor.accept_live(record) {
                        LiveStep::Deliver(record) => {
                            if !send_record(&mut socket, &record).await {
                                break;
                            }
                            false
                        }
                        LiveStep::Skip => false,
                        LiveStep::Gap => true,
                    },
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, delivered = cursor.delivered(), "Event stream client lagged, replaying from journal");
                        true
                    }
                    Err(RecvError::Closed) => break,
                };
                if needs_backfill && !catch_up(&mut socket, &mut cursor, &state.registry).await {
                    break;
                }
            }
            client_msg = socket.recv() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    tracing::info!(delivered = cursor.delivered(), "Event stream client disconnected");
}
