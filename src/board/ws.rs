use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use super::api::{ApiError, CurrentUser, SharedState};
use super::store::{ChangeEvent, ChangeFilter, ChangeSignal, ChangeSubscription, Table};

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── WebSocket message types ──────────────────────────────────────────

/// Frames pushed to realtime clients. Either way the client refetches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    Changed { event: ChangeEvent },
    /// The server dropped `missed` events for this client.
    Resync { missed: u64 },
}

impl From<ChangeSignal> for WsMessage {
    fn from(signal: ChangeSignal) -> Self {
        match signal {
            ChangeSignal::Changed(event) => WsMessage::Changed { event },
            ChangeSignal::Missed(missed) => WsMessage::Resync { missed },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub table: Option<String>,
    pub project_id: Option<Uuid>,
}

impl WsQuery {
    /// Defaults to the tickets table.
    pub fn filter(&self) -> Result<ChangeFilter, String> {
        let table = match &self.table {
            Some(t) => Table::from_str(t)?,
            None => Table::Tickets,
        };
        let filter = ChangeFilter::table(table);
        Ok(match self.project_id {
            Some(id) => filter.in_project(id),
            None => filter,
        })
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Realtime change channel. Like every board route it needs a signed-in
/// user; the user check runs before the upgrade handshake is inspected.
pub async fn ws_handler(
    CurrentUser(user): CurrentUser,
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Query(query): Query<WsQuery>,
) -> Response {
    let filter = match query.filter() {
        Ok(f) => f,
        Err(msg) => return ApiError::BadRequest(msg).into_response(),
    };
    tracing::debug!(user_id = %user.id, table = filter.table.as_str(), "ws subscribe");
    // Subscribe before the upgrade so no change between handshake and
    // loop start is lost.
    let subscription = state.store.subscribe(filter);
    ws.on_upgrade(move |socket| handle_socket(socket, subscription))
        .into_response()
}

async fn handle_socket(socket: WebSocket, subscription: ChangeSubscription) {
    let filter = subscription.filter();
    tracing::debug!(table = filter.table.as_str(), project_id = ?filter.project_id, "ws client connected");
    let (sender, receiver) = socket.split();
    run_socket_loop(sender, receiver, subscription).await;
    tracing::debug!(table = filter.table.as_str(), "ws client disconnected");
}

async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut subscription: ChangeSubscription,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // First tick is immediate.
    ping_interval.tick().await;

    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            // ── Periodic ping ───────────────────────────────────────
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    break;
                }
                if sender.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            // ── Change forwarding ───────────────────────────────────
            signal = subscription.next() => {
                let Some(signal) = signal else { break };
                let Some(text) = encode(&WsMessage::from(signal)) else { continue };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }

            // ── Client messages (pong, close, etc.) ─────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
}

pub fn encode(msg: &WsMessage) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize ws message");
            None
        }
    }
}
