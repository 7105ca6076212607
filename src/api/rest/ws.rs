use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::access::{Caller, Operation};
use crate::api::rest::caller::CallerIdentity;
use crate::engine::gate;
use crate::error::AppError;
use crate::state::AppState;

// Browsers cannot set headers on a websocket handshake, so the token may
// also arrive as a query parameter.
#[derive(Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    Query(params): Query<WsParams>,
) -> Result<impl IntoResponse, AppError> {
    let caller = match (caller, params.token) {
        (Caller::Anonymous, Some(token)) => state.identity.resolve_token(&token)?,
        (caller, _) => caller,
    };
    gate(&state, &caller, Operation::WatchEvents)?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, caller)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, caller: Caller) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.events_tx.subscribe();
    let subject = caller.subject().to_string();

    info!(subject = %subject, "event feed client connected");

    let send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event feed client lagging; events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize request event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!(subject = %subject, "event feed client disconnected");
}
