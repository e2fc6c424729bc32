//! WebSocket handler bridging transports into the session dispatcher.
//!
//! One WebSocket is one dispatcher connection. Inbound frames are parsed
//! as JSON [`ClientMessage`]s and handed to the dispatcher; everything the
//! dispatcher pushes for this connection is serialized back out. On socket
//! close the connection is marked disconnected, not removed, so the seat
//! survives for a reconnect.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use bot_poker::session::{ClientMessage, ServerMessage};

use super::AppState;

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::unbounded_channel::<ServerMessage>();
    let conn_id = state.dispatcher.register(outbound_tx).await;
    info!("websocket connected: {conn_id}");

    let send_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(err) => {
                    warn!("failed to serialize server message: {err}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => state.dispatcher.handle_message(conn_id, message).await,
                Err(err) => {
                    debug!("connection {conn_id}: unparseable message: {err}");
                }
            },
            Ok(Message::Close(_)) => break,
            Err(err) => {
                debug!("connection {conn_id}: websocket error: {err}");
                break;
            }
            _ => {}
        }
    }

    // The seat stays bound; the turn clock keeps running without us.
    state.dispatcher.disconnect(conn_id).await;
    send_task.abort();
    info!("websocket disconnected: {conn_id}");
}
