//! WebSocket handler for real-time item events.

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{future, SinkExt, StreamExt};
use itemcast_hub::{serve_connection, Inbound, Outbound};
use tracing::debug;

use crate::state::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(state.pump.max_message_size)
        .on_upgrade(|socket| handle_socket(socket, state))
}

/// Hand the connection to the hub pumps.
async fn handle_socket(socket: WebSocket, state: AppState) {
    debug!("WebSocket upgrade complete");
    let (sender, receiver) = socket.split();

    let sink = sender.with(|out: Outbound| future::ready(Ok::<_, axum::Error>(to_message(out))));
    let stream = receiver.map(|msg| msg.map(from_message));

    serve_connection(state.hub.clone(), sink, stream, state.pump.clone()).await;
}

fn to_message(out: Outbound) -> Message {
    match out {
        Outbound::Text(frame) => Message::Text(frame.as_ref().into()),
        Outbound::Ping => Message::Ping(Bytes::new()),
        Outbound::Close => Message::Close(None),
    }
}

fn from_message(msg: Message) -> Inbound {
    match msg {
        Message::Text(text) => Inbound::Data(text.as_str().len()),
        Message::Binary(data) => Inbound::Data(data.len()),
        Message::Ping(_) => Inbound::Ping,
        Message::Pong(_) => Inbound::Pong,
        Message::Close(_) => Inbound::Close,
    }
}
