use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, Query},
    response::IntoResponse,
    routing::get,
    Extension, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::{
    error::{bad, AppResult},
    room::{RoomError, RoomRegistry, Subscription},
    routes::rooms::RoomQuery,
    state::RoomId,
};

/// Commands a client may send over the socket
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Command {
    Play,
    Pause,
    Next,
    Seek { position: f64 },
}

pub fn router() -> Router {
    Router::new().route("/room", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(q): Query<RoomQuery>,
    Extension(rooms): Extension<RoomRegistry>,
) -> AppResult<impl IntoResponse> {
    let id = q.room_id()?;
    let sub = rooms.connect(id).await.map_err(|e| {
        tracing::debug!(room = %id, error = %e, "join refused");
        bad("room_id is invalid")
    })?;
    Ok(ws.on_upgrade(move |s| user_ws(s, id, sub, rooms)))
}

/* ---------------- per user ---------------- */
async fn user_ws(sock: WebSocket, room: RoomId, sub: Subscription, rooms: RoomRegistry) {
    let Subscription { id: subscriber, mut rx } = sub;
    let (mut sink, mut stream) = sock.split();

    /* 快照 → client；channel 關閉代表被踢或房間消失 */
    let mut send_task = tokio::spawn(async move {
        while let Some(snapshot) = rx.recv().await {
            let text = match serde_json::to_string(&*snapshot) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(room = %room, error = %e, "snapshot encode failed");
                    break;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    /* client → 指令 */
    let cmd_rooms = rooms.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = stream.next().await {
            match msg {
                Message::Text(raw) => apply(&cmd_rooms, room, &raw).await,
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    /* 離房 */
    match rooms.disconnect(room, subscriber).await {
        Ok(()) => {}
        Err(e @ (RoomError::UnknownSubscriber(_) | RoomError::RoomNotFound(_))) => {
            tracing::debug!(room = %room, subscriber, error = %e, "already detached");
        }
        Err(e) => tracing::warn!(room = %room, subscriber, error = %e, "disconnect failed"),
    }
}

async fn apply(rooms: &RoomRegistry, room: RoomId, raw: &str) {
    let cmd = match serde_json::from_str::<Command>(raw) {
        Ok(cmd) => cmd,
        Err(e) => {
            tracing::debug!(room = %room, error = %e, "ignoring malformed command");
            return;
        }
    };

    let result = match cmd {
        Command::Play => rooms.play(room).await,
        Command::Pause => rooms.pause(room).await,
        Command::Next => rooms.next(room).await,
        Command::Seek { position } => rooms.seek(room, position).await,
    };
    if let Err(e) = result {
        tracing::debug!(room = %room, command = raw, error = %e, "command rejected");
    }
}
