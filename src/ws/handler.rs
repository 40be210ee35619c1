//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{GameError, RoomCommand, RoomHandle};
use crate::util::rate_limit::FrameLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Messages buffered per connection before the room starts dropping
const OUTBOUND_BUFFER: usize = 128;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let player_id = Uuid::new_v4();
    info!(player_id = %player_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    run_session(player_id, state, ws_sink, ws_stream).await;

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Per-connection session: which room this socket is in, if any
struct Session {
    player_id: Uuid,
    state: AppState,
    outbound: mpsc::Sender<ServerMsg>,
    room: Option<RoomHandle>,
}

impl Session {
    async fn reply_error(&self, e: &GameError) {
        let _ = self
            .outbound
            .send(ServerMsg::GameError {
                code: e.code().to_string(),
                message: e.to_string(),
            })
            .await;
    }

    async fn handle(&mut self, msg: ClientMsg) {
        match msg {
            ClientMsg::JoinGame { room_code, name } if self.room.is_none() => {
                match self
                    .state
                    .rooms
                    .join(&room_code, self.player_id, &name, self.outbound.clone())
                    .await
                {
                    Ok(handle) => {
                        info!(player_id = %self.player_id, room = %handle.code, "Joined room");
                        self.room = Some(handle);
                    }
                    Err(e) => {
                        debug!(player_id = %self.player_id, error = %e, "Join failed");
                        self.reply_error(&e).await;
                    }
                }
            }
            ClientMsg::Ping { t } if self.room.is_none() => {
                let _ = self
                    .outbound
                    .send(ServerMsg::Pong {
                        t,
                        server_time: unix_millis(),
                    })
                    .await;
            }
            ClientMsg::LeaveGame => self.leave().await,
            msg => {
                let closed = match &self.room {
                    Some(room) => {
                        let cmd = RoomCommand::Input {
                            player_id: self.player_id,
                            msg,
                        };
                        !room.send(cmd).await
                    }
                    None => {
                        debug!(player_id = %self.player_id, "Event outside a room dropped");
                        false
                    }
                };
                if closed {
                    debug!(player_id = %self.player_id, "Room already closed");
                    self.room = None;
                }
            }
        }
    }

    async fn leave(&mut self) {
        if let Some(room) = self.room.take() {
            room.send(RoomCommand::Leave {
                player_id: self.player_id,
            })
            .await;
        }
    }
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: Uuid,
    state: AppState,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
) {
    let mut limiter = FrameLimiter::per_second(state.config.input_rate_limit);
    let (outbound, mut outbound_rx) = mpsc::channel::<ServerMsg>(OUTBOUND_BUFFER);

    // Spawn writer task: room events -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let mut session = Session {
        player_id,
        state,
        outbound,
        room: None,
    };

    // Reader loop: WebSocket -> room
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !limiter.admit() {
                    warn!(player_id = %player_id, dropped = limiter.dropped(), "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => session.handle(client_msg).await,
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Same cleanup as an explicit leave
    session.leave().await;

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
