use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, Semaphore};

use crate::broadcast::GameBroadcast;
use crate::config::ServerConfig;
use crate::game_loop::{GameCommand, Subscription};
use crate::registry::ConnectionId;
use blobarena_shared::protocol::ClientMsg;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    pub connection_semaphore: Arc<Semaphore>,
    /// Server-initiated pings; the pong counts as activity for idle eviction
    pub ping_interval: Duration,
}

impl AppState {
    pub fn new(game_tx: mpsc::Sender<GameCommand>, config: &ServerConfig) -> Self {
        Self {
            game_tx,
            connection_semaphore: Arc::new(Semaphore::new(config.max_connections)),
            ping_interval: config.ping_interval(),
        }
    }
}

/// Ask the game loop for fresh state and a new subscription.
async fn resync(app_state: &AppState, id: ConnectionId) -> Option<Subscription> {
    let (resp_tx, resp_rx) = oneshot::channel();
    app_state
        .game_tx
        .send(GameCommand::Resync {
            id,
            response: resp_tx,
        })
        .await
        .ok()?;
    resp_rx.await.ok().flatten()
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, app_state))
}

async fn handle_socket(mut socket: WebSocket, app_state: AppState) {
    let _permit = match app_state.connection_semaphore.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!("Connection limit reached, rejecting client");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .game_tx
        .send(GameCommand::Connect { response: resp_tx })
        .await
        .is_err()
    {
        tracing::error!("Failed to send Connect command");
        return;
    }

    let ack = match resp_rx.await {
        Ok(ack) => ack,
        Err(_) => {
            tracing::error!("Game loop dropped the connect request");
            return;
        }
    };
    let my_id = ack.id;
    let mut updates = ack.subscription.updates;

    let (mut sink, mut stream) = socket.split();

    for frame in ack.subscription.frames {
        if sink.send(Message::Text(frame)).await.is_err() {
            let _ = app_state
                .game_tx
                .send(GameCommand::Disconnect { id: my_id })
                .await;
            return;
        }
    }

    let mut ping_timer = tokio::time::interval_at(
        tokio::time::Instant::now() + app_state.ping_interval,
        app_state.ping_interval,
    );
    ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ping_timer.tick() => {
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }

            // Client -> Server
            msg = stream.next() => {
                let cmd = match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(msg) => GameCommand::Client { id: my_id, msg },
                            Err(e) => {
                                tracing::debug!("Malformed message from {}: {}", my_id, e);
                                GameCommand::Activity { id: my_id }
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        GameCommand::Activity { id: my_id }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Binary(_))) => continue,
                    Some(Err(e)) => {
                        tracing::debug!("Socket error from {}: {}", my_id, e);
                        break;
                    }
                };
                if app_state.game_tx.send(cmd).await.is_err() {
                    break;
                }
            }

            // Server -> Client (broadcast)
            result = updates.recv() => {
                match result {
                    Ok(GameBroadcast::Frame(frame)) => {
                        if sink.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    Ok(GameBroadcast::Evict { connection_id }) => {
                        if connection_id == my_id {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Player {} lagged by {} messages, resyncing", my_id, n);
                        match resync(&app_state, my_id).await {
                            Some(subscription) => {
                                updates = subscription.updates;
                                let mut failed = false;
                                for frame in subscription.frames {
                                    if sink.send(Message::Text(frame)).await.is_err() {
                                        failed = true;
                                        break;
                                    }
                                }
                                if failed {
                                    break;
                                }
                            }
                            // Evicted while we were behind
                            None => break,
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = app_state
        .game_tx
        .send(GameCommand::Disconnect { id: my_id })
        .await;
}
