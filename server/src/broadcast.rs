//! Broadcast layer.
//!
//! Every snapshot is serialized once, and the same bytes are fanned out to
//! all subscribers, so clients that receive the same frames hold identical state.

use crate::handlers::Broadcasts;
use crate::registry::ConnectionId;
use crate::state::WorldState;
use axum::extract::ws::Utf8Bytes;
use blobarena_shared::protocol::{
    FoodsMsg, PlayersMsg, PowerUpsMsg, ServerMsg, WelcomeMsg, PROTOCOL_VERSION,
};
use tokio::sync::broadcast;

/// Messages from the game loop to connection tasks
#[derive(Debug, Clone)]
pub enum GameBroadcast {
    /// Serialized `ServerMsg` for every client
    Frame(Utf8Bytes),
    /// Close the connection with this id
    Evict { connection_id: ConnectionId },
}

pub struct Broadcaster {
    tx: broadcast::Sender<GameBroadcast>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameBroadcast> {
        self.tx.subscribe()
    }

    /// Emit the snapshots an event handler asked for. Players go first so a
    /// collector's new effect lands before the refreshed power-up field.
    pub fn emit(&self, state: &WorldState, which: Broadcasts) {
        if which.players {
            self.broadcast_players(state);
        }
        if which.foods {
            self.broadcast_foods(state);
        }
        if which.power_ups {
            self.broadcast_power_ups(state);
        }
    }

    pub fn broadcast_players(&self, state: &WorldState) {
        self.send_msg(&players_msg(state));
    }

    pub fn broadcast_foods(&self, state: &WorldState) {
        self.send_msg(&foods_msg(state));
    }

    pub fn broadcast_power_ups(&self, state: &WorldState) {
        self.send_msg(&power_ups_msg(state));
    }

    pub fn evict(&self, connection_id: ConnectionId) {
        // No receivers just means nobody is connected
        let _ = self.tx.send(GameBroadcast::Evict { connection_id });
    }

    fn send_msg(&self, msg: &ServerMsg) {
        if let Some(frame) = encode(msg) {
            let _ = self.tx.send(GameBroadcast::Frame(frame));
        }
    }
}

pub fn encode(msg: &ServerMsg) -> Option<Utf8Bytes> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Utf8Bytes::from(json)),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            None
        }
    }
}

/// Directed frames for a newly connected client: welcome, then the food and
/// power-up fields.
pub fn initial_frames(state: &WorldState, self_id: ConnectionId) -> Vec<Utf8Bytes> {
    let welcome = ServerMsg::Welcome(WelcomeMsg {
        protocol_version: PROTOCOL_VERSION,
        server_version: env!("CARGO_PKG_VERSION").to_string(),
        self_id,
        players: state.snapshot_players(),
        config: state.config,
    });
    [welcome, foods_msg(state), power_ups_msg(state)]
        .iter()
        .filter_map(encode)
        .collect()
}

/// Full state for a connection that fell behind.
pub fn resync_frames(state: &WorldState) -> Vec<Utf8Bytes> {
    [players_msg(state), foods_msg(state), power_ups_msg(state)]
        .iter()
        .filter_map(encode)
        .collect()
}

fn players_msg(state: &WorldState) -> ServerMsg {
    ServerMsg::Players(PlayersMsg {
        players: state.snapshot_players(),
    })
}

fn foods_msg(state: &WorldState) -> ServerMsg {
    ServerMsg::Foods(FoodsMsg {
        foods: state.snapshot_foods(),
    })
}

fn power_ups_msg(state: &WorldState) -> ServerMsg {
    ServerMsg::PowerUps(PowerUpsMsg {
        power_ups: state.snapshot_power_ups(),
    })
}
