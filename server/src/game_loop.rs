use crate::broadcast::{initial_frames, resync_frames, Broadcaster, GameBroadcast};
use crate::config::ServerConfig;
use crate::handlers::{self, Broadcasts};
use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::state::WorldState;
use axum::extract::ws::Utf8Bytes;
use blobarena_shared::protocol::ClientMsg;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};

/// Commands from client connections to the game loop
pub enum GameCommand {
    Connect {
        response: oneshot::Sender<ConnectAck>,
    },
    Client {
        id: ConnectionId,
        msg: ClientMsg,
    },
    /// Inbound traffic that carries no event (pings, unparseable text)
    Activity {
        id: ConnectionId,
    },
    /// The connection fell behind the broadcast channel and needs fresh state.
    /// Replies `None` if the connection is no longer registered.
    Resync {
        id: ConnectionId,
        response: oneshot::Sender<Option<Subscription>>,
    },
    Disconnect {
        id: ConnectionId,
    },
}

/// A directed snapshot plus a broadcast receiver subscribed at the same
/// point in the command sequence, so no update is missed or seen twice.
pub struct Subscription {
    /// Sent to this connection only, in order
    pub frames: Vec<Utf8Bytes>,
    pub updates: broadcast::Receiver<GameBroadcast>,
}

/// Reply to [`GameCommand::Connect`].
pub struct ConnectAck {
    pub id: ConnectionId,
    pub subscription: Subscription,
}

/// Everything the game loop owns. Each method runs one command to completion.
pub struct Game {
    registry: ConnectionRegistry,
    world: WorldState,
    broadcaster: Broadcaster,
    idle_timeout: Option<Duration>,
}

impl Game {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            world: WorldState::new(config.world, config.rng_seed),
            broadcaster: Broadcaster::new(config.broadcast_capacity),
            idle_timeout: config.idle_timeout,
        }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Register a connection. No player exists until it sends `join`.
    pub fn connect(&mut self, now: Instant) -> ConnectAck {
        let id = self.registry.connect(now);
        tracing::info!("Player connected: {} ({} live)", id, self.registry.len());
        ConnectAck {
            id,
            subscription: Subscription {
                frames: initial_frames(&self.world, id),
                updates: self.broadcaster.subscribe(),
            },
        }
    }

    pub fn resync(&self, id: ConnectionId) -> Option<Subscription> {
        if !self.registry.is_connected(id) {
            return None;
        }
        Some(Subscription {
            frames: resync_frames(&self.world),
            updates: self.broadcaster.subscribe(),
        })
    }

    pub fn dispatch(&mut self, id: ConnectionId, msg: ClientMsg, now: Instant) {
        if !self.registry.touch(id, now) {
            tracing::debug!("Dropping event from stale connection {}", id);
            return;
        }
        let out = handlers::handle_event(&mut self.world, id, msg, now);
        self.broadcaster.emit(&self.world, out);
    }

    pub fn touch(&mut self, id: ConnectionId, now: Instant) {
        self.registry.touch(id, now);
    }

    /// Remove the connection and its player. Safe to call more than once.
    pub fn disconnect(&mut self, id: ConnectionId, now: Instant) {
        if let Some(session) = self.registry.session(id) {
            let lifetime = now.saturating_duration_since(session.connected_at);
            tracing::info!(
                "Player disconnected: {} after {:.1}s",
                id,
                lifetime.as_secs_f64()
            );
        }
        self.registry.disconnect(id);
        let out = handlers::disconnect(&mut self.world, id);
        self.broadcaster.emit(&self.world, out);
    }

    /// Periodic housekeeping: evict idle connections and expire power-up effects.
    pub fn sweep(&mut self, now: Instant) {
        let mut out = Broadcasts::NONE;

        if let Some(timeout) = self.idle_timeout {
            for id in self.registry.idle(now, timeout) {
                tracing::info!("Evicting connection {} after {:?} of silence", id, timeout);
                self.registry.disconnect(id);
                self.broadcaster.evict(id);
                out.players |= handlers::disconnect(&mut self.world, id).players;
            }
        }

        out.players |= self.world.expire_effects(now);
        self.broadcaster.emit(&self.world, out);
    }
}

/// Run the main game loop. Owns all game state; commands are applied one at
/// a time in arrival order.
pub async fn run_game_loop(mut cmd_rx: mpsc::Receiver<GameCommand>, server_config: ServerConfig) {
    let mut game = Game::new(&server_config);

    let mut sweep_interval = tokio::time::interval(server_config.sweep_interval);
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = sweep_interval.tick() => {
                game.sweep(Instant::now());
            }

            cmd = cmd_rx.recv() => {
                // All senders gone: the server is shutting down
                let Some(cmd) = cmd else { break };
                let now = Instant::now();
                match cmd {
                    GameCommand::Connect { response } => {
                        let ack = game.connect(now);
                        let id = ack.id;
                        if response.send(ack).is_err() {
                            // Socket went away before the handshake finished
                            game.disconnect(id, now);
                        }
                    }
                    GameCommand::Client { id, msg } => game.dispatch(id, msg, now),
                    GameCommand::Activity { id } => game.touch(id, now),
                    GameCommand::Resync { id, response } => {
                        let _ = response.send(game.resync(id));
                    }
                    GameCommand::Disconnect { id } => game.disconnect(id, now),
                }
            }
        }
    }

    tracing::info!("Game loop ended");
}
