//! Reactions to inbound client events.
//!
//! Each handler mutates the world and reports which snapshots must be
//! broadcast. Handlers are total: an event whose precondition does not hold
//! leaves the world untouched and asks for no broadcast.

use crate::player::{display_name, Player};
use crate::registry::ConnectionId;
use crate::state::WorldState;
use blobarena_shared::protocol::ClientMsg;
use blobarena_shared::skins::{self, resolve_skin_id};
use std::time::Instant;

/// Snapshots to broadcast after an event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Broadcasts {
    pub players: bool,
    pub foods: bool,
    pub power_ups: bool,
}

impl Broadcasts {
    pub const NONE: Broadcasts = Broadcasts {
        players: false,
        foods: false,
        power_ups: false,
    };

    pub const PLAYERS: Broadcasts = Broadcasts {
        players: true,
        ..Broadcasts::NONE
    };

    pub const FOODS: Broadcasts = Broadcasts {
        foods: true,
        ..Broadcasts::NONE
    };

    pub fn is_empty(&self) -> bool {
        *self == Broadcasts::NONE
    }
}

pub fn handle_event(
    state: &mut WorldState,
    sender: ConnectionId,
    msg: ClientMsg,
    now: Instant,
) -> Broadcasts {
    match msg {
        ClientMsg::Join { name, skin_id } => join(state, sender, name.as_deref(), skin_id),
        ClientMsg::UpdatePosition {
            position,
            size,
            score,
        } => update_position(state, sender, position, size, score),
        ClientMsg::FoodEaten { food_id } => food_eaten(state, &food_id),
        ClientMsg::PowerUpCollected { power_up_id } => {
            power_up_collected(state, sender, &power_up_id, now)
        }
        ClientMsg::PlayerDied => player_died(state, sender),
        ClientMsg::Activity => Broadcasts::NONE,
    }
}

/// Create the sender's player, replacing any existing one. A re-join keeps
/// the session color; everything else starts a new life.
pub fn join(
    state: &mut WorldState,
    sender: ConnectionId,
    name: Option<&str>,
    skin_id: Option<i32>,
) -> Broadcasts {
    let color = match state.player(sender) {
        Some(existing) => existing.color,
        None => state.random_color(),
    };
    let player = Player {
        id: sender,
        name: display_name(name, sender, state.config.max_name_chars as usize),
        position: state.spawn_position(),
        size: state.config.initial_size,
        score: 0,
        skin_id: resolve_skin_id(skin_id),
        color,
        effects: Vec::new(),
    };
    tracing::info!(
        "Player {} joined as {:?} ({} skin)",
        sender,
        player.name,
        skins::get(player.skin_id).map_or("unknown", |s| s.name)
    );
    state.upsert_player(sender, player);
    Broadcasts::PLAYERS
}

/// Overwrite the sender's reported position, size and score. Size and score
/// are trusted as reported; missing values keep the previous ones.
pub fn update_position(
    state: &mut WorldState,
    sender: ConnectionId,
    position: [f64; 3],
    size: Option<f64>,
    score: Option<u32>,
) -> Broadcasts {
    if position.iter().any(|c| !c.is_finite()) {
        tracing::debug!("Ignoring non-finite position from {}", sender);
        return Broadcasts::NONE;
    }
    let Some(player) = state.player_mut(sender) else {
        tracing::debug!("updatePosition from {} without a player", sender);
        return Broadcasts::NONE;
    };
    player.position = position;
    if let Some(size) = size.filter(|s| s.is_finite()) {
        player.size = size;
    }
    if let Some(score) = score {
        player.score = score;
    }
    Broadcasts::PLAYERS
}

pub fn food_eaten(state: &mut WorldState, food_id: &str) -> Broadcasts {
    if !state.contains_food(food_id) {
        tracing::debug!("foodEaten for unknown food {}", food_id);
        return Broadcasts::NONE;
    }
    let fresh = state.spawn_food();
    if state.replace_food(food_id, fresh) {
        Broadcasts::FOODS
    } else {
        Broadcasts::NONE
    }
}

/// Collecting requires a live player and an existing item; the item is
/// replaced and its effect applied to the collector.
pub fn power_up_collected(
    state: &mut WorldState,
    sender: ConnectionId,
    power_up_id: &str,
    now: Instant,
) -> Broadcasts {
    if state.player(sender).is_none() {
        tracing::debug!("powerUpCollected from {} without a player", sender);
        return Broadcasts::NONE;
    }
    if !state.contains_power_up(power_up_id) {
        tracing::debug!("powerUpCollected for unknown power-up {}", power_up_id);
        return Broadcasts::NONE;
    }
    let fresh = state.spawn_power_up();
    let Some(taken) = state.replace_power_up(power_up_id, fresh) else {
        return Broadcasts::NONE;
    };
    if let Some(player) = state.player_mut(sender) {
        player.apply_effect(taken.kind, now);
        tracing::debug!("Player {} collected {}", sender, taken.kind.name());
    }
    Broadcasts {
        players: true,
        foods: false,
        power_ups: true,
    }
}

pub fn player_died(state: &mut WorldState, sender: ConnectionId) -> Broadcasts {
    match state.remove_player(sender) {
        Some(player) => {
            tracing::info!("Player {} died with score {}", sender, player.score);
            Broadcasts::PLAYERS
        }
        None => {
            tracing::debug!("playerDied from {} without a player", sender);
            Broadcasts::NONE
        }
    }
}

/// Transport-level disconnect. Idempotent.
pub fn disconnect(state: &mut WorldState, id: ConnectionId) -> Broadcasts {
    if state.remove_player(id).is_some() {
        Broadcasts::PLAYERS
    } else {
        Broadcasts::NONE
    }
}
