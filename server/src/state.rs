use crate::food::FoodItem;
use crate::player::{random_color, Player};
use crate::pool::FixedPool;
use crate::power_up::PowerUpItem;
use crate::registry::ConnectionId;
use blobarena_shared::config::WorldConfig;
use blobarena_shared::protocol::{FoodWire, PlayerWire, PowerUpWire};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::time::Instant;

/// World state owned by the game loop: the player roster plus the food and
/// power-up pools. Nothing outside the loop holds a reference into it;
/// broadcasts work from the owned snapshots below.
pub struct WorldState {
    pub config: WorldConfig,
    /// Ordered by connection id so snapshots serialize deterministically
    players: BTreeMap<ConnectionId, Player>,
    foods: FixedPool<FoodItem>,
    power_ups: FixedPool<PowerUpItem>,
    rng: ChaCha8Rng,
}

impl WorldState {
    pub fn new(config: WorldConfig, rng_seed: Option<u64>) -> Self {
        let mut rng = match rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let foods = Self::initialize_food_pool(&config, &mut rng);
        let power_ups = FixedPool::initialize("powerup", config.power_up_count as usize, |id| {
            PowerUpItem::random(
                id,
                config.power_up_half_extent,
                config.power_up_height,
                &mut rng,
            )
        });

        Self {
            config,
            players: BTreeMap::new(),
            foods,
            power_ups,
            rng,
        }
    }

    fn initialize_food_pool(config: &WorldConfig, rng: &mut ChaCha8Rng) -> FixedPool<FoodItem> {
        FixedPool::initialize("food", config.food_count as usize, |id| {
            FoodItem::random(id, config.food_half_extent, &mut *rng)
        })
    }

    // === Players ===

    pub fn player(&self, id: ConnectionId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: ConnectionId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Insert or replace the player keyed by `id`.
    pub fn upsert_player(&mut self, id: ConnectionId, player: Player) {
        self.players.insert(id, player);
    }

    pub fn remove_player(&mut self, id: ConnectionId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn spawn_position(&mut self) -> [f64; 3] {
        let extent = self.config.spawn_half_extent;
        [
            self.rng.gen_range(-extent..extent),
            0.0,
            self.rng.gen_range(-extent..extent),
        ]
    }

    pub fn random_color(&mut self) -> u32 {
        random_color(&mut self.rng)
    }

    /// Drop expired power-up effects from every player. Returns true if any changed.
    pub fn expire_effects(&mut self, now: Instant) -> bool {
        let mut changed = false;
        for player in self.players.values_mut() {
            changed |= player.expire_effects(now);
        }
        changed
    }

    // === Food ===

    pub fn contains_food(&self, id: &str) -> bool {
        self.foods.contains(id)
    }

    /// A new food item with a never-used id, not yet in the pool.
    pub fn spawn_food(&mut self) -> FoodItem {
        let id = self.foods.next_id();
        FoodItem::random(id, self.config.food_half_extent, &mut self.rng)
    }

    /// Swap the food `id` for `new_food`. An unknown id is logged and ignored:
    /// two clients reporting the same food is expected, only the first counts.
    pub fn replace_food(&mut self, id: &str, new_food: FoodItem) -> bool {
        if self.foods.replace(id, new_food).is_some() {
            true
        } else {
            tracing::debug!("Food {} already gone, ignoring", id);
            false
        }
    }

    pub fn food_count(&self) -> usize {
        self.foods.len()
    }

    // === Power-ups ===

    pub fn contains_power_up(&self, id: &str) -> bool {
        self.power_ups.contains(id)
    }

    pub fn spawn_power_up(&mut self) -> PowerUpItem {
        let id = self.power_ups.next_id();
        PowerUpItem::random(
            id,
            self.config.power_up_half_extent,
            self.config.power_up_height,
            &mut self.rng,
        )
    }

    /// Same contract as [`WorldState::replace_food`]; returns the collected item.
    pub fn replace_power_up(&mut self, id: &str, new_item: PowerUpItem) -> Option<PowerUpItem> {
        let taken = self.power_ups.replace(id, new_item);
        if taken.is_none() {
            tracing::debug!("Power-up {} already gone, ignoring", id);
        }
        taken
    }

    pub fn power_up_count(&self) -> usize {
        self.power_ups.len()
    }

    // === Snapshots ===

    pub fn snapshot_players(&self) -> Vec<PlayerWire> {
        self.players.values().map(Player::to_wire).collect()
    }

    pub fn snapshot_foods(&self) -> Vec<FoodWire> {
        self.foods.iter().map(FoodItem::to_wire).collect()
    }

    pub fn snapshot_power_ups(&self) -> Vec<PowerUpWire> {
        self.power_ups.iter().map(PowerUpItem::to_wire).collect()
    }
}
