use crate::pool::PoolItem;
use blobarena_shared::power_ups::PowerUpKind;
use blobarena_shared::protocol::{round4, PowerUpWire};
use rand::seq::SliceRandom;
use rand::Rng;

/// A collectible power-up lying in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerUpItem {
    pub id: String,
    pub kind: PowerUpKind,
    pub position: [f64; 3],
}

impl PowerUpItem {
    pub fn random(id: String, half_extent: f64, height: f64, rng: &mut impl Rng) -> Self {
        let kind = *PowerUpKind::ALL
            .choose(rng)
            .unwrap_or(&PowerUpKind::Speed);
        Self {
            id,
            kind,
            position: [
                round4(rng.gen_range(-half_extent..half_extent)),
                height,
                round4(rng.gen_range(-half_extent..half_extent)),
            ],
        }
    }

    pub fn to_wire(&self) -> PowerUpWire {
        PowerUpWire {
            id: self.id.clone(),
            kind: self.kind,
            position: self.position,
        }
    }
}

impl PoolItem for PowerUpItem {
    fn id(&self) -> &str {
        &self.id
    }
}
