use crate::player::random_color;
use crate::pool::PoolItem;
use blobarena_shared::protocol::{round4, FoodWire};
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct FoodItem {
    pub id: String,
    pub position: [f64; 3],
    pub color: u32,
}

impl FoodItem {
    /// New food on the ground plane, uniformly placed in `[-half_extent, half_extent]` on x and z.
    pub fn random(id: String, half_extent: f64, rng: &mut impl Rng) -> Self {
        Self {
            id,
            position: [
                round4(rng.gen_range(-half_extent..half_extent)),
                0.0,
                round4(rng.gen_range(-half_extent..half_extent)),
            ],
            color: random_color(rng),
        }
    }

    pub fn to_wire(&self) -> FoodWire {
        FoodWire {
            id: self.id.clone(),
            position: self.position,
            color: self.color,
        }
    }
}

impl PoolItem for FoodItem {
    fn id(&self) -> &str {
        &self.id
    }
}
