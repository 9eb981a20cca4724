//! Power-up catalog.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub enum PowerUpKind {
    Speed,
    Size,
    Magnet,
    Shield,
    Ghost,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::Speed,
        PowerUpKind::Size,
        PowerUpKind::Magnet,
        PowerUpKind::Shield,
        PowerUpKind::Ghost,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PowerUpKind::Speed => "Speed Boost",
            PowerUpKind::Size => "Growth Spurt",
            PowerUpKind::Magnet => "Food Magnet",
            PowerUpKind::Shield => "Shield",
            PowerUpKind::Ghost => "Ghost Mode",
        }
    }

    /// How long the effect stays active after collection.
    pub fn duration(self) -> Duration {
        let millis = match self {
            PowerUpKind::Speed => 10_000,
            PowerUpKind::Size => 15_000,
            PowerUpKind::Magnet => 8_000,
            PowerUpKind::Shield => 12_000,
            PowerUpKind::Ghost => 6_000,
        };
        Duration::from_millis(millis)
    }
}
