use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::config::WorldConfig;
use crate::power_ups::PowerUpKind;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "players")]
    Players(PlayersMsg),
    #[serde(rename = "foods")]
    Foods(FoodsMsg),
    #[serde(rename = "powerUps")]
    PowerUps(PowerUpsMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub server_version: String,
    pub self_id: u32,
    pub players: Vec<PlayerWire>,
    pub config: WorldConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct PlayersMsg {
    pub players: Vec<PlayerWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct FoodsMsg {
    pub foods: Vec<FoodWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PowerUpsMsg {
    pub power_ups: Vec<PowerUpWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PlayerWire {
    pub id: u32,
    pub name: String,
    pub position: [f64; 3],
    pub size: f64,
    pub score: u32,
    pub skin_id: u32,
    pub color: u32,
    /// Active power-up effects
    #[serde(default)]
    pub power_ups: Vec<PowerUpKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct FoodWire {
    pub id: String,
    pub position: [f64; 3],
    pub color: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct PowerUpWire {
    pub id: String,
    pub kind: PowerUpKind,
    pub position: [f64; 3],
}

// === Client -> Server ===

/// Inbound events. Optional fields fall back to safe defaults, including when
/// present with the wrong type; a message missing a required field fails to
/// parse and is dropped.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "join")]
    Join {
        #[serde(default, deserialize_with = "lenient")]
        name: Option<String>,
        #[serde(default, rename = "skinId", deserialize_with = "lenient")]
        skin_id: Option<i32>,
    },
    #[serde(rename = "updatePosition")]
    UpdatePosition {
        position: [f64; 3],
        #[serde(default, deserialize_with = "lenient")]
        size: Option<f64>,
        #[serde(default, deserialize_with = "lenient")]
        score: Option<u32>,
    },
    #[serde(rename = "foodEaten")]
    FoodEaten {
        #[serde(rename = "foodId")]
        food_id: String,
    },
    #[serde(rename = "powerUpCollected")]
    PowerUpCollected {
        #[serde(rename = "powerUpId")]
        power_up_id: String,
    },
    #[serde(rename = "playerDied")]
    PlayerDied,
    #[serde(rename = "activity")]
    Activity,
}

/// Accept any JSON value; one that does not fit `T` becomes `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

// === Conversion helpers ===

/// Round to 4 decimal places (plenty for world coordinates, keeps JSON small)
#[inline]
pub fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}
