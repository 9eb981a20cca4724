/// World configuration, shared with clients in the welcome message.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WorldConfig {
    /// Fixed size of the food pool
    pub food_count: u32,
    /// Food spawns uniformly in [-extent, extent] on x and z
    pub food_half_extent: f64,
    /// Players spawn uniformly in [-extent, extent] on x and z
    pub spawn_half_extent: f64,
    /// Fixed size of the power-up pool
    pub power_up_count: u32,
    pub power_up_half_extent: f64,
    /// Power-ups float slightly above the ground plane
    pub power_up_height: f64,
    pub initial_size: f64,
    pub max_name_chars: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            food_count: 300,
            food_half_extent: 100.0,
            spawn_half_extent: 50.0,
            power_up_count: 6,
            power_up_half_extent: 90.0,
            power_up_height: 0.5,
            initial_size: 1.0,
            max_name_chars: 24,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.food_count == 0 {
            return Err("food_count must be > 0".to_string());
        }
        for (name, extent) in [
            ("food_half_extent", self.food_half_extent),
            ("spawn_half_extent", self.spawn_half_extent),
            ("power_up_half_extent", self.power_up_half_extent),
        ] {
            if !extent.is_finite() || extent <= 0.0 {
                return Err(format!("{} must be finite and > 0", name));
            }
        }
        if !self.power_up_height.is_finite() {
            return Err("power_up_height must be finite".to_string());
        }
        if !self.initial_size.is_finite() || self.initial_size <= 0.0 {
            return Err("initial_size must be finite and > 0".to_string());
        }
        if self.max_name_chars == 0 {
            return Err("max_name_chars must be > 0".to_string());
        }
        Ok(())
    }
}
