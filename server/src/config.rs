use blobarena_shared::config::WorldConfig;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(10);

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub world: WorldConfig,
    /// Evict connections silent for longer than this. `None` never evicts.
    pub idle_timeout: Option<Duration>,
    /// Housekeeping period for idle eviction and power-up expiry
    pub sweep_interval: Duration,
    pub max_connections: usize,
    /// `None` seeds the world RNG from OS entropy
    pub rng_seed: Option<u64>,
    pub command_capacity: usize,
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            world: WorldConfig::default(),
            idle_timeout: Some(Duration::from_secs(30)),
            sweep_interval: Duration::from_millis(250),
            max_connections: 500,
            rng_seed: None,
            command_capacity: 1024,
            broadcast_capacity: 64,
        }
    }
}

impl ServerConfig {
    /// Build from process environment variables, see [`ServerConfig::from_lookup`].
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup, starting from defaults.
    ///
    /// Recognized keys: `PORT`, `BLOBARENA_FOOD_COUNT`, `BLOBARENA_POWER_UP_COUNT`,
    /// `BLOBARENA_IDLE_TIMEOUT_SECS` (0 disables), `BLOBARENA_MAX_CONNECTIONS`,
    /// `BLOBARENA_RNG_SEED`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(port) = parse::<u16>(&lookup, "PORT")? {
            config.listen_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(count) = parse::<u32>(&lookup, "BLOBARENA_FOOD_COUNT")? {
            config.world.food_count = count;
        }
        if let Some(count) = parse::<u32>(&lookup, "BLOBARENA_POWER_UP_COUNT")? {
            config.world.power_up_count = count;
        }
        if let Some(secs) = parse::<u64>(&lookup, "BLOBARENA_IDLE_TIMEOUT_SECS")? {
            config.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(max) = parse::<usize>(&lookup, "BLOBARENA_MAX_CONNECTIONS")? {
            config.max_connections = max;
        }
        if let Some(seed) = parse::<u64>(&lookup, "BLOBARENA_RNG_SEED")? {
            config.rng_seed = Some(seed);
        }

        Ok(config)
    }

    /// How often connection tasks ping their client. Browsers answer pings
    /// on their own, so a client that is open but silent stays live.
    pub fn ping_interval(&self) -> Duration {
        match self.idle_timeout {
            Some(timeout) => (timeout / 3).clamp(Duration::from_millis(1), DEFAULT_PING_INTERVAL),
            None => DEFAULT_PING_INTERVAL,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.world.validate()?;
        if self.sweep_interval.is_zero() {
            return Err("sweep_interval must be > 0".to_string());
        }
        if self.idle_timeout.is_some_and(|t| t.is_zero()) {
            return Err("idle_timeout must be > 0 when set".to_string());
        }
        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }
        if self.command_capacity == 0 || self.broadcast_capacity == 0 {
            return Err("channel capacities must be > 0".to_string());
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, String> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(None),
    }
}
