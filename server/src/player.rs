use crate::registry::ConnectionId;
use blobarena_shared::power_ups::PowerUpKind;
use blobarena_shared::protocol::PlayerWire;
use rand::Rng;
use std::time::Instant;

/// Server-side mirror of a client's blob. Position, size and score are
/// whatever the client last reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: ConnectionId,
    pub name: String,
    pub position: [f64; 3],
    pub size: f64,
    pub score: u32,
    pub skin_id: u32,
    /// 0xRRGGBB, fixed for the session
    pub color: u32,
    pub effects: Vec<ActiveEffect>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveEffect {
    pub kind: PowerUpKind,
    pub expires_at: Instant,
}

impl Player {
    /// Activate `kind`, or push back its expiry if already active.
    pub fn apply_effect(&mut self, kind: PowerUpKind, now: Instant) {
        let expires_at = now + kind.duration();
        match self.effects.iter_mut().find(|e| e.kind == kind) {
            Some(effect) => effect.expires_at = expires_at,
            None => self.effects.push(ActiveEffect { kind, expires_at }),
        }
    }

    /// Drop effects that ran out. Returns true if any were removed.
    pub fn expire_effects(&mut self, now: Instant) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.expires_at > now);
        self.effects.len() != before
    }

    pub fn to_wire(&self) -> PlayerWire {
        PlayerWire {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            size: self.size,
            score: self.score,
            skin_id: self.skin_id,
            color: self.color,
            power_ups: self.effects.iter().map(|e| e.kind).collect(),
        }
    }
}

/// Trimmed and truncated client name, or `Player <id>` when blank.
pub fn display_name(requested: Option<&str>, id: ConnectionId, max_chars: usize) -> String {
    match requested.map(str::trim) {
        Some(name) if !name.is_empty() => name.chars().take(max_chars).collect(),
        _ => format!("Player {}", id),
    }
}

/// Random hue at fixed saturation/value, matching the pastel palette clients expect.
pub fn random_color(rng: &mut impl Rng) -> u32 {
    let hue = rng.gen_range(0.0..360.0);
    hsv_to_rgb(hue, 0.64, 0.88)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> u32 {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    let ri = ((r + m) * 255.0).round() as u32;
    let gi = ((g + m) * 255.0).round() as u32;
    let bi = ((b + m) * 255.0).round() as u32;

    (ri << 16) | (gi << 8) | bi
}
