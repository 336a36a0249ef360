use super::bounded_seconds;
use crate::domain::errors::InitError;
use serde::Deserialize;
use std::time::Duration;

/// Gameplay tuning for hitscan and projectile weapons.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeaponTuning {
    /// Damage per pellet; hit detection reports it back in `HitDetected`.
    pub damage: f32,

    /// Maximum hit distance in world units (consumed by the collision layer).
    pub range: f32,

    /// Minimum seconds between two shots.
    pub fire_rate: f32,

    /// Rounds per magazine.
    pub magazine: u32,

    /// Seconds from reload start until the magazine is full again.
    pub reload_time: f32,

    /// Pellets per shot (shotguns fire more than one).
    pub pellets: u8,

    /// Cone half-angle in degrees used by the collision layer to spread pellets.
    pub spread_degrees: f32,

    /// Keep firing every tick while the trigger is held.
    pub automatic: bool,
}

impl WeaponTuning {
    pub fn fire_interval(&self) -> Duration {
        Duration::from_secs_f32(self.fire_rate)
    }

    pub fn reload_duration(&self) -> Duration {
        Duration::from_secs_f32(self.reload_time)
    }

    pub fn validate(&self) -> Result<(), InitError> {
        if self.magazine == 0 {
            return Err(InitError::InvalidTuning {
                field: "magazine",
                reason: "must hold at least one round",
            });
        }
        if !bounded_seconds(self.fire_rate) || self.fire_rate <= 0.0 {
            return Err(InitError::InvalidTuning {
                field: "fire_rate",
                reason: "must be positive and at most an hour",
            });
        }
        if !bounded_seconds(self.reload_time) {
            return Err(InitError::InvalidTuning {
                field: "reload_time",
                reason: "must be between zero and an hour",
            });
        }
        if self.pellets == 0 {
            return Err(InitError::InvalidTuning {
                field: "pellets",
                reason: "must fire at least one pellet",
            });
        }
        Ok(())
    }
}

impl Default for WeaponTuning {
    fn default() -> Self {
        Self {
            damage: 20.0,
            range: 100.0,
            fire_rate: 0.5,
            magazine: 6,
            reload_time: 1.5,
            pellets: 1,
            spread_degrees: 0.0,
            automatic: false,
        }
    }
}
