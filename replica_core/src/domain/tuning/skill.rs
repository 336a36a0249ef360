use super::bounded_seconds;
use crate::domain::errors::InitError;
use serde::Deserialize;
use std::time::Duration;

// Gameplay tuning for skills and consumable items.

/// What a slot does once its cast completes.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkillEffect {
    /// Restore health on the caster.
    Heal { amount: f32 },
    /// Restore shield on the caster, up to its starting value.
    RestoreShield { amount: f32 },
    /// Multiply movement speed for a limited time.
    SpeedBoost { factor: f32, seconds: f32 },
    /// Fill the caster's magazine without a reload.
    RefillAmmo,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SlotTuning {
    pub name: String,
    pub effect: SkillEffect,

    /// Seconds the slot stays unavailable, counted from activation.
    #[serde(default)]
    pub cooldown: f32,

    /// Seconds between activation and the effect being applied.
    #[serde(default)]
    pub cast_time: f32,

    /// Remaining uses; `None` for skills that only have a cooldown.
    #[serde(default)]
    pub charges: Option<u32>,
}

impl SlotTuning {
    pub fn cooldown_duration(&self) -> Duration {
        Duration::from_secs_f32(self.cooldown)
    }

    pub fn cast_duration(&self) -> Duration {
        Duration::from_secs_f32(self.cast_time)
    }

    pub fn validate(&self) -> Result<(), InitError> {
        for (field, value) in [("cooldown", self.cooldown), ("cast_time", self.cast_time)] {
            if !bounded_seconds(value) {
                return Err(InitError::InvalidTuning {
                    field,
                    reason: "must be between zero and an hour",
                });
            }
        }

        let amount_ok = match self.effect {
            SkillEffect::Heal { amount } | SkillEffect::RestoreShield { amount } => {
                amount.is_finite() && amount > 0.0
            }
            SkillEffect::SpeedBoost { factor, seconds } => {
                factor.is_finite() && factor > 0.0 && bounded_seconds(seconds) && seconds > 0.0
            }
            SkillEffect::RefillAmmo => true,
        };
        if !amount_ok {
            return Err(InitError::InvalidTuning {
                field: "effect",
                reason: "effect amounts must be positive and finite",
            });
        }
        Ok(())
    }
}
