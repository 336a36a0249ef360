use crate::domain::errors::InitError;
use serde::Deserialize;

/// Gameplay tuning for entity survivability.
///
/// Keep this separate from runtime/session configuration (tick rates, buffer sizes, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct VitalsTuning {
    /// Health on spawn and after every revive; also the health ceiling.
    pub starting_health: f32,

    /// Shield on spawn and after every revive; also the shield ceiling.
    pub starting_shield: f32,
}

impl VitalsTuning {
    pub fn validate(&self) -> Result<(), InitError> {
        if !self.starting_health.is_finite() || self.starting_health <= 0.0 {
            return Err(InitError::InvalidTuning {
                field: "starting_health",
                reason: "must be positive and finite",
            });
        }
        if !self.starting_shield.is_finite() || self.starting_shield < 0.0 {
            return Err(InitError::InvalidTuning {
                field: "starting_shield",
                reason: "must be non-negative and finite",
            });
        }
        Ok(())
    }
}

impl Default for VitalsTuning {
    fn default() -> Self {
        Self {
            starting_health: 100.0,
            starting_shield: 50.0,
        }
    }
}
