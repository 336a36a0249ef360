// Static per-archetype data loaded once at entity initialization.

pub mod skill;
pub mod vitals;
pub mod weapon;

pub use skill::{SkillEffect, SlotTuning};
pub use vitals::VitalsTuning;
pub use weapon::WeaponTuning;

use crate::domain::errors::InitError;
use serde::Deserialize;
use std::collections::HashMap;

/// Upper bound for every duration in tuning data, in seconds.
pub const MAX_TUNING_SECONDS: f32 = 3600.0;

fn bounded_seconds(value: f32) -> bool {
    value.is_finite() && (0.0..=MAX_TUNING_SECONDS).contains(&value)
}

/// Everything needed to initialize one entity. Immutable after spawn.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct EntityTuning {
    pub vitals: VitalsTuning,
    pub weapon: Option<WeaponTuning>,
    pub skills: Vec<SlotTuning>,
    pub items: Vec<SlotTuning>,
}

impl EntityTuning {
    pub fn validate(&self) -> Result<(), InitError> {
        self.vitals.validate()?;
        if let Some(weapon) = &self.weapon {
            weapon.validate()?;
        }
        for slot in self.skills.iter().chain(self.items.iter()) {
            slot.validate()?;
        }
        if self.skills.len() > u8::MAX as usize || self.items.len() > u8::MAX as usize {
            return Err(InitError::InvalidTuning {
                field: "slots",
                reason: "at most 255 skills and 255 items",
            });
        }
        Ok(())
    }
}

/// Archetype name to tuning. Shared read-only by every participant of a session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    pub archetypes: HashMap<String, EntityTuning>,
}

impl Catalog {
    pub fn get(&self, archetype: &str) -> Result<&EntityTuning, InitError> {
        self.archetypes
            .get(archetype)
            .ok_or_else(|| InitError::UnknownArchetype(archetype.to_string()))
    }

    /// Built-in archetypes used when no catalog file is configured.
    pub fn builtin() -> Self {
        let soldier = EntityTuning {
            vitals: VitalsTuning::default(),
            weapon: Some(WeaponTuning::default()),
            skills: vec![
                SlotTuning {
                    name: "patch_up".to_string(),
                    effect: SkillEffect::Heal { amount: 30.0 },
                    cooldown: 8.0,
                    cast_time: 1.0,
                    charges: None,
                },
                SlotTuning {
                    name: "sprint".to_string(),
                    effect: SkillEffect::SpeedBoost {
                        factor: 1.5,
                        seconds: 3.0,
                    },
                    cooldown: 12.0,
                    cast_time: 0.0,
                    charges: None,
                },
            ],
            items: vec![SlotTuning {
                name: "shield_cell".to_string(),
                effect: SkillEffect::RestoreShield { amount: 25.0 },
                cooldown: 1.0,
                cast_time: 0.5,
                charges: Some(2),
            }],
        };

        let gunner = EntityTuning {
            vitals: VitalsTuning {
                starting_health: 150.0,
                starting_shield: 0.0,
            },
            weapon: Some(WeaponTuning {
                damage: 8.0,
                fire_rate: 0.1,
                magazine: 30,
                reload_time: 2.5,
                automatic: true,
                ..WeaponTuning::default()
            }),
            skills: vec![SlotTuning {
                name: "ammo_drop".to_string(),
                effect: SkillEffect::RefillAmmo,
                cooldown: 20.0,
                cast_time: 0.5,
                charges: None,
            }],
            items: Vec::new(),
        };

        let projectile = EntityTuning {
            vitals: VitalsTuning {
                starting_health: 1.0,
                starting_shield: 0.0,
            },
            ..EntityTuning::default()
        };

        Self {
            archetypes: HashMap::from([
                ("soldier".to_string(), soldier),
                ("gunner".to_string(), gunner),
                ("projectile".to_string(), projectile),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_builtin_catalog_is_validated_then_every_archetype_passes() {
        let catalog = Catalog::builtin();
        for (name, tuning) in &catalog.archetypes {
            assert!(tuning.validate().is_ok(), "archetype {name} should be valid");
        }
    }

    #[test]
    fn when_archetype_is_missing_then_returns_unknown_archetype() {
        let catalog = Catalog::builtin();
        let result = catalog.get("tank");
        assert!(matches!(result, Err(InitError::UnknownArchetype(name)) if name == "tank"));
    }

    #[test]
    fn when_magazine_is_zero_then_validation_fails() {
        let tuning = EntityTuning {
            weapon: Some(WeaponTuning {
                magazine: 0,
                ..WeaponTuning::default()
            }),
            ..EntityTuning::default()
        };
        assert!(matches!(
            tuning.validate(),
            Err(InitError::InvalidTuning {
                field: "magazine",
                ..
            })
        ));
    }

    #[test]
    fn when_durations_exceed_the_bound_then_validation_fails() {
        let slow_gun = EntityTuning {
            weapon: Some(WeaponTuning {
                fire_rate: 1e30,
                ..WeaponTuning::default()
            }),
            ..EntityTuning::default()
        };
        assert!(matches!(
            slow_gun.validate(),
            Err(InitError::InvalidTuning {
                field: "fire_rate",
                ..
            })
        ));

        let endless_sprint = EntityTuning {
            skills: vec![SlotTuning {
                name: "sprint".to_string(),
                effect: SkillEffect::SpeedBoost {
                    factor: 2.0,
                    seconds: MAX_TUNING_SECONDS * 2.0,
                },
                cooldown: 1.0,
                cast_time: 0.0,
                charges: None,
            }],
            ..EntityTuning::default()
        };
        assert!(endless_sprint.validate().is_err());

        let long_cooldown = EntityTuning {
            items: vec![SlotTuning {
                name: "crate".to_string(),
                effect: SkillEffect::RefillAmmo,
                cooldown: 1e30,
                cast_time: 0.0,
                charges: Some(1),
            }],
            ..EntityTuning::default()
        };
        assert!(matches!(
            long_cooldown.validate(),
            Err(InitError::InvalidTuning {
                field: "cooldown",
                ..
            })
        ));
    }

    #[test]
    fn when_catalog_json_omits_optional_fields_then_defaults_apply() {
        let raw = r#"{
            "archetypes": {
                "medic": {
                    "vitals": { "starting_health": 80.0 },
                    "skills": [
                        { "name": "mend", "effect": { "kind": "heal", "amount": 40.0 }, "cooldown": 5.0 }
                    ]
                }
            }
        }"#;

        let catalog: Catalog = serde_json::from_str(raw).expect("catalog should parse");
        let medic = catalog.get("medic").expect("medic should exist");
        assert_eq!(medic.vitals.starting_health, 80.0);
        assert_eq!(medic.vitals.starting_shield, 50.0);
        assert!(medic.weapon.is_none());
        assert_eq!(medic.skills[0].effect, SkillEffect::Heal { amount: 40.0 });
        assert_eq!(medic.skills[0].cast_time, 0.0);
        assert!(medic.validate().is_ok());
    }
}
