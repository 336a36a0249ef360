// Domain-level networked entities and their replicated fields.

use super::errors::InitError;
use super::ids::{EntityId, ParticipantId};
use super::tuning::EntityTuning;
use std::collections::BTreeMap;
use std::fmt;

/// A skill or item slot on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Skill(u8),
    Item(u8),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Skill(i) => write!(f, "skill[{i}]"),
            Slot::Item(i) => write!(f, "item[{i}]"),
        }
    }
}

/// Names of the replicated fields every participant keeps for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Spawned,
    Health,
    Shield,
    Alive,
    Stunned,
    InputEnabled,
    Ammo,
    Reloading,
    ShotsFired,
    SpeedMultiplier,
    SlotReady(Slot),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Spawned => f.write_str("spawned"),
            Field::Health => f.write_str("health"),
            Field::Shield => f.write_str("shield"),
            Field::Alive => f.write_str("alive"),
            Field::Stunned => f.write_str("stunned"),
            Field::InputEnabled => f.write_str("input_enabled"),
            Field::Ammo => f.write_str("ammo"),
            Field::Reloading => f.write_str("reloading"),
            Field::ShotsFired => f.write_str("shots_fired"),
            Field::SpeedMultiplier => f.write_str("speed_multiplier"),
            Field::SlotReady(slot) => write!(f, "{slot}.ready"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f32),
    Bool(bool),
    Int(i64),
}

impl FieldValue {
    pub fn as_float(self) -> Option<f32> {
        match self {
            FieldValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Int(v) => write!(f, "{v}"),
        }
    }
}

/// Current value plus the last write that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicatedField {
    pub value: FieldValue,
    pub writer: ParticipantId,
    pub seq: u64,
}

/// Alive → Dying (health hit zero, Die pending) → Dead (Die applied) → Alive (Revive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    Dying,
    Dead,
}

pub struct NetworkedEntity {
    pub id: EntityId,
    pub owner: ParticipantId,
    pub archetype: String,
    tuning: EntityTuning,
    life: LifeState,
    fields: BTreeMap<Field, ReplicatedField>,
}

impl NetworkedEntity {
    /// Builds an entity with every field at its starting value.
    ///
    /// Invalid tuning is a structural failure and aborts initialization.
    pub fn new(
        id: EntityId,
        owner: ParticipantId,
        archetype: impl Into<String>,
        tuning: EntityTuning,
    ) -> Result<Self, InitError> {
        tuning.validate()?;

        let mut initial = vec![
            (Field::Spawned, FieldValue::Bool(true)),
            (
                Field::Health,
                FieldValue::Float(tuning.vitals.starting_health),
            ),
            (
                Field::Shield,
                FieldValue::Float(tuning.vitals.starting_shield),
            ),
            (Field::Alive, FieldValue::Bool(true)),
            (Field::Stunned, FieldValue::Bool(false)),
            (Field::InputEnabled, FieldValue::Bool(true)),
            (Field::ShotsFired, FieldValue::Int(0)),
            (Field::SpeedMultiplier, FieldValue::Float(1.0)),
        ];
        if let Some(weapon) = &tuning.weapon {
            initial.push((Field::Ammo, FieldValue::Int(weapon.magazine as i64)));
            initial.push((Field::Reloading, FieldValue::Bool(false)));
        }
        for i in 0..tuning.skills.len() {
            initial.push((Field::SlotReady(Slot::Skill(i as u8)), FieldValue::Bool(true)));
        }
        for (i, item) in tuning.items.iter().enumerate() {
            let ready = item.charges != Some(0);
            initial.push((Field::SlotReady(Slot::Item(i as u8)), FieldValue::Bool(ready)));
        }

        let fields = initial
            .into_iter()
            .map(|(field, value)| {
                (
                    field,
                    ReplicatedField {
                        value,
                        writer: owner,
                        seq: 0,
                    },
                )
            })
            .collect();

        Ok(Self {
            id,
            owner,
            archetype: archetype.into(),
            tuning,
            life: LifeState::Alive,
            fields,
        })
    }

    pub fn tuning(&self) -> &EntityTuning {
        &self.tuning
    }

    pub fn life(&self) -> LifeState {
        self.life
    }

    pub fn is_owned_by(&self, participant: ParticipantId) -> bool {
        self.owner == participant
    }

    pub fn field(&self, field: Field) -> Option<&ReplicatedField> {
        self.fields.get(&field)
    }

    pub fn value(&self, field: Field) -> Option<FieldValue> {
        self.fields.get(&field).map(|f| f.value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, FieldValue)> + '_ {
        self.fields.iter().map(|(field, f)| (*field, f.value))
    }

    fn float(&self, field: Field) -> f32 {
        self.value(field).and_then(FieldValue::as_float).unwrap_or(0.0)
    }

    fn flag(&self, field: Field) -> bool {
        self.value(field).and_then(FieldValue::as_bool).unwrap_or(false)
    }

    pub fn health(&self) -> f32 {
        self.float(Field::Health)
    }

    pub fn shield(&self) -> f32 {
        self.float(Field::Shield)
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.float(Field::SpeedMultiplier)
    }

    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    pub fn is_stunned(&self) -> bool {
        self.flag(Field::Stunned)
    }

    pub fn input_enabled(&self) -> bool {
        self.flag(Field::InputEnabled)
    }

    pub fn is_reloading(&self) -> bool {
        self.flag(Field::Reloading)
    }

    pub fn slot_ready(&self, slot: Slot) -> bool {
        self.flag(Field::SlotReady(slot))
    }

    /// Rounds in the magazine; `None` when the entity carries no weapon.
    pub fn ammo(&self) -> Option<u32> {
        self.value(Field::Ammo)
            .and_then(FieldValue::as_int)
            .map(|v| v.clamp(0, u32::MAX as i64) as u32)
    }

    pub fn shots_fired(&self) -> i64 {
        self.value(Field::ShotsFired)
            .and_then(FieldValue::as_int)
            .unwrap_or(0)
    }

    pub fn magazine_capacity(&self) -> Option<u32> {
        self.tuning.weapon.as_ref().map(|w| w.magazine)
    }

    pub(crate) fn set_life(&mut self, life: LifeState) {
        self.life = life;
    }

    /// Writes a field and returns the previous value when it actually changed.
    ///
    /// Unknown fields are never created here; the field set is fixed at initialization.
    pub(crate) fn write(
        &mut self,
        field: Field,
        value: FieldValue,
        writer: ParticipantId,
        seq: u64,
    ) -> Option<FieldValue> {
        let slot = self.fields.get_mut(&field)?;
        let old = slot.value;
        slot.writer = writer;
        slot.seq = seq;
        if old == value {
            return None;
        }
        slot.value = value;
        Some(old)
    }
}
