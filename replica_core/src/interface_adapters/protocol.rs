// Wire protocol DTOs and conversions for operations exchanged between participants.

use crate::domain::{
    AttackId, DeliveryTarget, EntityId, Field, FieldValue, Operation, ParticipantId, Payload, Slot,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown field `{0}`")]
    UnknownField(String),
}

/// One operation as sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDto {
    pub target: u64,
    pub origin: u32,
    pub seq: u64,
    pub delivery: DeliveryDto,
    pub payload: PayloadDto,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryDto {
    All,
    Others,
    ObserversOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotDto {
    Skill(u8),
    Item(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueDto {
    Float(f32),
    Bool(bool),
    Int(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackDto {
    pub source: u64,
    pub serial: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PayloadDto {
    Spawn {
        archetype: String,
    },
    Despawn,
    Damage {
        amount: f32,
        #[serde(default)]
        point: [f32; 3],
        #[serde(default)]
        normal: [f32; 3],
        #[serde(default)]
        attacker: Option<u64>,
        attack: AttackDto,
        #[serde(default)]
        stun_seconds: f32,
    },
    Heal {
        amount: f32,
    },
    Die {
        #[serde(default)]
        killer: Option<u64>,
    },
    Revive,
    Fire {
        pellets: u8,
        #[serde(default)]
        spread_degrees: f32,
    },
    Reload,
    UseSkill {
        slot: SlotDto,
    },
    InputToggle {
        enabled: bool,
    },
    SyncAmmo {
        ammo: u32,
        reloading: bool,
    },
    // Fields travel by name, e.g. `health` or `item[0].ready`.
    SyncState {
        field: String,
        value: ValueDto,
    },
}

pub fn encode(op: &Operation) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(&OperationDto::from(op))?)
}

pub fn decode(text: &str) -> Result<Operation, ProtocolError> {
    let dto: OperationDto = serde_json::from_str(text)?;
    Operation::try_from(dto)
}

/// Parses a field name as produced by `Field`'s `Display`.
pub fn parse_field(name: &str) -> Option<Field> {
    let field = match name {
        "spawned" => Field::Spawned,
        "health" => Field::Health,
        "shield" => Field::Shield,
        "alive" => Field::Alive,
        "stunned" => Field::Stunned,
        "input_enabled" => Field::InputEnabled,
        "ammo" => Field::Ammo,
        "reloading" => Field::Reloading,
        "shots_fired" => Field::ShotsFired,
        "speed_multiplier" => Field::SpeedMultiplier,
        other => {
            let slot = other.strip_suffix(".ready")?;
            Field::SlotReady(parse_slot(slot)?)
        }
    };
    Some(field)
}

fn parse_slot(name: &str) -> Option<Slot> {
    let (kind, rest) = name.split_once('[')?;
    let index = rest.strip_suffix(']')?.parse().ok()?;
    match kind {
        "skill" => Some(Slot::Skill(index)),
        "item" => Some(Slot::Item(index)),
        _ => None,
    }
}

impl From<&Operation> for OperationDto {
    fn from(op: &Operation) -> Self {
        Self {
            target: op.target.0,
            origin: op.origin.0,
            seq: op.seq,
            delivery: op.delivery.into(),
            payload: PayloadDto::from(&op.payload),
        }
    }
}

impl TryFrom<OperationDto> for Operation {
    type Error = ProtocolError;

    fn try_from(dto: OperationDto) -> Result<Self, Self::Error> {
        Ok(Self {
            target: EntityId(dto.target),
            origin: ParticipantId(dto.origin),
            seq: dto.seq,
            delivery: dto.delivery.into(),
            payload: Payload::try_from(dto.payload)?,
        })
    }
}

impl From<DeliveryTarget> for DeliveryDto {
    fn from(delivery: DeliveryTarget) -> Self {
        match delivery {
            DeliveryTarget::All => DeliveryDto::All,
            DeliveryTarget::Others => DeliveryDto::Others,
            DeliveryTarget::ObserversOnly => DeliveryDto::ObserversOnly,
        }
    }
}

impl From<DeliveryDto> for DeliveryTarget {
    fn from(delivery: DeliveryDto) -> Self {
        match delivery {
            DeliveryDto::All => DeliveryTarget::All,
            DeliveryDto::Others => DeliveryTarget::Others,
            DeliveryDto::ObserversOnly => DeliveryTarget::ObserversOnly,
        }
    }
}

impl From<Slot> for SlotDto {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Skill(i) => SlotDto::Skill(i),
            Slot::Item(i) => SlotDto::Item(i),
        }
    }
}

impl From<SlotDto> for Slot {
    fn from(slot: SlotDto) -> Self {
        match slot {
            SlotDto::Skill(i) => Slot::Skill(i),
            SlotDto::Item(i) => Slot::Item(i),
        }
    }
}

impl From<FieldValue> for ValueDto {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Float(v) => ValueDto::Float(v),
            FieldValue::Bool(v) => ValueDto::Bool(v),
            FieldValue::Int(v) => ValueDto::Int(v),
        }
    }
}

impl From<ValueDto> for FieldValue {
    fn from(value: ValueDto) -> Self {
        match value {
            ValueDto::Float(v) => FieldValue::Float(v),
            ValueDto::Bool(v) => FieldValue::Bool(v),
            ValueDto::Int(v) => FieldValue::Int(v),
        }
    }
}

impl From<&Payload> for PayloadDto {
    fn from(payload: &Payload) -> Self {
        match payload {
            Payload::Spawn { archetype } => PayloadDto::Spawn {
                archetype: archetype.clone(),
            },
            Payload::Despawn => PayloadDto::Despawn,
            Payload::Damage {
                amount,
                point,
                normal,
                attacker,
                attack,
                stun_seconds,
            } => PayloadDto::Damage {
                amount: *amount,
                point: *point,
                normal: *normal,
                attacker: attacker.map(|e| e.0),
                attack: AttackDto {
                    source: attack.source,
                    serial: attack.serial,
                },
                stun_seconds: *stun_seconds,
            },
            Payload::Heal { amount } => PayloadDto::Heal { amount: *amount },
            Payload::Die { killer } => PayloadDto::Die {
                killer: killer.map(|e| e.0),
            },
            Payload::Revive => PayloadDto::Revive,
            Payload::Fire {
                pellets,
                spread_degrees,
            } => PayloadDto::Fire {
                pellets: *pellets,
                spread_degrees: *spread_degrees,
            },
            Payload::Reload => PayloadDto::Reload,
            Payload::UseSkill { slot } => PayloadDto::UseSkill {
                slot: (*slot).into(),
            },
            Payload::InputToggle { enabled } => PayloadDto::InputToggle { enabled: *enabled },
            Payload::SyncAmmo { ammo, reloading } => PayloadDto::SyncAmmo {
                ammo: *ammo,
                reloading: *reloading,
            },
            Payload::SyncState { field, value } => PayloadDto::SyncState {
                field: field.to_string(),
                value: (*value).into(),
            },
        }
    }
}

impl TryFrom<PayloadDto> for Payload {
    type Error = ProtocolError;

    fn try_from(dto: PayloadDto) -> Result<Self, Self::Error> {
        Ok(match dto {
            PayloadDto::Spawn { archetype } => Payload::Spawn { archetype },
            PayloadDto::Despawn => Payload::Despawn,
            PayloadDto::Damage {
                amount,
                point,
                normal,
                attacker,
                attack,
                stun_seconds,
            } => Payload::Damage {
                amount,
                point,
                normal,
                attacker: attacker.map(EntityId),
                attack: AttackId {
                    source: attack.source,
                    serial: attack.serial,
                },
                stun_seconds,
            },
            PayloadDto::Heal { amount } => Payload::Heal { amount },
            PayloadDto::Die { killer } => Payload::Die {
                killer: killer.map(EntityId),
            },
            PayloadDto::Revive => Payload::Revive,
            PayloadDto::Fire {
                pellets,
                spread_degrees,
            } => Payload::Fire {
                pellets,
                spread_degrees,
            },
            PayloadDto::Reload => Payload::Reload,
            PayloadDto::UseSkill { slot } => Payload::UseSkill { slot: slot.into() },
            PayloadDto::InputToggle { enabled } => Payload::InputToggle { enabled },
            PayloadDto::SyncAmmo { ammo, reloading } => Payload::SyncAmmo { ammo, reloading },
            PayloadDto::SyncState { field, value } => Payload::SyncState {
                field: parse_field(&field).ok_or(ProtocolError::UnknownField(field))?,
                value: value.into(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(payload: Payload) -> Operation {
        Operation {
            target: EntityId::compose(ParticipantId(1), 3),
            origin: ParticipantId(2),
            seq: 9,
            delivery: DeliveryTarget::All,
            payload,
        }
    }

    #[test]
    fn when_damage_is_encoded_then_it_decodes_to_the_same_operation() {
        let sent = op(Payload::Damage {
            amount: 40.0,
            point: [1.0, 2.0, 3.0],
            normal: [0.0, 1.0, 0.0],
            attacker: Some(EntityId(7)),
            attack: AttackId::for_shot(EntityId(7), 4, 0),
            stun_seconds: 0.5,
        });

        let text = encode(&sent).expect("encode");
        assert!(text.contains(r#""type":"Damage""#), "{text}");
        assert_eq!(decode(&text).expect("decode"), sent);
    }

    #[test]
    fn when_slot_field_is_synced_then_name_survives_the_wire() {
        let sent = op(Payload::SyncState {
            field: Field::SlotReady(Slot::Item(2)),
            value: FieldValue::Bool(true),
        });

        let text = encode(&sent).expect("encode");
        assert!(text.contains("item[2].ready"), "{text}");
        assert_eq!(decode(&text).expect("decode"), sent);
    }

    #[test]
    fn when_field_name_is_unknown_then_decode_fails() {
        let text = r#"{"target":1,"origin":1,"seq":1,"delivery":"all",
            "payload":{"type":"SyncState","data":{"field":"mana","value":{"float":1.0}}}}"#;
        assert!(matches!(
            decode(text),
            Err(ProtocolError::UnknownField(name)) if name == "mana"
        ));
    }

    #[test]
    fn when_message_is_malformed_then_decode_fails() {
        assert!(matches!(decode("{not json"), Err(ProtocolError::Json(_))));
    }

    #[test]
    fn when_field_names_are_parsed_then_display_round_trips() {
        for field in [
            Field::Health,
            Field::InputEnabled,
            Field::SpeedMultiplier,
            Field::SlotReady(Slot::Skill(0)),
            Field::SlotReady(Slot::Item(12)),
        ] {
            assert_eq!(parse_field(&field.to_string()), Some(field));
        }
        assert_eq!(parse_field("skill[x].ready"), None);
        assert_eq!(parse_field("spell[0].ready"), None);
    }
}
