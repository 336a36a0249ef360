// Broadcastable state-change requests.

use super::entity::{Field, FieldValue, Slot};
use super::ids::{AttackId, EntityId, ParticipantId};
use std::fmt;
use std::time::Duration;

/// Longest stun a single hit can apply.
pub const MAX_STUN_SECONDS: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Spawn,
    Despawn,
    Damage,
    Heal,
    Die,
    Revive,
    Fire,
    Reload,
    UseSkill,
    InputToggle,
    SyncAmmo,
    SyncState,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Who receives an operation.
///
/// `All` is applied by the originator immediately and sent to everyone else. `Others`
/// goes to everyone but the originator. `ObserversOnly` also skips the entity's owner.
/// Neither of the last two is applied by the originator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryTarget {
    All,
    Others,
    ObserversOnly,
}

/// Stun carried by a hit, capped at `MAX_STUN_SECONDS`. `None` when the hit does not stun.
pub fn stun_duration(seconds: f32) -> Option<Duration> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f32(seconds.min(MAX_STUN_SECONDS)).ok()
}

/// Raw hit data reported by the collision layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub target: EntityId,
    pub point: [f32; 3],
    pub normal: [f32; 3],
    pub amount: f32,
    pub attacker: Option<EntityId>,
    /// Shared id of the attack event, when the detector can name it.
    pub attack: Option<AttackId>,
    /// Seconds the target stays stunned; zero for none.
    pub stun_seconds: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Spawn {
        archetype: String,
    },
    Despawn,
    Damage {
        amount: f32,
        point: [f32; 3],
        normal: [f32; 3],
        attacker: Option<EntityId>,
        attack: AttackId,
        stun_seconds: f32,
    },
    Heal {
        amount: f32,
    },
    Die {
        killer: Option<EntityId>,
    },
    Revive,
    Fire {
        pellets: u8,
        spread_degrees: f32,
    },
    Reload,
    UseSkill {
        slot: Slot,
    },
    InputToggle {
        enabled: bool,
    },
    SyncAmmo {
        ammo: u32,
        reloading: bool,
    },
    SyncState {
        field: Field,
        value: FieldValue,
    },
}

impl Payload {
    pub fn kind(&self) -> OperationKind {
        match self {
            Payload::Spawn { .. } => OperationKind::Spawn,
            Payload::Despawn => OperationKind::Despawn,
            Payload::Damage { .. } => OperationKind::Damage,
            Payload::Heal { .. } => OperationKind::Heal,
            Payload::Die { .. } => OperationKind::Die,
            Payload::Revive => OperationKind::Revive,
            Payload::Fire { .. } => OperationKind::Fire,
            Payload::Reload => OperationKind::Reload,
            Payload::UseSkill { .. } => OperationKind::UseSkill,
            Payload::InputToggle { .. } => OperationKind::InputToggle,
            Payload::SyncAmmo { .. } => OperationKind::SyncAmmo,
            Payload::SyncState { .. } => OperationKind::SyncState,
        }
    }
}

/// One state change, created by a dispatcher and applied once per recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub target: EntityId,
    pub origin: ParticipantId,
    /// Per-originator monotonic sequence number.
    pub seq: u64,
    pub delivery: DeliveryTarget,
    pub payload: Payload,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        self.payload.kind()
    }
}
