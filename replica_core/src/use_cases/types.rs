// Use-case level inputs/outputs for a participant.

use crate::domain::tuning::Catalog;
use crate::domain::{EntityId, Field, FieldValue, Hit, InitError, Slot};
use std::sync::Arc;
use std::time::Duration;

/// Discrete signals from the input and collision layers.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalIntent {
    FirePressed { entity: EntityId },
    FireReleased { entity: EntityId },
    ReloadPressed { entity: EntityId },
    SkillPressed { entity: EntityId, index: u8 },
    ItemPressed { entity: EntityId, index: u8 },
    HitDetected(Hit),
    SetInputEnabled { entity: EntityId, enabled: bool },
    ResetCooldowns { entity: EntityId },
    ReduceCooldown { entity: EntityId, slot: Slot, by: Duration },
    Despawn { entity: EntityId },
}

/// Published by the store for every field mutation. `old` is `None` for the initial
/// values of a freshly spawned entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub entity: EntityId,
    pub field: Field,
    pub old: Option<FieldValue>,
    pub new: FieldValue,
}

/// Why an operation was accepted without effect. None of these are failures.
#[derive(Debug, Clone, PartialEq)]
pub enum Ignored {
    UnknownEntity,
    Unauthorized,
    /// Die on a dead entity, Revive on an alive one, or a replayed attack id.
    Duplicate,
    /// An absolute write older than the last one from the same originator.
    Stale,
    NotAlive,
    InvalidAmount,
    InvalidField,
    InitFailed(InitError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    Changed,
    /// Accepted, but every written value was already current.
    Unchanged,
    /// Damage took health to zero; the owner must follow up with Die.
    Depleted { killer: Option<EntityId> },
    Died,
    Revived,
    Spawned,
    Despawned,
    Ignored(Ignored),
}

impl Applied {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Applied::Ignored(_))
    }
}

/// Deferred work owned by one entity. The key keeps at most one timer per purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    Reload(EntityId),
    Revive(EntityId),
    Cast(EntityId, Slot),
    Cooldown(EntityId, Slot),
    Stun(EntityId),
    SpeedBoost(EntityId),
}

impl TimerKey {
    pub fn entity(&self) -> EntityId {
        match *self {
            TimerKey::Reload(e)
            | TimerKey::Revive(e)
            | TimerKey::Cast(e, _)
            | TimerKey::Cooldown(e, _)
            | TimerKey::Stun(e)
            | TimerKey::SpeedBoost(e) => e,
        }
    }
}

/// Per-session configuration handed to every participant explicitly.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Delay between Die and the automatic Revive.
    pub revive_delay: Duration,
    /// Session-wide switch for firing (e.g. disabled during a pre-match countdown).
    pub shooting_allowed: bool,
    /// Capacity of the change event broadcast channel.
    pub event_capacity: usize,
    /// Archetype data every participant initializes entities from.
    pub catalog: Arc<Catalog>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            revive_delay: Duration::from_secs(10),
            shooting_allowed: true,
            event_capacity: 128,
            catalog: Arc::new(Catalog::builtin()),
        }
    }
}
