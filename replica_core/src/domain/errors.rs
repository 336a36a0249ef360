// Domain-level errors for replication workflows.

use super::ids::EntityId;
use thiserror::Error;

/// Why a local intent was refused before anything was emitted.
///
/// These never reach the network; the dispatcher logs them and reports `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("entity is not known locally")]
    UnknownEntity,
    #[error("local participant is not authorized for this operation")]
    NotAuthorized,
    #[error("entity is not alive")]
    NotAlive,
    #[error("entity is stunned")]
    Stunned,
    #[error("input is disabled for this entity")]
    InputDisabled,
    #[error("shooting is disabled for this session")]
    ShootingDisabled,
    #[error("entity has no weapon")]
    NoWeapon,
    #[error("magazine is empty")]
    NoAmmo,
    #[error("weapon is reloading")]
    Reloading,
    #[error("fire interval has not elapsed")]
    FireCooldown,
    #[error("magazine is already full")]
    MagazineFull,
    #[error("slot does not exist")]
    InvalidSlot,
    #[error("slot is casting")]
    Casting,
    #[error("slot is on cooldown")]
    OnCooldown,
    #[error("item has no charges left")]
    NoCharges,
    #[error("amount must be positive and finite")]
    InvalidAmount,
}

/// Registry lookups and registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("entity {0} not found")]
    NotFound(EntityId),
    #[error("entity id {0} was already used in this session")]
    DuplicateId(EntityId),
}

/// Structural failures while initializing an entity. Fatal for that entity only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InitError {
    #[error("unknown archetype `{0}`")]
    UnknownArchetype(String),
    #[error("invalid tuning `{field}`: {reason}")]
    InvalidTuning {
        field: &'static str,
        reason: &'static str,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
