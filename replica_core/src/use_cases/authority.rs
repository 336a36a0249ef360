// Authority table: who may originate which operation.

use crate::domain::{NetworkedEntity, OperationKind, ParticipantId};

/// Originator rule for one operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Only the participant that owns the target entity.
    Owner,
    /// Any participant that observed the triggering event (hit detection).
    AnyParticipant,
    /// Any participant; the originator becomes the owner of the new entity.
    Spawner,
}

pub fn authority_for(kind: OperationKind) -> Authority {
    match kind {
        OperationKind::Fire
        | OperationKind::Reload
        | OperationKind::UseSkill
        | OperationKind::InputToggle
        | OperationKind::Heal
        | OperationKind::Die
        | OperationKind::Revive
        | OperationKind::SyncAmmo
        | OperationKind::SyncState
        | OperationKind::Despawn => Authority::Owner,
        OperationKind::Damage => Authority::AnyParticipant,
        OperationKind::Spawn => Authority::Spawner,
    }
}

/// Consulted before an operation is queued for broadcast and again before a received
/// operation is applied.
///
/// Fails closed: when the target entity (and therefore its owner) is not resolved locally,
/// only `Spawn` is allowed.
pub fn may_originate(
    participant: ParticipantId,
    entity: Option<&NetworkedEntity>,
    kind: OperationKind,
) -> bool {
    match (authority_for(kind), entity) {
        (Authority::Spawner, None) => true,
        (Authority::Spawner, Some(_)) => false,
        (_, None) => false,
        (Authority::Owner, Some(entity)) => entity.is_owned_by(participant),
        (Authority::AnyParticipant, Some(_)) => true,
    }
}
