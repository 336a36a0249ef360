// Domain layer: entities, operations, tuning and rules.

pub mod entity;
pub mod errors;
pub mod ids;
pub mod operation;
pub mod ports;
pub mod tuning;

pub use entity::{Field, FieldValue, LifeState, NetworkedEntity, ReplicatedField, Slot};
pub use errors::{InitError, RegistryError, RejectReason};
pub use ids::{AttackId, EntityId, ParticipantId};
pub use operation::{
    DeliveryTarget, Hit, MAX_STUN_SECONDS, Operation, OperationKind, Payload, stun_duration,
};
