// Identifiers shared by every participant in a session.

use std::fmt;

/// A connected simulation participant (one client or host).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Session-stable entity identifier.
///
/// The high 32 bits name the participant that spawned the entity and the low 32 bits are
/// that participant's spawn counter, so ids minted on different participants never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    pub fn compose(spawner: ParticipantId, serial: u32) -> Self {
        Self(((spawner.0 as u64) << 32) | serial as u64)
    }

    pub fn spawner(self) -> ParticipantId {
        ParticipantId((self.0 >> 32) as u32)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0 >> 32, self.0 & 0xffff_ffff)
    }
}

/// One logical attack event (a shot, a pellet, a melee swing).
///
/// Every detector that reports the same attack must use the same id so only the first
/// Damage operation for it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttackId {
    pub source: u64,
    pub serial: u64,
}

impl AttackId {
    /// Attack id for one pellet of a shot, derivable by every participant that saw the
    /// shooter's `shots_fired` counter change.
    pub fn for_shot(shooter: EntityId, shot: u64, pellet: u8) -> Self {
        Self {
            source: shooter.0,
            serial: (shot << 8) | pellet as u64,
        }
    }

    /// Attack id for a hit whose detector cannot name the attack. Never shared.
    pub fn local(detector: ParticipantId, serial: u64) -> Self {
        Self {
            source: (1 << 63) | detector.0 as u64,
            serial,
        }
    }
}
