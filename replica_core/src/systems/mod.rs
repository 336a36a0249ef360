// Pure gameplay rules evaluated by the owner before emitting operations.

pub mod skill;
pub mod weapon;
