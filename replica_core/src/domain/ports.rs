use crate::domain::ids::ParticipantId;
use crate::domain::operation::Operation;

// Port for the network used by the dispatcher to reach other participants.
//
// Sends are fire-and-forget: implementations queue without blocking and never report
// delivery back to the caller.
pub trait Transport: Send + Sync {
    fn broadcast(&self, except: ParticipantId, op: &Operation);
}

// Port for operations delivered to this participant, drained once per tick.
pub trait Inbox: Send {
    fn drain(&mut self) -> Vec<Operation>;
}
