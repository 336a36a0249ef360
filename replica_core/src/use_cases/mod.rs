// Use cases layer: replication workflows for one participant.

pub mod authority;
pub mod dispatcher;
pub mod participant;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod types;

pub use authority::{Authority, authority_for, may_originate};
pub use dispatcher::{CommandDispatcher, Replica};
pub use participant::Participant;
pub use registry::EntityRegistry;
pub use scheduler::{Scheduler, TimerHandle};
pub use store::StateStore;
pub use types::{Applied, ChangeEvent, Ignored, LocalIntent, SessionSettings, TimerKey};
