use super::dispatcher::{CommandDispatcher, Replica};
use super::registry::EntityRegistry;
use super::scheduler::Scheduler;
use super::types::{Applied, ChangeEvent, LocalIntent, SessionSettings, TimerKey};
use crate::domain::ports::{Inbox, Transport};
use crate::systems::skill::SkillSlot;
use crate::domain::{EntityId, InitError, NetworkedEntity, Operation, ParticipantId, Slot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::trace;

/// One simulation participant: its replica, its dispatcher and its inbound queue.
///
/// Everything here runs on a single task. `tick` is the only place time advances.
pub struct Participant {
    id: ParticipantId,
    replica: Replica,
    dispatcher: CommandDispatcher,
    inbox: Box<dyn Inbox>,
}

impl Participant {
    pub fn new(
        id: ParticipantId,
        settings: SessionSettings,
        transport: Arc<dyn Transport>,
        inbox: Box<dyn Inbox>,
    ) -> Self {
        Self {
            id,
            replica: Replica::new(id, &settings),
            dispatcher: CommandDispatcher::new(id, settings, transport),
            inbox,
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// Runs expired timers, then applies queued remote operations, then held triggers.
    pub fn tick(&mut self, now: Duration) -> usize {
        self.dispatcher.run_timers(&mut self.replica, now);

        let ops = self.inbox.drain();
        let received = ops.len();
        for op in ops {
            self.receive(op);
        }

        self.dispatcher.auto_fire(&mut self.replica);
        if received > 0 {
            trace!(participant = %self.id, received, "tick");
        }
        received
    }

    pub fn receive(&mut self, op: Operation) -> Applied {
        self.dispatcher.receive(&mut self.replica, op)
    }

    pub fn spawn(&mut self, archetype: &str) -> Result<EntityId, InitError> {
        self.dispatcher.spawn(&mut self.replica, archetype)
    }

    pub fn submit(&mut self, intent: LocalIntent) -> bool {
        self.dispatcher.submit(&mut self.replica, intent)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.replica.store.subscribe()
    }

    pub fn entity(&self, id: EntityId) -> Option<&NetworkedEntity> {
        self.replica.registry.find(id).ok()
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.replica.registry
    }

    pub fn scheduler(&self) -> &Scheduler<TimerKey, ()> {
        &self.replica.scheduler
    }

    pub fn now(&self) -> Duration {
        self.replica.now()
    }

    pub fn slot(&self, entity: EntityId, slot: Slot) -> Option<&SkillSlot> {
        self.dispatcher.slot(entity, slot)
    }

    pub fn set_shooting_allowed(&mut self, allowed: bool) {
        self.dispatcher.set_shooting_allowed(allowed);
    }

    pub fn apply_speed_multiplier(
        &mut self,
        entity: EntityId,
        factor: f32,
        duration: Duration,
    ) -> bool {
        self.dispatcher
            .apply_speed_multiplier(&mut self.replica, entity, factor, duration)
    }

    pub fn clear_speed_multiplier(&mut self, entity: EntityId) -> bool {
        self.dispatcher
            .clear_speed_multiplier(&mut self.replica, entity)
    }
}
