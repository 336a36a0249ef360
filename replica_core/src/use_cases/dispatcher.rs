// Command dispatcher: turns local intents into authorized, ordered operations.

use super::authority::may_originate;
use super::registry::EntityRegistry;
use super::scheduler::Scheduler;
use super::store::StateStore;
use super::types::{Applied, Ignored, LocalIntent, SessionSettings, TimerKey};
use crate::domain::ports::Transport;
use crate::systems::skill::SkillSlot;
use crate::systems::weapon::{self, Trigger};
use crate::domain::tuning::SkillEffect;
use crate::domain::{
    AttackId, DeliveryTarget, EntityId, Field, FieldValue, Hit, InitError, NetworkedEntity,
    Operation, OperationKind, ParticipantId, Payload, RegistryError, RejectReason, Slot,
    stun_duration,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Everything a participant replicates: entities, their fields and pending timers.
pub struct Replica {
    pub registry: EntityRegistry,
    pub store: StateStore,
    pub scheduler: Scheduler<TimerKey, ()>,
}

impl Replica {
    pub fn new(local: ParticipantId, settings: &SessionSettings) -> Self {
        Self {
            registry: EntityRegistry::new(),
            store: StateStore::new(local, settings.catalog.clone(), settings.event_capacity),
            scheduler: Scheduler::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }
}

/// Owner-local control state for one entity. Never replicated.
struct Control {
    trigger: Trigger,
    slots: BTreeMap<Slot, SkillSlot>,
}

impl Control {
    fn for_entity(entity: &NetworkedEntity) -> Self {
        let tuning = entity.tuning();
        let skills = tuning
            .skills
            .iter()
            .enumerate()
            .map(|(i, t)| (Slot::Skill(i as u8), t));
        let items = tuning
            .items
            .iter()
            .enumerate()
            .map(|(i, t)| (Slot::Item(i as u8), t));
        Self {
            trigger: Trigger::default(),
            slots: skills
                .chain(items)
                .map(|(slot, t)| (slot, SkillSlot::new(slot, t.clone())))
                .collect(),
        }
    }
}

pub struct CommandDispatcher {
    local: ParticipantId,
    settings: SessionSettings,
    transport: Arc<dyn Transport>,
    next_seq: u64,
    next_spawn: u32,
    controls: HashMap<EntityId, Control>,
}

impl CommandDispatcher {
    pub fn new(
        local: ParticipantId,
        settings: SessionSettings,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            local,
            settings,
            transport,
            next_seq: 0,
            next_spawn: 0,
            controls: HashMap::new(),
        }
    }

    pub fn local(&self) -> ParticipantId {
        self.local
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Session-level firing switch. Replaces any process-wide toggle.
    pub fn set_shooting_allowed(&mut self, allowed: bool) {
        self.settings.shooting_allowed = allowed;
    }

    /// Owner-local view of a slot, if the entity is controlled here.
    pub fn slot(&self, entity: EntityId, slot: Slot) -> Option<&SkillSlot> {
        self.controls.get(&entity)?.slots.get(&slot)
    }

    /// Spawns a locally owned entity. Missing or invalid configuration is fatal for it.
    pub fn spawn(&mut self, replica: &mut Replica, archetype: &str) -> Result<EntityId, InitError> {
        self.settings.catalog.get(archetype)?.validate()?;

        self.next_spawn += 1;
        let id = EntityId::compose(self.local, self.next_spawn);
        if replica.registry.was_used(id) {
            return Err(RegistryError::DuplicateId(id).into());
        }

        let payload = Payload::Spawn {
            archetype: archetype.to_string(),
        };
        match self.emit(replica, id, DeliveryTarget::All, payload) {
            Some(Applied::Spawned) => {
                info!(participant = %self.local, entity = %id, archetype, "entity spawned");
                Ok(id)
            }
            Some(Applied::Ignored(Ignored::InitFailed(e))) => Err(e),
            _ => Err(RegistryError::NotFound(id).into()),
        }
    }

    pub fn submit(&mut self, replica: &mut Replica, intent: LocalIntent) -> bool {
        let result = match &intent {
            LocalIntent::FirePressed { entity } => self.fire_pressed(replica, *entity),
            LocalIntent::FireReleased { entity } => self.fire_released(replica, *entity),
            LocalIntent::ReloadPressed { entity } => self.reload(replica, *entity),
            LocalIntent::SkillPressed { entity, index } => {
                self.use_slot(replica, *entity, Slot::Skill(*index))
            }
            LocalIntent::ItemPressed { entity, index } => {
                self.use_slot(replica, *entity, Slot::Item(*index))
            }
            LocalIntent::HitDetected(hit) => self.hit(replica, hit),
            LocalIntent::SetInputEnabled { entity, enabled } => {
                self.toggle_input(replica, *entity, *enabled)
            }
            LocalIntent::ResetCooldowns { entity } => self.reset_cooldowns(replica, *entity),
            LocalIntent::ReduceCooldown { entity, slot, by } => {
                self.reduce_cooldown(replica, *entity, *slot, *by)
            }
            LocalIntent::Despawn { entity } => self.despawn(replica, *entity),
        };

        match result {
            Ok(()) => true,
            Err(reason) => {
                debug!(participant = %self.local, ?intent, %reason, "intent rejected");
                false
            }
        }
    }

    /// Applies an operation received from another participant.
    pub fn receive(&mut self, replica: &mut Replica, op: Operation) -> Applied {
        if op.origin == self.local {
            return Applied::Ignored(Ignored::Duplicate);
        }

        let kind = op.kind();
        let entity = replica.registry.find(op.target).ok();
        if entity.is_none() && kind != OperationKind::Spawn {
            debug!(participant = %self.local, entity = %op.target, %kind, "operation for unknown entity");
            return Applied::Ignored(Ignored::UnknownEntity);
        }
        if !may_originate(op.origin, entity, kind) {
            warn!(
                participant = %self.local,
                origin = %op.origin,
                entity = %op.target,
                %kind,
                "unauthorized operation dropped"
            );
            return Applied::Ignored(Ignored::Unauthorized);
        }

        self.apply_and_react(replica, &op)
    }

    /// Advances the clock and runs every expired timer.
    pub fn run_timers(&mut self, replica: &mut Replica, now: Duration) {
        for (key, ()) in replica.scheduler.advance(now) {
            trace!(participant = %self.local, ?key, "timer expired");
            match key {
                TimerKey::Reload(entity) => self.finish_reload(replica, entity),
                TimerKey::Revive(entity) => self.revive(replica, entity),
                TimerKey::Cast(entity, slot) => self.execute_cast(replica, entity, slot),
                TimerKey::Cooldown(entity, slot) => self.finish_cooldown(replica, entity, slot),
                TimerKey::Stun(entity) => {
                    self.emit_owned(
                        replica,
                        entity,
                        Payload::SyncState {
                            field: Field::Stunned,
                            value: FieldValue::Bool(false),
                        },
                    );
                }
                TimerKey::SpeedBoost(entity) => {
                    self.emit_owned(
                        replica,
                        entity,
                        Payload::SyncState {
                            field: Field::SpeedMultiplier,
                            value: FieldValue::Float(1.0),
                        },
                    );
                }
            }
        }
    }

    /// Keeps automatic weapons firing while their trigger is held.
    pub fn auto_fire(&mut self, replica: &mut Replica) {
        let held: Vec<EntityId> = self
            .controls
            .iter()
            .filter(|(_, c)| c.trigger.held)
            .map(|(id, _)| *id)
            .collect();

        for entity in held {
            let automatic = replica
                .registry
                .find(entity)
                .ok()
                .and_then(|e| e.tuning().weapon.as_ref())
                .is_some_and(|w| w.automatic);
            if !automatic {
                continue;
            }
            if let Err(reason) = self.fire(replica, entity) {
                trace!(participant = %self.local, entity = %entity, %reason, "auto fire skipped");
            }
        }
    }

    /// Explicit capability for other systems to slow or speed an owned entity.
    pub fn apply_speed_multiplier(
        &mut self,
        replica: &mut Replica,
        entity: EntityId,
        factor: f32,
        duration: Duration,
    ) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let sent = self.emit_owned(
            replica,
            entity,
            Payload::SyncState {
                field: Field::SpeedMultiplier,
                value: FieldValue::Float(factor),
            },
        );
        if sent {
            replica
                .scheduler
                .schedule(TimerKey::SpeedBoost(entity), duration, ());
        }
        sent
    }

    pub fn clear_speed_multiplier(&mut self, replica: &mut Replica, entity: EntityId) -> bool {
        let sent = self.emit_owned(
            replica,
            entity,
            Payload::SyncState {
                field: Field::SpeedMultiplier,
                value: FieldValue::Float(1.0),
            },
        );
        if sent {
            replica.scheduler.cancel_key(&TimerKey::SpeedBoost(entity));
        }
        sent
    }

    // Creates the operation, sends it, then applies it locally when the originator is a
    // recipient. Sending first keeps follow-up operations (e.g. Die) behind their cause.
    fn emit(
        &mut self,
        replica: &mut Replica,
        target: EntityId,
        delivery: DeliveryTarget,
        payload: Payload,
    ) -> Option<Applied> {
        self.next_seq += 1;
        let op = Operation {
            target,
            origin: self.local,
            seq: self.next_seq,
            delivery,
            payload,
        };
        self.transport.broadcast(self.local, &op);

        match delivery {
            DeliveryTarget::All => Some(self.apply_and_react(replica, &op)),
            DeliveryTarget::Others | DeliveryTarget::ObserversOnly => None,
        }
    }

    // Emits an owner-only operation to everyone if this participant still owns the entity.
    fn emit_owned(&mut self, replica: &mut Replica, entity: EntityId, payload: Payload) -> bool {
        let kind = payload.kind();
        let allowed = may_originate(self.local, replica.registry.find(entity).ok(), kind);
        if allowed {
            self.emit(replica, entity, DeliveryTarget::All, payload);
        }
        allowed
    }

    fn apply_and_react(&mut self, replica: &mut Replica, op: &Operation) -> Applied {
        let applied = replica.store.apply(&mut replica.registry, op);
        let owned_here = replica
            .registry
            .find(op.target)
            .is_ok_and(|e| e.is_owned_by(self.local));

        match &applied {
            Applied::Spawned if owned_here => {
                if let Ok(entity) = replica.registry.find(op.target) {
                    self.controls.insert(op.target, Control::for_entity(entity));
                }
            }
            Applied::Depleted { killer } if owned_here => {
                info!(participant = %self.local, entity = %op.target, killer = ?killer, "health depleted");
                self.emit(
                    replica,
                    op.target,
                    DeliveryTarget::All,
                    Payload::Die { killer: *killer },
                );
            }
            Applied::Died if owned_here => self.on_died(replica, op.target),
            Applied::Revived if owned_here => {
                if let Some(control) = self.controls.get_mut(&op.target) {
                    control.trigger = Trigger::default();
                }
            }
            Applied::Changed if owned_here => match op.payload {
                Payload::Damage { stun_seconds, .. } => {
                    if let Some(stun) = stun_duration(stun_seconds) {
                        self.on_stunned(replica, op.target, stun);
                    }
                    self.sync_health(replica, op.target);
                }
                Payload::Heal { .. } => self.sync_health(replica, op.target),
                _ => {}
            },
            Applied::Despawned => {
                replica.scheduler.cancel_where(|k| k.entity() == op.target);
                self.controls.remove(&op.target);
            }
            Applied::Ignored(reason) => {
                debug!(participant = %self.local, entity = %op.target, kind = %op.kind(), ?reason, "operation ignored");
            }
            _ => {}
        }
        applied
    }

    fn on_died(&mut self, replica: &mut Replica, entity: EntityId) {
        replica.scheduler.cancel_where(|k| {
            k.entity() == entity && !matches!(k, TimerKey::Cooldown(..) | TimerKey::Revive(_))
        });
        if let Some(control) = self.controls.get_mut(&entity) {
            control.trigger = Trigger::default();
            for slot in control.slots.values_mut() {
                slot.cancel();
            }
        }
        replica
            .scheduler
            .schedule(TimerKey::Revive(entity), self.settings.revive_delay, ());
        info!(participant = %self.local, entity = %entity, delay = ?self.settings.revive_delay, "revive scheduled");
    }

    // Observers may have seen this delta in another order relative to other deltas.
    fn sync_health(&mut self, replica: &mut Replica, entity: EntityId) {
        let Ok(found) = replica.registry.find(entity) else {
            return;
        };
        let health = found.health();
        self.emit(
            replica,
            entity,
            DeliveryTarget::Others,
            Payload::SyncState {
                field: Field::Health,
                value: FieldValue::Float(health),
            },
        );
    }

    fn on_stunned(&mut self, replica: &mut Replica, entity: EntityId, stun: Duration) {
        replica.scheduler.schedule(TimerKey::Stun(entity), stun, ());
        if let Some(control) = self.controls.get_mut(&entity) {
            control.trigger.held = false;
            for (slot, state) in control.slots.iter_mut() {
                if state.cancel() {
                    replica.scheduler.cancel_key(&TimerKey::Cast(entity, *slot));
                }
            }
        }
    }

    // Resolves the entity and checks the authority table before any emission.
    fn authorize<'r>(
        &self,
        replica: &'r Replica,
        entity: EntityId,
        kind: OperationKind,
    ) -> Result<&'r NetworkedEntity, RejectReason> {
        let found = replica
            .registry
            .find(entity)
            .map_err(|_| RejectReason::UnknownEntity)?;
        if !may_originate(self.local, Some(found), kind) || !self.controls.contains_key(&entity)
        {
            return Err(RejectReason::NotAuthorized);
        }
        Ok(found)
    }

    fn fire_pressed(&mut self, replica: &mut Replica, entity: EntityId) -> Result<(), RejectReason> {
        self.authorize(replica, entity, OperationKind::Fire)?;
        if let Some(control) = self.controls.get_mut(&entity) {
            control.trigger.held = true;
        }
        self.fire(replica, entity)
    }

    fn fire_released(&mut self, replica: &mut Replica, entity: EntityId) -> Result<(), RejectReason> {
        self.authorize(replica, entity, OperationKind::Fire)?;
        if let Some(control) = self.controls.get_mut(&entity) {
            control.trigger.held = false;
        }
        Ok(())
    }

    fn fire(&mut self, replica: &mut Replica, entity: EntityId) -> Result<(), RejectReason> {
        let now = replica.now();
        let found = self.authorize(replica, entity, OperationKind::Fire)?;
        let trigger = self
            .controls
            .get(&entity)
            .map(|c| c.trigger)
            .unwrap_or_default();
        let tuning = weapon::check_fire(found, &trigger, now, self.settings.shooting_allowed)?;
        let payload = Payload::Fire {
            pellets: tuning.pellets,
            spread_degrees: tuning.spread_degrees,
        };

        if let Some(control) = self.controls.get_mut(&entity) {
            control.trigger.last_fire = Some(now);
        }
        self.emit(replica, entity, DeliveryTarget::All, payload);

        let ammo = replica.registry.find(entity).ok().and_then(|e| e.ammo());
        if let Some(ammo) = ammo {
            self.emit(
                replica,
                entity,
                DeliveryTarget::ObserversOnly,
                Payload::SyncAmmo {
                    ammo,
                    reloading: false,
                },
            );
        }
        Ok(())
    }

    fn reload(&mut self, replica: &mut Replica, entity: EntityId) -> Result<(), RejectReason> {
        let found = self.authorize(replica, entity, OperationKind::Reload)?;
        let duration = weapon::check_reload(found)?;

        self.emit(replica, entity, DeliveryTarget::All, Payload::Reload);
        replica
            .scheduler
            .schedule(TimerKey::Reload(entity), duration, ());
        Ok(())
    }

    fn finish_reload(&mut self, replica: &mut Replica, entity: EntityId) {
        let capacity = replica
            .registry
            .find(entity)
            .ok()
            .and_then(|e| e.magazine_capacity());
        if let Some(ammo) = capacity {
            self.emit_owned(
                replica,
                entity,
                Payload::SyncAmmo {
                    ammo,
                    reloading: false,
                },
            );
        }
    }

    fn revive(&mut self, replica: &mut Replica, entity: EntityId) {
        let dead = replica
            .registry
            .find(entity)
            .is_ok_and(|e| !e.is_alive());
        if dead && self.emit_owned(replica, entity, Payload::Revive) {
            info!(participant = %self.local, entity = %entity, "entity revived");
        }
    }

    fn use_slot(
        &mut self,
        replica: &mut Replica,
        entity: EntityId,
        slot: Slot,
    ) -> Result<(), RejectReason> {
        let found = self.authorize(replica, entity, OperationKind::UseSkill)?;
        if !found.is_alive() {
            return Err(RejectReason::NotAlive);
        }
        if !found.input_enabled() {
            return Err(RejectReason::InputDisabled);
        }
        if found.is_stunned() {
            return Err(RejectReason::Stunned);
        }

        let start = self
            .controls
            .get_mut(&entity)
            .and_then(|c| c.slots.get_mut(&slot))
            .ok_or(RejectReason::InvalidSlot)?
            .start_cast()?;

        self.emit(replica, entity, DeliveryTarget::All, Payload::UseSkill { slot });
        if !start.cooldown.is_zero() {
            replica
                .scheduler
                .schedule(TimerKey::Cooldown(entity, slot), start.cooldown, ());
        }
        if start.cast.is_zero() {
            self.execute_cast(replica, entity, slot);
        } else {
            replica
                .scheduler
                .schedule(TimerKey::Cast(entity, slot), start.cast, ());
        }
        Ok(())
    }

    fn execute_cast(&mut self, replica: &mut Replica, entity: EntityId, slot: Slot) {
        let Some(state) = self
            .controls
            .get_mut(&entity)
            .and_then(|c| c.slots.get_mut(&slot))
        else {
            return;
        };
        let Some(effect) = state.execute() else {
            return;
        };
        let ready = state.is_ready();

        let Ok(found) = replica.registry.find(entity) else {
            return;
        };
        if found.is_alive() {
            debug!(participant = %self.local, entity = %entity, %slot, ?effect, "slot effect");
            match effect {
                SkillEffect::Heal { amount } => {
                    self.emit_owned(replica, entity, Payload::Heal { amount });
                }
                SkillEffect::RestoreShield { amount } => {
                    let shield = found.shield() + amount;
                    self.emit_owned(
                        replica,
                        entity,
                        Payload::SyncState {
                            field: Field::Shield,
                            value: FieldValue::Float(shield),
                        },
                    );
                }
                SkillEffect::SpeedBoost { factor, seconds } => {
                    self.apply_speed_multiplier(
                        replica,
                        entity,
                        factor,
                        Duration::from_secs_f32(seconds),
                    );
                }
                SkillEffect::RefillAmmo => {
                    if let Some(ammo) = found.magazine_capacity() {
                        replica.scheduler.cancel_key(&TimerKey::Reload(entity));
                        self.emit_owned(
                            replica,
                            entity,
                            Payload::SyncAmmo {
                                ammo,
                                reloading: false,
                            },
                        );
                    }
                }
            }
        }

        if ready {
            self.mark_ready(replica, entity, slot);
        }
    }

    fn finish_cooldown(&mut self, replica: &mut Replica, entity: EntityId, slot: Slot) {
        let ready = self
            .controls
            .get_mut(&entity)
            .and_then(|c| c.slots.get_mut(&slot))
            .is_some_and(|s| s.finish());
        if ready {
            self.mark_ready(replica, entity, slot);
        }
    }

    fn mark_ready(&mut self, replica: &mut Replica, entity: EntityId, slot: Slot) {
        self.emit_owned(
            replica,
            entity,
            Payload::SyncState {
                field: Field::SlotReady(slot),
                value: FieldValue::Bool(true),
            },
        );
    }

    fn reset_cooldowns(&mut self, replica: &mut Replica, entity: EntityId) -> Result<(), RejectReason> {
        self.authorize(replica, entity, OperationKind::SyncState)?;
        let slots: Vec<Slot> = self
            .controls
            .get(&entity)
            .map(|c| c.slots.keys().copied().collect())
            .unwrap_or_default();
        for slot in slots {
            self.clear_cooldown(replica, entity, slot);
        }
        Ok(())
    }

    fn reduce_cooldown(
        &mut self,
        replica: &mut Replica,
        entity: EntityId,
        slot: Slot,
        by: Duration,
    ) -> Result<(), RejectReason> {
        self.authorize(replica, entity, OperationKind::SyncState)?;
        let key = TimerKey::Cooldown(entity, slot);
        let Some(remaining) = replica.scheduler.remaining(&key) else {
            return Err(RejectReason::InvalidSlot);
        };
        if remaining <= by {
            self.clear_cooldown(replica, entity, slot);
        } else {
            replica.scheduler.schedule(key, remaining - by, ());
        }
        Ok(())
    }

    fn clear_cooldown(&mut self, replica: &mut Replica, entity: EntityId, slot: Slot) {
        replica.scheduler.cancel_key(&TimerKey::Cooldown(entity, slot));
        let ready = self
            .controls
            .get_mut(&entity)
            .and_then(|c| c.slots.get_mut(&slot))
            .is_some_and(|s| s.reset() && s.is_ready());
        if ready {
            self.mark_ready(replica, entity, slot);
        }
    }

    fn toggle_input(
        &mut self,
        replica: &mut Replica,
        entity: EntityId,
        enabled: bool,
    ) -> Result<(), RejectReason> {
        self.authorize(replica, entity, OperationKind::InputToggle)?;
        if !enabled {
            if let Some(control) = self.controls.get_mut(&entity) {
                control.trigger.held = false;
            }
        }
        self.emit(
            replica,
            entity,
            DeliveryTarget::All,
            Payload::InputToggle { enabled },
        );
        Ok(())
    }

    fn despawn(&mut self, replica: &mut Replica, entity: EntityId) -> Result<(), RejectReason> {
        self.authorize(replica, entity, OperationKind::Despawn)?;
        self.emit(replica, entity, DeliveryTarget::All, Payload::Despawn);
        info!(participant = %self.local, entity = %entity, "entity despawned");
        Ok(())
    }

    fn hit(&mut self, replica: &mut Replica, hit: &Hit) -> Result<(), RejectReason> {
        if !hit.amount.is_finite() || hit.amount <= 0.0 {
            return Err(RejectReason::InvalidAmount);
        }
        let target = replica
            .registry
            .find(hit.target)
            .map_err(|_| RejectReason::UnknownEntity)?;
        if !may_originate(self.local, Some(target), OperationKind::Damage) {
            return Err(RejectReason::NotAuthorized);
        }
        if !target.is_alive() {
            return Err(RejectReason::NotAlive);
        }

        let attack = hit
            .attack
            .unwrap_or_else(|| AttackId::local(self.local, self.next_seq + 1));
        let payload = Payload::Damage {
            amount: hit.amount,
            point: hit.point,
            normal: hit.normal,
            attacker: hit.attacker,
            attack,
            stun_seconds: stun_duration(hit.stun_seconds).map_or(0.0, |d| d.as_secs_f32()),
        };
        self.emit(replica, hit.target, DeliveryTarget::All, payload);
        Ok(())
    }
}
