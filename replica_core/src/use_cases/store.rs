// Replicated state store: the only place entity fields are mutated.

use super::registry::EntityRegistry;
use super::types::{Applied, ChangeEvent, Ignored};
use crate::domain::tuning::Catalog;
use crate::domain::{
    AttackId, EntityId, Field, FieldValue, LifeState, NetworkedEntity, Operation, ParticipantId,
    Payload, stun_duration,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

/// How many applied attack ids are remembered per entity for de-duplication.
const ATTACK_WINDOW: usize = 64;

pub struct StateStore {
    local: ParticipantId,
    catalog: Arc<Catalog>,
    events: broadcast::Sender<ChangeEvent>,
    applied_attacks: HashMap<EntityId, VecDeque<AttackId>>,
}

impl StateStore {
    pub fn new(local: ParticipantId, catalog: Arc<Catalog>, event_capacity: usize) -> Self {
        let (events, _rx) = broadcast::channel(event_capacity.max(1));
        Self {
            local,
            catalog,
            events,
            applied_attacks: HashMap::new(),
        }
    }

    /// Presentation layers subscribe here; the store never learns who is listening.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    pub fn apply(&mut self, registry: &mut EntityRegistry, op: &Operation) -> Applied {
        match &op.payload {
            Payload::Spawn { archetype } => self.spawn(registry, op, archetype),
            Payload::Despawn => self.despawn(registry, op),
            Payload::Damage {
                amount,
                attacker,
                attack,
                stun_seconds,
                ..
            } => self.damage(registry, op, *amount, *attacker, *attack, *stun_seconds),
            Payload::Heal { amount } => self.heal(registry, op, *amount),
            Payload::Die { .. } => self.die(registry, op),
            Payload::Revive => self.revive(registry, op),
            Payload::Fire { .. } => self.fire(registry, op),
            Payload::Reload => self.set(registry, op, Field::Reloading, FieldValue::Bool(true)),
            Payload::UseSkill { slot } => {
                self.set(registry, op, Field::SlotReady(*slot), FieldValue::Bool(false))
            }
            Payload::InputToggle { enabled } => {
                self.set(registry, op, Field::InputEnabled, FieldValue::Bool(*enabled))
            }
            Payload::SyncAmmo { ammo, reloading } => {
                self.sync_ammo(registry, op, *ammo, *reloading)
            }
            Payload::SyncState { field, value } => self.sync_state(registry, op, *field, *value),
        }
    }

    fn emit(&self, entity: EntityId, field: Field, old: Option<FieldValue>, new: FieldValue) {
        // No subscribers is fine.
        let _ = self.events.send(ChangeEvent {
            entity,
            field,
            old,
            new,
        });
    }

    fn write(
        &self,
        entity: &mut NetworkedEntity,
        op: &Operation,
        field: Field,
        value: FieldValue,
    ) -> bool {
        match entity.write(field, value, op.origin, op.seq) {
            Some(old) => {
                self.emit(entity.id, field, Some(old), value);
                true
            }
            None => false,
        }
    }

    fn outcome(changed: bool) -> Applied {
        if changed {
            Applied::Changed
        } else {
            Applied::Unchanged
        }
    }

    fn is_stale(entity: &NetworkedEntity, field: Field, op: &Operation) -> bool {
        entity
            .field(field)
            .is_some_and(|f| f.writer == op.origin && op.seq <= f.seq)
    }

    fn spawn(&mut self, registry: &mut EntityRegistry, op: &Operation, archetype: &str) -> Applied {
        if op.target.spawner() != op.origin {
            return Applied::Ignored(Ignored::Unauthorized);
        }

        let entity = self
            .catalog
            .get(archetype)
            .cloned()
            .and_then(|tuning| NetworkedEntity::new(op.target, op.origin, archetype, tuning))
            .and_then(|entity| {
                let initial: Vec<(Field, FieldValue)> = entity.fields().collect();
                registry.register(entity)?;
                Ok(initial)
            });

        match entity {
            Ok(initial) => {
                for (field, value) in initial {
                    self.emit(op.target, field, None, value);
                }
                Applied::Spawned
            }
            Err(e) => {
                error!(entity = %op.target, archetype, error = %e, "entity initialization failed");
                Applied::Ignored(Ignored::InitFailed(e))
            }
        }
    }

    fn despawn(&mut self, registry: &mut EntityRegistry, op: &Operation) -> Applied {
        match registry.unregister(op.target) {
            Ok(_) => {
                self.applied_attacks.remove(&op.target);
                self.emit(
                    op.target,
                    Field::Spawned,
                    Some(FieldValue::Bool(true)),
                    FieldValue::Bool(false),
                );
                Applied::Despawned
            }
            Err(_) => Applied::Ignored(Ignored::UnknownEntity),
        }
    }

    fn damage(
        &mut self,
        registry: &mut EntityRegistry,
        op: &Operation,
        amount: f32,
        attacker: Option<EntityId>,
        attack: AttackId,
        stun_seconds: f32,
    ) -> Applied {
        if !amount.is_finite() || amount <= 0.0 {
            return Applied::Ignored(Ignored::InvalidAmount);
        }

        // A despawned attacker is just an unknown attacker.
        let killer = attacker.filter(|id| {
            let known = registry.contains(*id);
            if !known {
                debug!(attacker = %id, target = %op.target, "damage from unknown attacker");
            }
            known
        });

        let Ok(entity) = registry.find_mut(op.target) else {
            return Applied::Ignored(Ignored::UnknownEntity);
        };
        if !entity.is_alive() {
            return Applied::Ignored(Ignored::NotAlive);
        }

        let seen = self.applied_attacks.entry(op.target).or_default();
        if seen.contains(&attack) {
            return Applied::Ignored(Ignored::Duplicate);
        }
        if seen.len() == ATTACK_WINDOW {
            seen.pop_front();
        }
        seen.push_back(attack);

        let health = (entity.health() - amount).max(0.0);
        self.write(entity, op, Field::Health, FieldValue::Float(health));

        if health <= 0.0 {
            entity.set_life(LifeState::Dying);
            self.write(entity, op, Field::Alive, FieldValue::Bool(false));
            return Applied::Depleted { killer };
        }

        if stun_duration(stun_seconds).is_some() {
            self.write(entity, op, Field::Stunned, FieldValue::Bool(true));
        } else if stun_seconds != 0.0 {
            warn!(entity = %op.target, origin = %op.origin, stun_seconds, "invalid stun ignored");
        }
        Applied::Changed
    }

    fn heal(&mut self, registry: &mut EntityRegistry, op: &Operation, amount: f32) -> Applied {
        if !amount.is_finite() || amount <= 0.0 {
            return Applied::Ignored(Ignored::InvalidAmount);
        }
        let Ok(entity) = registry.find_mut(op.target) else {
            return Applied::Ignored(Ignored::UnknownEntity);
        };
        if !entity.is_alive() {
            return Applied::Ignored(Ignored::NotAlive);
        }

        let max = entity.tuning().vitals.starting_health;
        let health = (entity.health() + amount).min(max);
        let changed = self.write(entity, op, Field::Health, FieldValue::Float(health));
        Self::outcome(changed)
    }

    fn die(&mut self, registry: &mut EntityRegistry, op: &Operation) -> Applied {
        let Ok(entity) = registry.find_mut(op.target) else {
            return Applied::Ignored(Ignored::UnknownEntity);
        };
        if entity.life() == LifeState::Dead {
            return Applied::Ignored(Ignored::Duplicate);
        }

        entity.set_life(LifeState::Dead);
        self.write(entity, op, Field::Health, FieldValue::Float(0.0));
        self.write(entity, op, Field::Alive, FieldValue::Bool(false));
        Applied::Died
    }

    fn revive(&mut self, registry: &mut EntityRegistry, op: &Operation) -> Applied {
        let Ok(entity) = registry.find_mut(op.target) else {
            return Applied::Ignored(Ignored::UnknownEntity);
        };
        if entity.is_alive() {
            return Applied::Ignored(Ignored::Duplicate);
        }

        let vitals = entity.tuning().vitals;
        let magazine = entity.magazine_capacity();
        entity.set_life(LifeState::Alive);
        self.write(entity, op, Field::Health, FieldValue::Float(vitals.starting_health));
        self.write(entity, op, Field::Shield, FieldValue::Float(vitals.starting_shield));
        self.write(entity, op, Field::Stunned, FieldValue::Bool(false));
        self.write(entity, op, Field::SpeedMultiplier, FieldValue::Float(1.0));
        if let Some(magazine) = magazine {
            self.write(entity, op, Field::Ammo, FieldValue::Int(magazine as i64));
            self.write(entity, op, Field::Reloading, FieldValue::Bool(false));
        }
        self.write(entity, op, Field::Alive, FieldValue::Bool(true));
        Applied::Revived
    }

    fn fire(&mut self, registry: &mut EntityRegistry, op: &Operation) -> Applied {
        let local = self.local;
        let Ok(entity) = registry.find_mut(op.target) else {
            return Applied::Ignored(Ignored::UnknownEntity);
        };
        // A local Dying view is provisional; only a confirmed death stops the owner's shots.
        if entity.life() == LifeState::Dead {
            return Applied::Ignored(Ignored::NotAlive);
        }

        let shots = entity.shots_fired() + 1;
        self.write(entity, op, Field::ShotsFired, FieldValue::Int(shots));

        // Only the owner counts rounds; observers mirror them through SyncAmmo.
        if entity.is_owned_by(local) {
            if let Some(ammo) = entity.ammo() {
                let ammo = ammo.saturating_sub(1);
                self.write(entity, op, Field::Ammo, FieldValue::Int(ammo as i64));
            }
        }
        Applied::Changed
    }

    fn set(
        &mut self,
        registry: &mut EntityRegistry,
        op: &Operation,
        field: Field,
        value: FieldValue,
    ) -> Applied {
        let Ok(entity) = registry.find_mut(op.target) else {
            return Applied::Ignored(Ignored::UnknownEntity);
        };
        if entity.field(field).is_none() {
            return Applied::Ignored(Ignored::InvalidField);
        }
        let changed = self.write(entity, op, field, value);
        Self::outcome(changed)
    }

    fn sync_ammo(
        &mut self,
        registry: &mut EntityRegistry,
        op: &Operation,
        ammo: u32,
        reloading: bool,
    ) -> Applied {
        let Ok(entity) = registry.find_mut(op.target) else {
            return Applied::Ignored(Ignored::UnknownEntity);
        };
        let Some(capacity) = entity.magazine_capacity() else {
            return Applied::Ignored(Ignored::InvalidField);
        };
        if Self::is_stale(entity, Field::Ammo, op) {
            return Applied::Ignored(Ignored::Stale);
        }

        let ammo = ammo.min(capacity);
        let a = self.write(entity, op, Field::Ammo, FieldValue::Int(ammo as i64));
        let b = self.write(entity, op, Field::Reloading, FieldValue::Bool(reloading));
        Self::outcome(a || b)
    }

    fn sync_state(
        &mut self,
        registry: &mut EntityRegistry,
        op: &Operation,
        field: Field,
        value: FieldValue,
    ) -> Applied {
        let Ok(entity) = registry.find_mut(op.target) else {
            return Applied::Ignored(Ignored::UnknownEntity);
        };

        let value = match (field, value) {
            (Field::Stunned | Field::SlotReady(_), FieldValue::Bool(_)) => value,
            (Field::Health, FieldValue::Float(v)) if v.is_finite() => {
                let max = entity.tuning().vitals.starting_health;
                FieldValue::Float(v.clamp(0.0, max))
            }
            (Field::Shield, FieldValue::Float(v)) if v.is_finite() => {
                let max = entity.tuning().vitals.starting_shield;
                FieldValue::Float(v.clamp(0.0, max))
            }
            (Field::SpeedMultiplier, FieldValue::Float(v)) if v.is_finite() && v > 0.0 => value,
            _ => return Applied::Ignored(Ignored::InvalidField),
        };
        if entity.field(field).is_none() {
            return Applied::Ignored(Ignored::InvalidField);
        }
        if Self::is_stale(entity, field, op) {
            return Applied::Ignored(Ignored::Stale);
        }
        if field == Field::Health {
            return self.reconcile_health(entity, op, value);
        }

        let changed = self.write(entity, op, field, value);
        Self::outcome(changed)
    }

    // The owner's health after a delta it applied. Deltas clamp at zero, so views that saw
    // Damage and Heal in different orders can disagree until this arrives.
    fn reconcile_health(
        &mut self,
        entity: &mut NetworkedEntity,
        op: &Operation,
        value: FieldValue,
    ) -> Applied {
        if entity.life() == LifeState::Dead {
            return Applied::Ignored(Ignored::NotAlive);
        }

        let changed = self.write(entity, op, Field::Health, value);
        let alive = entity.health() > 0.0;
        match (entity.life(), alive) {
            (LifeState::Dying, true) => {
                debug!(entity = %entity.id, health = entity.health(), "owner kept entity alive");
                entity.set_life(LifeState::Alive);
                self.write(entity, op, Field::Alive, FieldValue::Bool(true));
                Applied::Changed
            }
            (LifeState::Alive, false) => {
                entity.set_life(LifeState::Dying);
                self.write(entity, op, Field::Alive, FieldValue::Bool(false));
                Applied::Changed
            }
            _ => Self::outcome(changed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeliveryTarget, Slot};

    const OWNER: ParticipantId = ParticipantId(1);
    const OBSERVER: ParticipantId = ParticipantId(2);

    struct Fixture {
        registry: EntityRegistry,
        store: StateStore,
        entity: EntityId,
        seq: u64,
    }

    impl Fixture {
        fn new(local: ParticipantId) -> Self {
            let mut fixture = Self {
                registry: EntityRegistry::new(),
                store: StateStore::new(local, Arc::new(Catalog::builtin()), 64),
                entity: EntityId::compose(OWNER, 1),
                seq: 0,
            };
            let spawned = fixture.apply(
                OWNER,
                Payload::Spawn {
                    archetype: "soldier".to_string(),
                },
            );
            assert_eq!(spawned, Applied::Spawned);
            fixture
        }

        fn apply(&mut self, origin: ParticipantId, payload: Payload) -> Applied {
            self.seq += 1;
            let op = Operation {
                target: self.entity,
                origin,
                seq: self.seq,
                delivery: DeliveryTarget::All,
                payload,
            };
            self.store.apply(&mut self.registry, &op)
        }

        fn damage(&mut self, amount: f32, serial: u64) -> Applied {
            self.apply(
                OBSERVER,
                Payload::Damage {
                    amount,
                    point: [0.0; 3],
                    normal: [0.0, 1.0, 0.0],
                    attacker: None,
                    attack: AttackId::local(OBSERVER, serial),
                    stun_seconds: 0.0,
                },
            )
        }

        fn entity(&self) -> &NetworkedEntity {
            self.registry.find(self.entity).expect("entity")
        }
    }

    #[test]
    fn when_damage_crosses_zero_then_entity_is_depleted_once() {
        let mut fx = Fixture::new(OWNER);
        assert_eq!(fx.damage(60.0, 1), Applied::Changed);
        assert_eq!(fx.entity().health(), 40.0);
        assert!(fx.entity().is_alive());

        assert_eq!(fx.damage(50.0, 2), Applied::Depleted { killer: None });
        assert_eq!(fx.entity().health(), 0.0);
        assert_eq!(fx.entity().value(Field::Alive), Some(FieldValue::Bool(false)));

        assert_eq!(fx.damage(10.0, 3), Applied::Ignored(Ignored::NotAlive));
        assert_eq!(fx.entity().health(), 0.0);
    }

    #[test]
    fn when_attack_id_repeats_then_damage_is_applied_once() {
        let mut fx = Fixture::new(OWNER);
        assert_eq!(fx.damage(10.0, 7), Applied::Changed);
        assert_eq!(fx.damage(10.0, 7), Applied::Ignored(Ignored::Duplicate));
        assert_eq!(fx.entity().health(), 90.0);
    }

    #[test]
    fn when_damage_amount_is_not_positive_then_it_is_ignored() {
        let mut fx = Fixture::new(OWNER);
        assert_eq!(fx.damage(0.0, 1), Applied::Ignored(Ignored::InvalidAmount));
        assert_eq!(fx.damage(f32::NAN, 2), Applied::Ignored(Ignored::InvalidAmount));
        assert_eq!(fx.entity().health(), 100.0);
    }

    #[test]
    fn when_attacker_is_unknown_then_damage_still_applies_without_killer() {
        let mut fx = Fixture::new(OWNER);
        let result = fx.apply(
            OBSERVER,
            Payload::Damage {
                amount: 100.0,
                point: [0.0; 3],
                normal: [0.0; 3],
                attacker: Some(EntityId(999)),
                attack: AttackId::local(OBSERVER, 1),
                stun_seconds: 0.0,
            },
        );
        assert_eq!(result, Applied::Depleted { killer: None });
    }

    #[test]
    fn when_die_is_applied_twice_then_second_is_duplicate() {
        let mut fx = Fixture::new(OWNER);
        assert_eq!(fx.apply(OWNER, Payload::Die { killer: None }), Applied::Died);
        let health = fx.entity().health();
        let life = fx.entity().life();
        assert_eq!(
            fx.apply(OWNER, Payload::Die { killer: None }),
            Applied::Ignored(Ignored::Duplicate)
        );
        assert_eq!(fx.entity().health(), health);
        assert_eq!(fx.entity().life(), life);
    }

    #[test]
    fn when_revived_after_death_then_starting_vitals_are_restored() {
        let mut fx = Fixture::new(OWNER);
        fx.apply(
            OWNER,
            Payload::SyncState {
                field: Field::Shield,
                value: FieldValue::Float(5.0),
            },
        );
        fx.damage(30.0, 1);
        fx.apply(OWNER, Payload::Die { killer: None });
        assert_eq!(fx.apply(OWNER, Payload::Revive), Applied::Revived);
        assert_eq!(fx.entity().health(), 100.0);
        assert_eq!(fx.entity().shield(), 50.0);
        assert!(fx.entity().is_alive());
        assert_eq!(
            fx.apply(OWNER, Payload::Revive),
            Applied::Ignored(Ignored::Duplicate)
        );
    }

    #[test]
    fn when_healing_then_health_is_capped_and_dead_entities_are_skipped() {
        let mut fx = Fixture::new(OWNER);
        fx.damage(20.0, 1);
        assert_eq!(fx.apply(OWNER, Payload::Heal { amount: 50.0 }), Applied::Changed);
        assert_eq!(fx.entity().health(), 100.0);
        assert_eq!(
            fx.apply(OWNER, Payload::Heal { amount: -5.0 }),
            Applied::Ignored(Ignored::InvalidAmount)
        );
        fx.apply(OWNER, Payload::Die { killer: None });
        assert_eq!(
            fx.apply(OWNER, Payload::Heal { amount: 10.0 }),
            Applied::Ignored(Ignored::NotAlive)
        );
    }

    #[test]
    fn when_owner_applies_fire_then_ammo_decrements() {
        let mut fx = Fixture::new(OWNER);
        let fire = Payload::Fire {
            pellets: 1,
            spread_degrees: 0.0,
        };
        fx.apply(OWNER, fire);
        assert_eq!(fx.entity().ammo(), Some(5));
        assert_eq!(fx.entity().shots_fired(), 1);
    }

    #[test]
    fn when_observer_applies_fire_then_only_shot_counter_changes() {
        let mut fx = Fixture::new(OBSERVER);
        fx.apply(
            OWNER,
            Payload::Fire {
                pellets: 1,
                spread_degrees: 0.0,
            },
        );
        assert_eq!(fx.entity().ammo(), Some(6));
        assert_eq!(fx.entity().shots_fired(), 1);
    }

    #[test]
    fn when_ammo_sync_exceeds_capacity_then_it_is_clamped() {
        let mut fx = Fixture::new(OBSERVER);
        fx.apply(
            OWNER,
            Payload::SyncAmmo {
                ammo: 99,
                reloading: false,
            },
        );
        assert_eq!(fx.entity().ammo(), Some(6));
    }

    #[test]
    fn when_ammo_sync_arrives_out_of_order_then_stale_write_is_ignored() {
        let mut fx = Fixture::new(OBSERVER);
        let newer = Operation {
            target: fx.entity,
            origin: OWNER,
            seq: 10,
            delivery: DeliveryTarget::ObserversOnly,
            payload: Payload::SyncAmmo {
                ammo: 3,
                reloading: false,
            },
        };
        let older = Operation {
            seq: 9,
            payload: Payload::SyncAmmo {
                ammo: 4,
                reloading: false,
            },
            ..newer.clone()
        };
        assert_eq!(fx.store.apply(&mut fx.registry, &newer), Applied::Changed);
        assert_eq!(
            fx.store.apply(&mut fx.registry, &older),
            Applied::Ignored(Ignored::Stale)
        );
        assert_eq!(fx.entity().ammo(), Some(3));
    }

    #[test]
    fn when_sync_state_targets_protected_field_then_it_is_rejected() {
        let mut fx = Fixture::new(OWNER);
        let result = fx.apply(
            OWNER,
            Payload::SyncState {
                field: Field::Alive,
                value: FieldValue::Bool(false),
            },
        );
        assert_eq!(result, Applied::Ignored(Ignored::InvalidField));
        let result = fx.apply(
            OWNER,
            Payload::SyncState {
                field: Field::Ammo,
                value: FieldValue::Int(1),
            },
        );
        assert_eq!(result, Applied::Ignored(Ignored::InvalidField));
        let result = fx.apply(
            OWNER,
            Payload::SyncState {
                field: Field::SpeedMultiplier,
                value: FieldValue::Float(0.0),
            },
        );
        assert_eq!(result, Applied::Ignored(Ignored::InvalidField));
    }

    #[test]
    fn when_owner_health_arrives_for_a_dying_view_then_entity_is_alive_again() {
        let mut fx = Fixture::new(OBSERVER);
        assert_eq!(fx.damage(100.0, 1), Applied::Depleted { killer: None });
        assert_eq!(fx.entity().life(), LifeState::Dying);

        let result = fx.apply(
            OWNER,
            Payload::SyncState {
                field: Field::Health,
                value: FieldValue::Float(20.0),
            },
        );
        assert_eq!(result, Applied::Changed);
        assert_eq!(fx.entity().life(), LifeState::Alive);
        assert_eq!(fx.entity().health(), 20.0);
        assert_eq!(fx.entity().value(Field::Alive), Some(FieldValue::Bool(true)));
        assert_eq!(fx.damage(5.0, 2), Applied::Changed);
    }

    #[test]
    fn when_owner_health_arrives_after_die_then_it_is_ignored() {
        let mut fx = Fixture::new(OBSERVER);
        fx.apply(OWNER, Payload::Die { killer: None });
        let result = fx.apply(
            OWNER,
            Payload::SyncState {
                field: Field::Health,
                value: FieldValue::Float(50.0),
            },
        );
        assert_eq!(result, Applied::Ignored(Ignored::NotAlive));
        assert_eq!(fx.entity().health(), 0.0);
    }

    #[test]
    fn when_observer_view_is_dying_then_owner_shots_still_count() {
        let mut fx = Fixture::new(OBSERVER);
        fx.damage(100.0, 1);
        let fire = Payload::Fire {
            pellets: 1,
            spread_degrees: 0.0,
        };
        assert_eq!(fx.apply(OWNER, fire.clone()), Applied::Changed);
        assert_eq!(fx.entity().shots_fired(), 1);

        fx.apply(OWNER, Payload::Die { killer: None });
        assert_eq!(fx.apply(OWNER, fire), Applied::Ignored(Ignored::NotAlive));
    }

    #[test]
    fn when_stun_is_not_finite_then_damage_applies_without_stun() {
        let mut fx = Fixture::new(OWNER);
        let result = fx.apply(
            OBSERVER,
            Payload::Damage {
                amount: 5.0,
                point: [0.0; 3],
                normal: [0.0; 3],
                attacker: None,
                attack: AttackId::local(OBSERVER, 1),
                stun_seconds: f32::INFINITY,
            },
        );
        assert_eq!(result, Applied::Changed);
        assert_eq!(fx.entity().health(), 95.0);
        assert!(!fx.entity().is_stunned());
    }

    #[test]
    fn when_skill_is_used_then_slot_is_marked_not_ready() {
        let mut fx = Fixture::new(OBSERVER);
        let slot = Slot::Skill(0);
        assert_eq!(fx.apply(OWNER, Payload::UseSkill { slot }), Applied::Changed);
        assert!(!fx.entity().slot_ready(slot));
        assert_eq!(
            fx.apply(
                OWNER,
                Payload::UseSkill {
                    slot: Slot::Skill(9)
                }
            ),
            Applied::Ignored(Ignored::InvalidField)
        );
    }

    #[test]
    fn when_field_changes_then_subscribers_receive_old_and_new_values() {
        let mut fx = Fixture::new(OWNER);
        let mut rx = fx.store.subscribe();
        fx.damage(25.0, 1);
        let event = rx.try_recv().expect("change event");
        assert_eq!(
            event,
            ChangeEvent {
                entity: fx.entity,
                field: Field::Health,
                old: Some(FieldValue::Float(100.0)),
                new: FieldValue::Float(75.0),
            }
        );
    }

    #[test]
    fn when_spawn_names_unknown_archetype_then_init_fails() {
        let mut registry = EntityRegistry::new();
        let mut store = StateStore::new(OWNER, Arc::new(Catalog::builtin()), 8);
        let op = Operation {
            target: EntityId::compose(OWNER, 5),
            origin: OWNER,
            seq: 1,
            delivery: DeliveryTarget::All,
            payload: Payload::Spawn {
                archetype: "dragon".to_string(),
            },
        };
        let result = store.apply(&mut registry, &op);
        assert!(matches!(
            result,
            Applied::Ignored(Ignored::InitFailed(crate::domain::InitError::UnknownArchetype(_)))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn when_spawn_id_belongs_to_another_participant_then_it_is_unauthorized() {
        let mut registry = EntityRegistry::new();
        let mut store = StateStore::new(OWNER, Arc::new(Catalog::builtin()), 8);
        let op = Operation {
            target: EntityId::compose(OBSERVER, 1),
            origin: OWNER,
            seq: 1,
            delivery: DeliveryTarget::All,
            payload: Payload::Spawn {
                archetype: "soldier".to_string(),
            },
        };
        assert_eq!(
            store.apply(&mut registry, &op),
            Applied::Ignored(Ignored::Unauthorized)
        );
    }

    #[test]
    fn when_entity_is_despawned_then_later_operations_see_unknown_entity() {
        let mut fx = Fixture::new(OWNER);
        assert_eq!(fx.apply(OWNER, Payload::Despawn), Applied::Despawned);
        assert_eq!(fx.damage(5.0, 1), Applied::Ignored(Ignored::UnknownEntity));
        assert_eq!(
            fx.apply(OWNER, Payload::Despawn),
            Applied::Ignored(Ignored::UnknownEntity)
        );
    }
}
