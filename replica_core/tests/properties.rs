mod support;

use proptest::prelude::*;
use replica_core::domain::tuning::Catalog;
use replica_core::domain::{AttackId, DeliveryTarget, EntityId, Operation, ParticipantId, Payload};
use replica_core::use_cases::{Applied, EntityRegistry, Ignored, LocalIntent, StateStore};
use std::sync::Arc;
use std::time::Duration;
use support::{OBSERVER, OWNER, Session};

fn spawned_store() -> (EntityRegistry, StateStore, EntityId) {
    let mut registry = EntityRegistry::new();
    let mut store = StateStore::new(OBSERVER, Arc::new(Catalog::builtin()), 16);
    let id = EntityId::compose(OWNER, 1);
    let spawn = Operation {
        target: id,
        origin: OWNER,
        seq: 1,
        delivery: DeliveryTarget::All,
        payload: Payload::Spawn {
            archetype: "soldier".to_string(),
        },
    };
    assert_eq!(store.apply(&mut registry, &spawn), Applied::Spawned);
    (registry, store, id)
}

fn op(target: EntityId, origin: ParticipantId, seq: u64, payload: Payload) -> Operation {
    Operation {
        target,
        origin,
        seq,
        delivery: DeliveryTarget::All,
        payload,
    }
}

#[derive(Debug, Clone)]
enum Step {
    Fire,
    Reload,
    Wait(u64),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => Just(Step::Fire),
        1 => Just(Step::Reload),
        2 => (50u64..2_000).prop_map(Step::Wait),
    ]
}

proptest! {
    #[test]
    fn damage_sequence_clamps_health_at_zero_and_depletes_once(
        amounts in prop::collection::vec(0.5f32..80.0, 1..20)
    ) {
        let (mut registry, mut store, id) = spawned_store();

        let mut expected = 100.0f32;
        let mut depleted = 0;
        for (serial, amount) in amounts.iter().enumerate() {
            let damage = Payload::Damage {
                amount: *amount,
                point: [0.0; 3],
                normal: [0.0; 3],
                attacker: None,
                attack: AttackId::local(OBSERVER, serial as u64),
                stun_seconds: 0.0,
            };
            let applied = store.apply(&mut registry, &op(id, OBSERVER, serial as u64 + 2, damage));
            match applied {
                Applied::Depleted { .. } => depleted += 1,
                Applied::Changed => {}
                Applied::Ignored(Ignored::NotAlive) => {
                    prop_assert_eq!(expected, 0.0);
                }
                other => {
                    prop_assert!(false, "unexpected outcome {:?}", other);
                }
            }
            if expected > 0.0 {
                expected = (expected - amount).max(0.0);
            }
        }

        let entity = registry.find(id).expect("entity");
        prop_assert_eq!(entity.health(), expected);
        prop_assert_eq!(depleted, usize::from(expected == 0.0));
        prop_assert_eq!(entity.is_alive(), expected > 0.0);
    }

    #[test]
    fn die_applied_repeatedly_is_the_same_as_once(times in 1usize..6) {
        let (mut registry, mut store, id) = spawned_store();

        let outcomes: Vec<Applied> = (0..times)
            .map(|n| {
                let die = op(id, OWNER, n as u64 + 2, Payload::Die { killer: None });
                store.apply(&mut registry, &die)
            })
            .collect();

        prop_assert_eq!(&outcomes[0], &Applied::Died);
        for outcome in &outcomes[1..] {
            prop_assert_eq!(outcome, &Applied::Ignored(Ignored::Duplicate));
        }
        let entity = registry.find(id).expect("entity");
        prop_assert_eq!(entity.health(), 0.0);
        prop_assert!(!entity.is_alive());
    }

    #[test]
    fn ammo_stays_within_magazine_bounds(steps in prop::collection::vec(step(), 1..40)) {
        let mut session = Session::new();
        let id = session.spawn("soldier");
        let mut now = Duration::ZERO;

        for step in steps {
            match step {
                Step::Fire => {
                    session.owner_submit(LocalIntent::FirePressed { entity: id });
                    session.owner_submit(LocalIntent::FireReleased { entity: id });
                }
                Step::Reload => {
                    session.owner_submit(LocalIntent::ReloadPressed { entity: id });
                }
                Step::Wait(ms) => {
                    now += Duration::from_millis(ms);
                    session.settle(now);
                }
            }

            for view in [&session.owner, &session.observer] {
                let ammo = view.entity(id).and_then(|e| e.ammo());
                prop_assert!(matches!(ammo, Some(0..=6)), "ammo {:?}", ammo);
            }
        }
    }
}
