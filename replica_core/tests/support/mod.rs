// Two participants wired through an in-process hub, ticked by hand.
#![allow(dead_code)]

use replica_core::domain::ports::Transport;
use replica_core::domain::{EntityId, Hit, Operation, OperationKind, ParticipantId};
use replica_core::interface_adapters::net::LoopbackHub;
use replica_core::use_cases::{LocalIntent, Participant, SessionSettings};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const OWNER: ParticipantId = ParticipantId(1);
pub const OBSERVER: ParticipantId = ParticipantId(2);

// Forwards to the hub and keeps a copy of every operation a participant sent.
pub struct Recorder {
    hub: Arc<LoopbackHub>,
    sent: Mutex<Vec<Operation>>,
}

impl Transport for Recorder {
    fn broadcast(&self, except: ParticipantId, op: &Operation) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(op.clone());
        }
        self.hub.broadcast(except, op);
    }
}

impl Recorder {
    pub fn count(&self, kind: OperationKind) -> usize {
        self.sent
            .lock()
            .expect("recorder lock")
            .iter()
            .filter(|op| op.kind() == kind)
            .count()
    }
}

pub struct Session {
    pub hub: Arc<LoopbackHub>,
    pub owner: Participant,
    pub observer: Participant,
    pub owner_sent: Arc<Recorder>,
    pub observer_sent: Arc<Recorder>,
}

fn join(
    hub: &Arc<LoopbackHub>,
    id: ParticipantId,
    settings: SessionSettings,
) -> (Participant, Arc<Recorder>) {
    let recorder = Arc::new(Recorder {
        hub: hub.clone(),
        sent: Mutex::new(Vec::new()),
    });
    let inbox = hub.connect(id);
    let participant = Participant::new(id, settings, recorder.clone(), Box::new(inbox));
    (participant, recorder)
}

impl Session {
    pub fn new() -> Self {
        Self::with_settings(SessionSettings::default())
    }

    pub fn with_settings(settings: SessionSettings) -> Self {
        let hub = LoopbackHub::new(256);
        let (owner, owner_sent) = join(&hub, OWNER, settings.clone());
        let (observer, observer_sent) = join(&hub, OBSERVER, settings);
        Self {
            hub,
            owner,
            observer,
            owner_sent,
            observer_sent,
        }
    }

    /// Spawns an owner entity and lets the observer learn about it.
    pub fn spawn(&mut self, archetype: &str) -> EntityId {
        let id = self.owner.spawn(archetype).expect("archetype should spawn");
        self.settle(Duration::ZERO);
        id
    }

    /// Advances both participants to `at` and delivers operations until both are idle.
    pub fn settle(&mut self, at: Duration) {
        loop {
            let received = self.owner.tick(at) + self.observer.tick(at);
            if received == 0 {
                break;
            }
        }
    }

    pub fn settle_secs(&mut self, secs: f32) {
        self.settle(Duration::from_secs_f32(secs));
    }

    pub fn owner_submit(&mut self, intent: LocalIntent) -> bool {
        let accepted = self.owner.submit(intent);
        let now = self.owner.now();
        self.settle(now);
        accepted
    }

    pub fn observer_submit(&mut self, intent: LocalIntent) -> bool {
        let accepted = self.observer.submit(intent);
        let now = self.observer.now();
        self.settle(now);
        accepted
    }
}

pub fn hit(target: EntityId, amount: f32) -> Hit {
    Hit {
        target,
        point: [0.0, 1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        amount,
        attacker: None,
        attack: None,
        stun_seconds: 0.0,
    }
}
