// In-process transport: every participant gets a bounded mailbox of encoded operations.

use crate::domain::{DeliveryTarget, ParticipantId};
use crate::domain::operation::Operation;
use crate::domain::ports::{Inbox, Transport};
use crate::interface_adapters::protocol::{decode, encode};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, error, warn};

/// Routes encoded operations between participants of one session.
///
/// Operations from one sender arrive at each receiver in send order. A full mailbox drops
/// the operation for that receiver only.
pub struct LoopbackHub {
    capacity: usize,
    peers: RwLock<HashMap<ParticipantId, mpsc::Sender<Arc<str>>>>,
}

impl LoopbackHub {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity: capacity.max(1),
            peers: RwLock::new(HashMap::new()),
        })
    }

    /// Registers a participant and returns its mailbox. Reconnecting replaces the old one.
    pub fn connect(&self, participant: ParticipantId) -> Mailbox {
        let (tx, rx) = mpsc::channel(self.capacity);
        match self.peers.write() {
            Ok(mut peers) => {
                peers.insert(participant, tx);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(participant, tx);
            }
        }
        debug!(participant = %participant, "participant connected");
        Mailbox { participant, rx }
    }

    pub fn disconnect(&self, participant: ParticipantId) -> bool {
        let removed = match self.peers.write() {
            Ok(mut peers) => peers.remove(&participant).is_some(),
            Err(poisoned) => poisoned.into_inner().remove(&participant).is_some(),
        };
        if removed {
            debug!(participant = %participant, "participant disconnected");
        }
        removed
    }

    pub fn participants(&self) -> Vec<ParticipantId> {
        let peers = match self.peers.read() {
            Ok(peers) => peers,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut ids: Vec<ParticipantId> = peers.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Transport for LoopbackHub {
    fn broadcast(&self, except: ParticipantId, op: &Operation) {
        // Encode once and share the text with every receiver.
        let text: Arc<str> = match encode(op) {
            Ok(text) => Arc::from(text),
            Err(e) => {
                error!(error = %e, kind = %op.kind(), "failed to encode operation");
                return;
            }
        };

        let peers = match self.peers.read() {
            Ok(peers) => peers,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (participant, tx) in peers.iter().filter(|(id, _)| receives(op, except, **id)) {
            match tx.try_send(text.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(
                        participant = %participant,
                        kind = %op.kind(),
                        seq = op.seq,
                        "mailbox full; dropping operation"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(participant = %participant, "mailbox closed; skipping");
                }
            }
        }
    }
}

// The owner of an entity is the participant that spawned it.
fn receives(op: &Operation, sender: ParticipantId, participant: ParticipantId) -> bool {
    if participant == sender {
        return false;
    }
    match op.delivery {
        DeliveryTarget::All | DeliveryTarget::Others => true,
        DeliveryTarget::ObserversOnly => participant != op.target.spawner(),
    }
}

/// Receiving end of a participant's connection to the hub.
pub struct Mailbox {
    participant: ParticipantId,
    rx: mpsc::Receiver<Arc<str>>,
}

impl Inbox for Mailbox {
    fn drain(&mut self) -> Vec<Operation> {
        let mut ops = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(text) => match decode(&text) {
                    Ok(op) => ops.push(op),
                    Err(e) => {
                        warn!(participant = %self.participant, error = %e, "dropping undecodable operation");
                    }
                },
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        ops
    }
}
