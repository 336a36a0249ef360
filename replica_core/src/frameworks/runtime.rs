// Framework bootstrap: tracing, participant tasks and the scripted demo session.

use crate::domain::{EntityId, Hit, ParticipantId};
use crate::frameworks::config::{self, ConfigError};
use crate::interface_adapters::net::LoopbackHub;
use crate::interface_adapters::presentation::change_event_logger;
use crate::use_cases::{LocalIntent, Participant, SessionSettings};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const INTENT_CHANNEL_CAPACITY: usize = 256;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Drives one participant at a fixed step until `shutdown` fires, then hands it back.
///
/// Intents queued on `intents_rx` are submitted at the start of each tick, before timers
/// and inbound operations.
pub async fn participant_task(
    mut participant: Participant,
    mut intents_rx: mpsc::Receiver<LocalIntent>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) -> Participant {
    let started = Instant::now();
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    // Created before the loop so a notification between ticks is not missed.
    let stopped = shutdown.notified();
    tokio::pin!(stopped);

    let mut ticks: u64 = 0;
    loop {
        tokio::select! {
            _ = &mut stopped => break,
            _ = interval.tick() => {}
        }

        while let Ok(intent) = intents_rx.try_recv() {
            participant.submit(intent);
        }
        participant.tick(started.elapsed());
        ticks += 1;
    }

    tracing::info!(participant = %participant.id(), ticks, "participant stopped");
    participant
}

/// Handle to a running participant task.
pub struct ParticipantHandle {
    pub id: ParticipantId,
    pub entity: EntityId,
    pub intents_tx: mpsc::Sender<LocalIntent>,
    pub task: JoinHandle<Participant>,
}

/// Starts the task for a participant whose entity is already spawned.
pub fn start_participant(
    participant: Participant,
    entity: EntityId,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) -> ParticipantHandle {
    let id = participant.id();
    tokio::spawn(change_event_logger(id.to_string(), participant.subscribe()));

    let (intents_tx, intents_rx) = mpsc::channel(INTENT_CHANNEL_CAPACITY);
    let task = tokio::spawn(participant_task(
        participant,
        intents_rx,
        tick_interval,
        shutdown,
    ));
    ParticipantHandle {
        id,
        entity,
        intents_tx,
        task,
    }
}

// Scripted input for one side of the duel: fire, report a hit, reload and cast now and then.
async fn duel_bot(
    own: EntityId,
    opponent: EntityId,
    intents_tx: mpsc::Sender<LocalIntent>,
    shutdown: Arc<Notify>,
) {
    let stopped = shutdown.notified();
    tokio::pin!(stopped);
    let mut interval = tokio::time::interval(Duration::from_millis(300));
    let mut round: u64 = 0;

    loop {
        tokio::select! {
            _ = &mut stopped => break,
            _ = interval.tick() => {}
        }
        round += 1;

        let mut intents = vec![
            LocalIntent::FirePressed { entity: own },
            LocalIntent::FireReleased { entity: own },
        ];
        if round % 2 == 0 {
            intents.push(LocalIntent::HitDetected(Hit {
                target: opponent,
                point: [0.0, 1.0, 0.0],
                normal: [0.0, 0.0, -1.0],
                amount: 15.0,
                attacker: Some(own),
                attack: None,
                stun_seconds: if round % 10 == 0 { 0.5 } else { 0.0 },
            }));
        }
        if round % 7 == 0 {
            intents.push(LocalIntent::ReloadPressed { entity: own });
        }
        if round % 11 == 0 {
            intents.push(LocalIntent::SkillPressed {
                entity: own,
                index: 0,
            });
        }

        for intent in intents {
            if intents_tx.send(intent).await.is_err() {
                return;
            }
        }
    }
}

/// Runs a two-participant duel over the loopback hub for `duration` (0 waits for Ctrl-C).
pub async fn run_duel(
    settings: SessionSettings,
    tick_interval: Duration,
    mailbox_capacity: usize,
    duration: Duration,
) -> Result<Vec<Participant>, ConfigError> {
    let hub = LoopbackHub::new(mailbox_capacity);
    let shutdown = Arc::new(Notify::new());

    // Everyone connects before anything is spawned so no Spawn is missed.
    let lineup = [(ParticipantId(1), "soldier"), (ParticipantId(2), "gunner")];
    let mut joined = Vec::new();
    for (id, archetype) in lineup {
        let inbox = hub.connect(id);
        let participant = Participant::new(id, settings.clone(), hub.clone(), Box::new(inbox));
        joined.push((participant, archetype));
    }

    let mut handles = Vec::new();
    for (mut participant, archetype) in joined {
        let entity = participant
            .spawn(archetype)
            .map_err(|source| ConfigError::Invalid {
                archetype: archetype.to_string(),
                source,
            })?;
        handles.push(start_participant(
            participant,
            entity,
            tick_interval,
            shutdown.clone(),
        ));
    }
    tracing::info!(participants = handles.len(), ?tick_interval, "duel started");

    let bots: Vec<JoinHandle<()>> = [(0, 1), (1, 0)]
        .into_iter()
        .map(|(me, them)| {
            tokio::spawn(duel_bot(
                handles[me].entity,
                handles[them].entity,
                handles[me].intents_tx.clone(),
                shutdown.clone(),
            ))
        })
        .collect();

    if duration.is_zero() {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    } else {
        tokio::time::sleep(duration).await;
    }
    shutdown.notify_waiters();

    for bot in bots {
        let _ = bot.await;
    }
    let mut participants = Vec::new();
    for handle in handles {
        match handle.task.await {
            Ok(participant) => participants.push(participant),
            Err(e) => tracing::error!(participant = %handle.id, error = %e, "participant task failed"),
        }
    }

    settle(&mut participants);

    for participant in &participants {
        for entity in participant.registry().iter() {
            tracing::info!(
                participant = %participant.id(),
                entity = %entity.id,
                owner = %entity.owner,
                health = entity.health(),
                alive = entity.is_alive(),
                shots_fired = entity.shots_fired(),
                "final view"
            );
        }
    }
    Ok(participants)
}

// Delivers operations still queued after the tasks stopped. Time does not advance here, so
// only reactions to received operations (e.g. Die after Depleted) can emit.
fn settle(participants: &mut [Participant]) {
    loop {
        let mut received = 0;
        for participant in participants.iter_mut() {
            let now = participant.now();
            received += participant.tick(now);
        }
        if received == 0 {
            break;
        }
    }
}

pub async fn run_with_config() -> Result<(), ConfigError> {
    init_runtime();

    let settings = config::session_settings().inspect_err(|e| {
        tracing::error!(error = %e, "failed to load session settings");
    })?;
    let tick_interval = config::tick_interval();
    tracing::debug!(
        tick_ms = tick_interval.as_millis(),
        revive_delay_ms = settings.revive_delay.as_millis(),
        shooting_allowed = settings.shooting_allowed,
        "session configured"
    );

    run_duel(
        settings,
        tick_interval,
        config::mailbox_capacity(),
        config::demo_duration(),
    )
    .await?;
    Ok(())
}
