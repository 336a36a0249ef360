// Presentation-side consumer of change events.

use crate::domain::{Field, FieldValue};
use crate::use_cases::ChangeEvent;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Logs change events for one participant until the store is dropped.
///
/// Stands in for the HUD and effects layers: lifecycle transitions are logged at info,
/// everything else at debug. Returns the number of events seen.
pub async fn change_event_logger(
    participant: String,
    mut events_rx: broadcast::Receiver<ChangeEvent>,
) -> u64 {
    let mut seen = 0;
    loop {
        match events_rx.recv().await {
            Ok(event) => {
                seen += 1;
                let ChangeEvent {
                    entity,
                    field,
                    old,
                    new,
                } = event;
                match (field, new) {
                    (Field::Alive, FieldValue::Bool(false)) => {
                        info!(%participant, %entity, "entity went down");
                    }
                    (Field::Alive, FieldValue::Bool(true)) if old.is_some() => {
                        info!(%participant, %entity, "entity back in play");
                    }
                    (Field::Spawned, FieldValue::Bool(false)) => {
                        info!(%participant, %entity, "entity removed");
                    }
                    _ => {
                        debug!(%participant, %entity, %field, old = ?old, %new, "field changed");
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(%participant, missed = n, "change events lagged; skipping ahead");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(%participant, "change events closed; logger exiting");
                break;
            }
        }
    }
    seen
}
