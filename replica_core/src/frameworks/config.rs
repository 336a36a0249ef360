use crate::domain::InitError;
use crate::domain::tuning::Catalog;
use crate::use_cases::SessionSettings;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs, time::Duration};
use thiserror::Error;

// Runtime constants and env readers (not gameplay tuning).

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000 / 60);
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;
pub const DEFAULT_EVENT_CAPACITY: usize = 128;
pub const DEFAULT_REVIVE_DELAY: Duration = Duration::from_secs(10);
pub const MAX_REVIVE_DELAY: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("archetype `{archetype}` is invalid: {source}")]
    Invalid {
        archetype: String,
        source: InitError,
    },
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

pub fn tick_interval() -> Duration {
    parsed::<u64>("REPLICA_TICK_MS")
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TICK_INTERVAL)
}

pub fn mailbox_capacity() -> usize {
    parsed::<usize>("REPLICA_MAILBOX_CAPACITY")
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAILBOX_CAPACITY)
}

pub fn event_capacity() -> usize {
    parsed::<usize>("REPLICA_EVENT_CAPACITY")
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_EVENT_CAPACITY)
}

pub fn revive_delay() -> Duration {
    revive_delay_from(parsed::<f32>("REPLICA_REVIVE_DELAY_SECS"))
}

fn revive_delay_from(secs: Option<f32>) -> Duration {
    secs.and_then(|s| Duration::try_from_secs_f32(s).ok())
        .filter(|delay| *delay <= MAX_REVIVE_DELAY)
        .unwrap_or(DEFAULT_REVIVE_DELAY)
}

pub fn shooting_allowed() -> bool {
    parsed::<bool>("REPLICA_SHOOTING_ALLOWED").unwrap_or(true)
}

pub fn catalog_path() -> Option<PathBuf> {
    env::var("REPLICA_CATALOG_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

// 0 runs the demo until interrupted.
pub fn demo_duration() -> Duration {
    Duration::from_secs(parsed::<u64>("REPLICA_DEMO_SECONDS").unwrap_or(30))
}

/// Reads and validates an archetype catalog file.
pub fn load_catalog(path: &Path) -> Result<Catalog, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&raw).map_err(|e| match e {
        ConfigError::Parse { source, .. } => ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

fn parse_catalog(raw: &str) -> Result<Catalog, ConfigError> {
    let catalog: Catalog = serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
        path: PathBuf::new(),
        source,
    })?;
    for (archetype, tuning) in &catalog.archetypes {
        tuning.validate().map_err(|source| ConfigError::Invalid {
            archetype: archetype.clone(),
            source,
        })?;
    }
    Ok(catalog)
}

/// Session settings from the environment; the catalog file replaces the built-in one.
pub fn session_settings() -> Result<SessionSettings, ConfigError> {
    let catalog = match catalog_path() {
        Some(path) => load_catalog(&path)?,
        None => Catalog::builtin(),
    };
    Ok(SessionSettings {
        revive_delay: revive_delay(),
        shooting_allowed: shooting_allowed(),
        event_capacity: event_capacity(),
        catalog: Arc::new(catalog),
    })
}
