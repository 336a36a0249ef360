// Frameworks layer: configuration and the tokio runtime around participants.

pub mod config;
pub mod runtime;
