pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod systems;
pub mod use_cases;

pub use frameworks::config::ConfigError;
pub use frameworks::runtime::{run_duel, run_with_config};
pub use use_cases::{LocalIntent, Participant, SessionSettings};
