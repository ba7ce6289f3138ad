//! Live state tracking for a contested portal.
//!
//! Producers push partial JSON updates through [`SharedPortal`]; each update
//! is staged on a private working copy, diffed, validated as a whole, and only
//! then committed. Readers render the committed state in the legacy or the
//! current wire format.

pub mod config;
pub mod diff;
pub mod feed;
pub mod http;
pub mod metrics;
mod portal;
mod resonator;
mod shared;
mod snapshot;

pub use config::{ConfigError, ConfigSource, ServerConfig};
pub use metrics::{MetricsSnapshot, UpdateMetrics};
pub use portal::{
    Portal, ValidationError, DEFAULT_TITLE, MAX_MODS, MAX_RESONATORS, MAX_TITLE_CHARS,
    MOD_WHITELIST, RESONATOR_XM_WEIGHTS,
};
pub use resonator::{difference, Resonator, ResonatorError};
pub use shared::{FeedDisposition, FeedOutcome, SharedPortal, UpdateError, UpdateOutcome};
pub use snapshot::{current_resonator, current_status, legacy_resonator, legacy_status};

/// Build the shared portal described by `config`.
pub fn portal_from_config(config: &ServerConfig) -> SharedPortal {
    SharedPortal::new(Portal::new(config.portal_id, config.default_title.clone()))
}
