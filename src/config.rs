//! Engine configuration
//!
//! Read once from the environment (after loading `.env` when present):
//!
//! - `VALIDATION_EVENT_CAPACITY`: per-receiver buffer of the change-event channel
//!   (default 64, never below 1)
//! - `VALIDATION_LOG_FORMAT`: `text` or `json` (default `text`)

use std::env;

use once_cell::sync::Lazy;

use crate::utils::logger::LogFormat;

pub const EVENT_CAPACITY_VAR: &str = "VALIDATION_EVENT_CAPACITY";
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

static GLOBAL: Lazy<EngineConfig> = Lazy::new(EngineConfig::from_env);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub event_capacity: usize,
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            log_format: LogFormat::Text,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            event_capacity: parse_capacity(env::var(EVENT_CAPACITY_VAR).ok().as_deref()),
            log_format: LogFormat::from_env_or_default(),
        }
    }

    /// Configuration loaded on first access and kept for the process lifetime.
    pub fn global() -> &'static EngineConfig {
        &GLOBAL
    }
}

/// Parses a capacity setting, falling back to the default when absent or invalid
/// and clamping to at least 1.
pub fn parse_capacity(raw: Option<&str>) -> usize {
    match raw.map(str::trim) {
        Some(raw) => match raw.parse::<usize>() {
            Ok(capacity) => capacity.max(1),
            Err(_) => {
                log::warn!(
                    "Invalid {} value '{}', using {}",
                    EVENT_CAPACITY_VAR,
                    raw,
                    DEFAULT_EVENT_CAPACITY
                );
                DEFAULT_EVENT_CAPACITY
            }
        },
        None => DEFAULT_EVENT_CAPACITY,
    }
}
