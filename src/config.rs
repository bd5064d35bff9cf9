//! Board configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::str::FromStr;

use crate::consts::{DOUBLE_TAP_WINDOW_MS, LONG_PRESS_MS, LONG_PRESS_SLOP_PX, TAP_MAX_MS, TAP_SLOP_PX};
use crate::error::ConfigError;
use crate::input::GestureThresholds;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// What happens to local state when an optimistic update fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackPolicy {
    /// Keep the local change; the failure is only reported.
    #[default]
    Keep,
    /// Restore the record as it was before the change.
    Revert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect_secs: u64,
    /// Whole-request timeout. `None` waits indefinitely.
    pub request_secs: Option<u64>,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS, request_secs: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardConfig {
    pub api_url: String,
    pub timeouts: HttpTimeouts,
    pub rollback: RollbackPolicy,
    pub thresholds: GestureThresholds,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            timeouts: HttpTimeouts::default(),
            rollback: RollbackPolicy::default(),
            thresholds: GestureThresholds::default(),
        }
    }
}

impl BoardConfig {
    /// Build typed board config from environment variables.
    ///
    /// All optional:
    /// - `IDEABOARD_API_URL`: store base URL, default `http://localhost:8080/api`
    /// - `IDEABOARD_CONNECT_TIMEOUT_SECS`: default 10
    /// - `IDEABOARD_REQUEST_TIMEOUT_SECS`: unset means no request timeout
    /// - `IDEABOARD_ROLLBACK`: `keep` (default) or `revert`
    /// - `IDEABOARD_TAP_SLOP_PX`, `IDEABOARD_TAP_MAX_MS`,
    ///   `IDEABOARD_DOUBLE_TAP_WINDOW_MS`, `IDEABOARD_LONG_PRESS_MS`,
    ///   `IDEABOARD_LONG_PRESS_SLOP_PX`: gesture thresholds
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("IDEABOARD_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let timeouts = HttpTimeouts {
            connect_secs: env_parse("IDEABOARD_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
            request_secs: env_parse_opt("IDEABOARD_REQUEST_TIMEOUT_SECS")?,
        };
        let rollback = parse_rollback(std::env::var("IDEABOARD_ROLLBACK").as_deref().unwrap_or("keep"))?;
        let thresholds = GestureThresholds {
            tap_slop_px: env_parse("IDEABOARD_TAP_SLOP_PX", TAP_SLOP_PX)?,
            tap_max_ms: env_parse("IDEABOARD_TAP_MAX_MS", TAP_MAX_MS)?,
            double_tap_window_ms: env_parse("IDEABOARD_DOUBLE_TAP_WINDOW_MS", DOUBLE_TAP_WINDOW_MS)?,
            long_press_ms: env_parse("IDEABOARD_LONG_PRESS_MS", LONG_PRESS_MS)?,
            long_press_slop_px: env_parse("IDEABOARD_LONG_PRESS_SLOP_PX", LONG_PRESS_SLOP_PX)?,
        };

        Ok(Self { api_url, timeouts, rollback, thresholds })
    }
}

fn env_parse<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    Ok(env_parse_opt(var)?.unwrap_or(default))
}

fn env_parse_opt<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    let Ok(raw) = std::env::var(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::Parse { var, value: raw.clone() })
}

fn parse_rollback(raw: &str) -> Result<RollbackPolicy, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "keep" | "" => Ok(RollbackPolicy::Keep),
        "revert" => Ok(RollbackPolicy::Revert),
        _ => Err(ConfigError::Parse { var: "IDEABOARD_ROLLBACK", value: raw.to_owned() }),
    }
}
