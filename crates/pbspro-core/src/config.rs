//! Collector configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default bound on one full collection cycle.
pub const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(10);

/// How scheduler sessions are opened within one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// One session per category: connect, query, disconnect, four times.
    #[default]
    PerCategory,
    /// One session for the whole cycle with four independent queries.
    Shared,
}

impl FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-category" => Ok(SessionMode::PerCategory),
            "shared" => Ok(SessionMode::Shared),
            other => Err(format!(
                "unknown session mode '{}', expected 'per-category' or 'shared'",
                other
            )),
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::PerCategory => f.write_str("per-category"),
            SessionMode::Shared => f.write_str("shared"),
        }
    }
}

/// Settings of the cycle orchestrator.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Upper bound for connect + query + disconnect across all categories.
    pub cycle_timeout: Duration,
    pub session_mode: SessionMode,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
            session_mode: SessionMode::default(),
        }
    }
}
