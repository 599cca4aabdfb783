use chrono::{DateTime, Utc};
use serde::Serialize;

/// Published scheduler state. In memory only; rebuilt on every start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshState {
    pub is_refreshing: bool,
    pub last_refresh: Option<DateTime<Utc>>,
    pub next_refresh: Option<DateTime<Utc>>,
    /// Outcome of the last finished cycle. Cleared when a cycle begins.
    pub error: Option<String>,
}

/// The four observable scheduler phases, derived from the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
    SettledOk,
    SettledError,
}

impl RefreshState {
    pub fn phase(&self) -> RefreshPhase {
        if self.is_refreshing {
            RefreshPhase::Refreshing
        } else if self.error.is_some() {
            RefreshPhase::SettledError
        } else if self.last_refresh.is_some() {
            RefreshPhase::SettledOk
        } else {
            RefreshPhase::Idle
        }
    }
}
