use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Runtime-only mirror of the last observed broker state for a master or slave connection (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    pub connected: bool,
    pub balance: f64,
    pub equity: f64,
    pub margin_level: f64,
    pub positions_count: usize,
    pub error_count: u32,
    pub last_error: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl Default for AccountState {
    fn default() -> Self {
        Self {
            connected: false,
            balance: 0.0,
            equity: 0.0,
            margin_level: 0.0,
            positions_count: 0,
            error_count: 0,
            last_error: None,
            last_heartbeat: None,
        }
    }
}

impl AccountState {
    /// Refreshes from a successful `account_info` fetch; clears the error streak.
    pub fn update_from_account_info(&mut self, balance: f64, equity: f64, margin_level: f64) {
        self.balance = balance;
        self.equity = equity;
        self.margin_level = margin_level;
        self.last_heartbeat = Some(Utc::now());
        self.connected = true;
        self.error_count = 0;
        self.last_error = None;
    }

    /// Records a transport/RPC failure; never panics, never clears accumulated state.
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.error_count += 1;
        self.last_error = Some(error.into());
        self.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_error_disconnects_and_counts() {
        let mut state = AccountState::default();
        state.record_error("timeout");
        assert!(!state.connected);
        assert_eq!(state.error_count, 1);
        assert_eq!(state.last_error.as_deref(), Some("timeout"));
    }

    #[test]
    fn update_from_account_info_clears_error_streak() {
        let mut state = AccountState::default();
        state.record_error("timeout");
        state.update_from_account_info(1000.0, 1000.0, 0.0);
        assert!(state.connected);
        assert_eq!(state.error_count, 0);
        assert!(state.last_error.is_none());
    }
}
