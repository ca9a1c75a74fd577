use serde::{Deserialize, Serialize};

use super::enums::LotMode;

/// Master account configuration (config schema §6 + engine constructor argument, SPEC_FULL §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    #[serde(default = "default_master_name")]
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub login: Option<i64>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
}

fn default_master_name() -> String {
    "master".to_string()
}

fn default_port() -> u16 {
    8001
}

/// Per-slave configuration and transformation rules (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaveConfig {
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub login: Option<i64>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub lot_mode: LotMode,
    #[serde(default = "default_lot_value")]
    pub lot_value: f64,
    #[serde(default = "default_min_lot")]
    pub min_lot: f64,
    #[serde(default = "default_max_lot")]
    pub max_lot: f64,
    #[serde(default)]
    pub symbols_filter: Option<Vec<String>>,
    #[serde(default = "default_magic_number")]
    pub magic_number: i32,
    #[serde(default)]
    pub invert_trades: bool,
    #[serde(default = "default_max_slippage")]
    pub max_slippage: i32,
}

fn default_true() -> bool {
    true
}
fn default_lot_value() -> f64 {
    1.0
}
fn default_min_lot() -> f64 {
    0.01
}
fn default_max_lot() -> f64 {
    10.0
}
fn default_magic_number() -> i32 {
    123456
}
fn default_max_slippage() -> i32 {
    20
}

impl SlaveConfig {
    /// `should_copy_symbol`: null filter copies everything (§4.4).
    pub fn should_copy_symbol(&self, symbol: &str) -> bool {
        match &self.symbols_filter {
            None => true,
            Some(list) => list.iter().any(|s| s == symbol),
        }
    }

    /// Fields patchable via `PUT /accounts/slaves/{name}` (§4.7 `update_slave`).
    pub fn apply_whitelisted_update(&mut self, update: &SlaveConfigUpdate) {
        if let Some(v) = update.lot_mode {
            self.lot_mode = v;
        }
        if let Some(v) = update.lot_value {
            self.lot_value = v;
        }
        if let Some(v) = update.max_lot {
            self.max_lot = v;
        }
        if let Some(v) = update.min_lot {
            self.min_lot = v;
        }
        if let Some(v) = &update.symbols_filter {
            self.symbols_filter = Some(v.clone());
        }
        if let Some(v) = update.magic_number {
            self.magic_number = v;
        }
        if let Some(v) = update.invert_trades {
            self.invert_trades = v;
        }
        if let Some(v) = update.max_slippage {
            self.max_slippage = v;
        }
    }
}

/// Sparse patch for `update_slave`; every field optional, non-whitelisted fields simply absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlaveConfigUpdate {
    #[serde(default)]
    pub lot_mode: Option<LotMode>,
    #[serde(default)]
    pub lot_value: Option<f64>,
    #[serde(default)]
    pub max_lot: Option<f64>,
    #[serde(default)]
    pub min_lot: Option<f64>,
    #[serde(default)]
    pub symbols_filter: Option<Vec<String>>,
    #[serde(default)]
    pub magic_number: Option<i32>,
    #[serde(default)]
    pub invert_trades: Option<bool>,
    #[serde(default)]
    pub max_slippage: Option<i32>,
}

impl SlaveConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.lot_mode.is_none()
            && self.lot_value.is_none()
            && self.max_lot.is_none()
            && self.min_lot.is_none()
            && self.symbols_filter.is_none()
            && self.magic_number.is_none()
            && self.invert_trades.is_none()
            && self.max_slippage.is_none()
    }
}

/// Top-level runtime tuning (§6 config schema's `settings` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

fn default_polling_interval_ms() -> u64 {
    500
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}
fn default_connection_timeout_ms() -> u64 {
    5000
}
fn default_heartbeat_interval_ms() -> u64 {
    10_000
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            polling_interval_ms: default_polling_interval_ms(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            connection_timeout_ms: default_connection_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slave(filter: Option<Vec<&str>>) -> SlaveConfig {
        SlaveConfig {
            name: "slave1".into(),
            host: "mt5-slave".into(),
            port: 8001,
            enabled: true,
            login: None,
            password: None,
            server: None,
            lot_mode: LotMode::Exact,
            lot_value: 1.0,
            min_lot: 0.01,
            max_lot: 10.0,
            symbols_filter: filter.map(|v| v.into_iter().map(String::from).collect()),
            magic_number: 123456,
            invert_trades: false,
            max_slippage: 20,
        }
    }

    #[test]
    fn null_filter_copies_every_symbol() {
        let cfg = slave(None);
        assert!(cfg.should_copy_symbol("EURUSD"));
        assert!(cfg.should_copy_symbol("XAUUSD"));
    }

    #[test]
    fn filter_restricts_to_listed_symbols() {
        let cfg = slave(Some(vec!["EURUSD"]));
        assert!(cfg.should_copy_symbol("EURUSD"));
        assert!(!cfg.should_copy_symbol("XAUUSD"));
    }

    #[test]
    fn update_only_touches_whitelisted_fields() {
        let mut cfg = slave(None);
        let original_host = cfg.host.clone();
        cfg.apply_whitelisted_update(&SlaveConfigUpdate {
            max_lot: Some(5.0),
            invert_trades: Some(true),
            ..Default::default()
        });
        assert_eq!(cfg.max_lot, 5.0);
        assert!(cfg.invert_trades);
        assert_eq!(cfg.host, original_host);
        assert_eq!(cfg.min_lot, 0.01);
    }
}
