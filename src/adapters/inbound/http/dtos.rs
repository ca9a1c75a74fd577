use serde::{Deserialize, Serialize};

use crate::domain::models::{AccountState, LotMode, MappingStatus, PositionMapping, SlaveConfig, Side};

/// `POST /accounts/slaves` body (§6).
#[derive(Debug, Deserialize)]
pub struct CreateSlaveRequest {
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub login: Option<i64>,
    pub password: Option<String>,
    pub server: Option<String>,
    #[serde(default)]
    pub lot_mode: LotMode,
    #[serde(default = "default_lot_value")]
    pub lot_value: f64,
    #[serde(default = "default_min_lot")]
    pub min_lot: f64,
    #[serde(default = "default_max_lot")]
    pub max_lot: f64,
    pub symbols_filter: Option<Vec<String>>,
    #[serde(default = "default_magic_number")]
    pub magic_number: i32,
    #[serde(default)]
    pub invert_trades: bool,
    #[serde(default = "default_max_slippage")]
    pub max_slippage: i32,
}

fn default_port() -> u16 {
    8001
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

impl From<CreateSlaveRequest> for SlaveConfig {
    fn from(req: CreateSlaveRequest) -> Self {
        SlaveConfig {
            name: req.name,
            host: req.host,
            port: req.port,
            enabled: req.enabled,
            login: req.login,
            password: req.password,
            server: req.server,
            lot_mode: req.lot_mode,
            lot_value: req.lot_value,
            min_lot: req.min_lot,
            max_lot: req.max_lot,
            symbols_filter: req.symbols_filter,
            magic_number: req.magic_number,
            invert_trades: req.invert_trades,
            max_slippage: req.max_slippage,
        }
    }
}

/// Query string for `DELETE /accounts/slaves/{name}` and the disable route (§6).
#[derive(Debug, Deserialize, Default)]
pub struct ClosePositionsQuery {
    #[serde(default)]
    pub close_positions: bool,
}

/// `GET /health` response (§6).
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub running: bool,
    pub master_connected: bool,
    pub slaves_connected: usize,
    pub slaves_total: usize,
    pub active_mappings: usize,
}

/// `GET /ready` response (§6): always 200, payload communicates readiness.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub reason: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct AccountStateResponse {
    pub name: String,
    pub state: AccountState,
}

#[derive(Debug, Serialize)]
pub struct SlaveDetailResponse {
    pub config: SlaveConfig,
    pub state: AccountState,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub master: AccountState,
    pub slaves: Vec<AccountStateResponse>,
    pub active_mappings: usize,
}

#[derive(Debug, Serialize)]
pub struct PositionMappingResponse {
    pub master_ticket: i64,
    pub slave_name: String,
    pub slave_ticket: i64,
    pub master_volume: f64,
    pub slave_volume: f64,
    pub symbol: String,
    pub direction: Side,
    pub status: MappingStatus,
}

impl From<PositionMapping> for PositionMappingResponse {
    fn from(m: PositionMapping) -> Self {
        Self {
            master_ticket: m.master_ticket,
            slave_name: m.slave_name,
            slave_ticket: m.slave_ticket,
            master_volume: m.master_volume,
            slave_volume: m.slave_volume,
            symbol: m.symbol,
            direction: m.direction,
            status: m.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PositionStatsResponse {
    pub total_mappings: usize,
    pub open_mappings: usize,
    pub closed_mappings: usize,
}

/// `POST /deploy/slave` body (§6).
#[derive(Debug, Deserialize)]
pub struct DeploySlaveRequest {
    pub name: String,
    pub login: Option<i64>,
    pub password: Option<String>,
    pub server: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeploySlaveResponse {
    pub container_name: String,
    pub host: String,
    pub port: u16,
}
