use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::PositionSnapshot;

/// Transport-level failure from the RPC client adapter (§7 taxonomy (a)).
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("login failed: {0}")]
    Login(String),
    #[error("request failed: {0}")]
    Request(String),
}

/// `account_info()` result (§6).
#[derive(Debug, Clone, Copy)]
pub struct AccountInfo {
    pub login: i64,
    pub balance: f64,
    pub equity: f64,
    pub margin_level: Option<f64>,
}

/// `symbol_info(symbol)` result (§6): `filling_mode` is a bitmask, bit 0 = FOK, bit 1 = IOC.
#[derive(Debug, Clone, Copy)]
pub struct SymbolInfo {
    pub visible: bool,
    pub filling_mode: i32,
    pub volume_min: f64,
    pub volume_max: f64,
    pub volume_step: f64,
}

/// `symbol_info_tick(symbol)` result (§6).
#[derive(Debug, Clone, Copy)]
pub struct SymbolTick {
    pub bid: f64,
    pub ask: f64,
}

/// `order_send(request)` input (§4.4, §6). `action` is `TradeAction::Deal` or `::Sltp`.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub action: crate::domain::models::TradeAction,
    pub symbol: String,
    pub volume: f64,
    pub order_type: crate::domain::models::OrderType,
    pub price: f64,
    pub sl: f64,
    pub tp: f64,
    pub deviation: i32,
    pub magic: i32,
    pub comment: String,
    pub type_filling: i32,
    /// Set when closing or modifying an existing position.
    pub position: Option<i64>,
}

/// `order_send(request)` result (§6).
#[derive(Debug, Clone)]
pub struct OrderResult {
    pub retcode: i32,
    pub order: i64,
    pub comment: String,
}

/// Thin, synchronous-semantics facade over the broker RPC (§6). A capability interface: the engine
/// is generic over any implementation, substituting an in-memory double in tests (§9 "Dynamic
/// dispatch").
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn initialize(&self) -> bool;
    async fn login(&self, login: i64, password: &str, server: &str, timeout_ms: u64) -> bool;
    async fn last_error(&self) -> Option<String>;
    async fn shutdown(&self);
    async fn account_info(&self) -> Result<AccountInfo, RpcError>;
    async fn positions_get(&self) -> Result<Vec<PositionSnapshot>, RpcError>;
    async fn symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>, RpcError>;
    async fn symbol_info_tick(&self, symbol: &str) -> Result<Option<SymbolTick>, RpcError>;
    async fn symbol_select(&self, symbol: &str, enable: bool) -> Result<(), RpcError>;
    async fn order_send(&self, request: OrderRequest) -> Result<OrderResult, RpcError>;
}
