use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::models::PositionSnapshot;
use crate::ports::rpc::{AccountInfo, OrderRequest, OrderResult, RpcClient, RpcError, SymbolInfo, SymbolTick};

/// Mechanical plumbing over a host/port pair speaking to a running MT5 bridge process. Per §1/§6
/// the wire protocol itself is out of scope — this adapter only models the connection lifecycle
/// (connect/login/shutdown bookkeeping) that the rest of the engine depends on through the
/// `RpcClient` trait; it does not implement an actual network protocol.
pub struct StubRpcClient {
    host: String,
    port: u16,
    connected: Mutex<bool>,
    last_error: Mutex<Option<String>>,
}

impl StubRpcClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connected: Mutex::new(false),
            last_error: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait]
impl RpcClient for StubRpcClient {
    async fn initialize(&self) -> bool {
        // A real adapter would open the transport here; tracked as out-of-scope plumbing.
        *self.connected.lock().await = true;
        true
    }

    async fn login(&self, _login: i64, _password: &str, _server: &str, _timeout_ms: u64) -> bool {
        *self.connected.lock().await
    }

    async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    async fn shutdown(&self) {
        *self.connected.lock().await = false;
    }

    async fn account_info(&self) -> Result<AccountInfo, RpcError> {
        Err(RpcError::Request(format!(
            "RPC transport to {} not implemented",
            self.endpoint()
        )))
    }

    async fn positions_get(&self) -> Result<Vec<PositionSnapshot>, RpcError> {
        Err(RpcError::Request(format!(
            "RPC transport to {} not implemented",
            self.endpoint()
        )))
    }

    async fn symbol_info(&self, _symbol: &str) -> Result<Option<SymbolInfo>, RpcError> {
        Err(RpcError::Request(format!(
            "RPC transport to {} not implemented",
            self.endpoint()
        )))
    }

    async fn symbol_info_tick(&self, _symbol: &str) -> Result<Option<SymbolTick>, RpcError> {
        Err(RpcError::Request(format!(
            "RPC transport to {} not implemented",
            self.endpoint()
        )))
    }

    async fn symbol_select(&self, _symbol: &str, _enable: bool) -> Result<(), RpcError> {
        Err(RpcError::Request(format!(
            "RPC transport to {} not implemented",
            self.endpoint()
        )))
    }

    async fn order_send(&self, _request: OrderRequest) -> Result<OrderResult, RpcError> {
        Err(RpcError::Request(format!(
            "RPC transport to {} not implemented",
            self.endpoint()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initialize_marks_the_connection_established() {
        let client = StubRpcClient::new("mt5-master", 8001);
        assert!(client.initialize().await);
        client.shutdown().await;
    }
}
