use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::models::PositionSnapshot;
use crate::ports::rpc::{
    AccountInfo, OrderRequest, OrderResult, RpcClient, RpcError, SymbolInfo, SymbolTick,
};

/// Deterministic in-memory `RpcClient` double (§9 "Dynamic dispatch"). Scripts `positions_get`,
/// `symbol_info`/`symbol_info_tick`, and a queue of `order_send` outcomes; records every
/// `order_send` call for assertions, matching the teacher's hand-rolled-fake-behind-a-port idiom.
#[derive(Default)]
struct State {
    connected: bool,
    account_info: Option<AccountInfo>,
    positions: Vec<PositionSnapshot>,
    symbol_infos: HashMap<String, SymbolInfo>,
    ticks: HashMap<String, SymbolTick>,
    order_queue: VecDeque<Result<OrderResult, RpcError>>,
    sent_orders: Vec<OrderRequest>,
}

pub struct TestRpcClient {
    state: Mutex<State>,
}

impl Default for TestRpcClient {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }
}

impl TestRpcClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_account_info(&self, info: AccountInfo) {
        self.state.lock().unwrap().account_info = Some(info);
    }

    pub fn set_positions(&self, positions: Vec<PositionSnapshot>) {
        self.state.lock().unwrap().positions = positions;
    }

    pub fn set_symbol_info(&self, symbol: &str, info: SymbolInfo) {
        self.state.lock().unwrap().symbol_infos.insert(symbol.to_string(), info);
    }

    pub fn set_symbol_tick(&self, symbol: &str, tick: SymbolTick) {
        self.state.lock().unwrap().ticks.insert(symbol.to_string(), tick);
    }

    pub fn queue_order_result(&self, result: Result<OrderResult, RpcError>) {
        self.state.lock().unwrap().order_queue.push_back(result);
    }

    pub fn sent_orders(&self) -> Vec<OrderRequest> {
        self.state.lock().unwrap().sent_orders.clone()
    }
}

#[async_trait]
impl RpcClient for TestRpcClient {
    async fn initialize(&self) -> bool {
        self.state.lock().unwrap().connected = true;
        true
    }

    async fn login(&self, _login: i64, _password: &str, _server: &str, _timeout_ms: u64) -> bool {
        self.state.lock().unwrap().connected
    }

    async fn last_error(&self) -> Option<String> {
        None
    }

    async fn shutdown(&self) {
        self.state.lock().unwrap().connected = false;
    }

    async fn account_info(&self) -> Result<AccountInfo, RpcError> {
        self.state
            .lock()
            .unwrap()
            .account_info
            .ok_or_else(|| RpcError::Request("account_info not configured".into()))
    }

    async fn positions_get(&self) -> Result<Vec<PositionSnapshot>, RpcError> {
        Ok(self.state.lock().unwrap().positions.clone())
    }

    async fn symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>, RpcError> {
        Ok(self.state.lock().unwrap().symbol_infos.get(symbol).copied())
    }

    async fn symbol_info_tick(&self, symbol: &str) -> Result<Option<SymbolTick>, RpcError> {
        Ok(self.state.lock().unwrap().ticks.get(symbol).copied())
    }

    async fn symbol_select(&self, _symbol: &str, _enable: bool) -> Result<(), RpcError> {
        Ok(())
    }

    async fn order_send(&self, request: OrderRequest) -> Result<OrderResult, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.sent_orders.push(request);
        state
            .order_queue
            .pop_front()
            .unwrap_or_else(|| Err(RpcError::Request("no order result queued".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{OrderType, TradeAction};

    #[tokio::test]
    async fn order_send_records_the_request_and_returns_the_queued_result() {
        let client = TestRpcClient::new();
        client.queue_order_result(Ok(OrderResult {
            retcode: 10009,
            order: 7001,
            comment: "done".into(),
        }));

        let result = client
            .order_send(OrderRequest {
                action: TradeAction::Deal,
                symbol: "EURUSD".into(),
                volume: 0.1,
                order_type: OrderType::Buy,
                price: 1.1005,
                sl: 1.0955,
                tp: 1.1105,
                deviation: 20,
                magic: 123456,
                comment: "CT:1".into(),
                type_filling: 0,
                position: None,
            })
            .await
            .unwrap();

        assert_eq!(result.order, 7001);
        assert_eq!(client.sent_orders().len(), 1);
    }
}
