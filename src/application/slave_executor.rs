use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::models::{
    retcode, AccountState, OrderType, PositionSnapshot, Side, SlaveConfig, TradeAction,
};
use crate::domain::services::{distance_preserve, LotCalculator, SymbolVolumeInfo};
use crate::ports::rpc::{OrderRequest, OrderResult, RpcClient, RpcError, SymbolInfo};

/// Owns one slave's RPC connection and its current configuration (§4.4). Config is behind a
/// `Mutex` so `update_slave`/`enable_slave`/`disable_slave` (§4.7) can mutate it from the HTTP
/// handlers while a poll iteration is executing against the previous snapshot.
pub struct SlaveExecutor {
    client: Arc<dyn RpcClient>,
    config: Mutex<SlaveConfig>,
    state: Mutex<AccountState>,
}

/// Picks the order-filling mode from a symbol's `filling_mode` bitmask (§4.4 step 6):
/// `SYMBOL_FILLING_FOK` (bit 0) maps to `ORDER_FILLING_FOK` (0), `SYMBOL_FILLING_IOC` (bit 1)
/// maps to `ORDER_FILLING_IOC` (1), otherwise `ORDER_FILLING_RETURN` (2).
fn select_filling_mode(bitmask: i32) -> i32 {
    if bitmask & 1 != 0 {
        0
    } else if bitmask & 2 != 0 {
        1
    } else {
        2
    }
}

/// Outcome of attempting to open a position on the slave (§4.4 step sequence).
pub struct OpenOutcome {
    pub order_result: OrderResult,
    pub slave_volume: f64,
    pub execution_price: f64,
    pub lot_warning: Option<&'static str>,
}

impl SlaveExecutor {
    pub fn new(client: Arc<dyn RpcClient>, config: SlaveConfig) -> Self {
        Self {
            client,
            config: Mutex::new(config),
            state: Mutex::new(AccountState::default()),
        }
    }

    pub async fn name(&self) -> String {
        self.config.lock().await.name.clone()
    }

    pub async fn config_snapshot(&self) -> SlaveConfig {
        self.config.lock().await.clone()
    }

    pub async fn set_config(&self, config: SlaveConfig) {
        *self.config.lock().await = config;
    }

    pub async fn is_enabled(&self) -> bool {
        self.config.lock().await.enabled
    }

    pub async fn set_enabled(&self, enabled: bool) {
        self.config.lock().await.enabled = enabled;
    }

    pub async fn state_snapshot(&self) -> AccountState {
        self.state.lock().await.clone()
    }

    pub async fn initialize(&self) -> bool {
        if !self.client.initialize().await {
            return false;
        }
        let (login, password, server) = {
            let cfg = self.config.lock().await;
            (cfg.login, cfg.password.clone(), cfg.server.clone())
        };
        let logged_in = match (login, &password, &server) {
            (Some(login), Some(password), Some(server)) => {
                self.client.login(login, password, server, 60_000).await
            }
            _ => true,
        };
        self.state.lock().await.connected = logged_in;
        logged_in
    }

    pub async fn should_copy_symbol(&self, symbol: &str) -> bool {
        self.config.lock().await.should_copy_symbol(symbol)
    }

    /// Exposed for the Sync Engine's partial-close handler (§4.7), which needs the same broker
    /// volume constraints the open path uses internally.
    pub async fn symbol_volume_info_for(&self, symbol: &str) -> Option<SymbolVolumeInfo> {
        self.symbol_volume_info(symbol).await
    }

    async fn symbol_volume_info(&self, symbol: &str) -> Option<SymbolVolumeInfo> {
        self.client.symbol_info(symbol).await.ok().flatten().map(
            |SymbolInfo { volume_min, volume_max, volume_step, .. }| SymbolVolumeInfo {
                volume_min,
                volume_max,
                volume_step,
            },
        )
    }

    /// Broker order-filling mode for `symbol` (§4.4 step 6): FOK(0) if the symbol's
    /// `filling_mode` bitmask has bit 0 set, else IOC(1) if bit 1 is set, else RETURN(2).
    async fn filling_mode(&self, symbol: &str) -> i32 {
        let bitmask = match self.client.symbol_info(symbol).await {
            Ok(Some(info)) => info.filling_mode,
            _ => 0,
        };
        select_filling_mode(bitmask)
    }

    /// Opens a copy of `master` on the slave (§4.4): resolve the symbol, size the lot, invert the
    /// side if configured, fetch the current tick for the execution price, preserve SL/TP distance
    /// from the master's own entry, and send the order.
    pub async fn open_position(
        &self,
        master: &PositionSnapshot,
        lot_calc: &LotCalculator,
    ) -> Result<OpenOutcome, RpcError> {
        let config = self.config.lock().await.clone();

        self.client.symbol_select(&master.symbol, true).await.ok();
        let symbol_info = self.symbol_volume_info(&master.symbol).await;
        let (slave_volume, lot_warning) = lot_calc.calculate(master.volume, &config, symbol_info);

        let side = if config.invert_trades {
            master.side.inverted()
        } else {
            master.side
        };

        let tick = self
            .client
            .symbol_info_tick(&master.symbol)
            .await?
            .ok_or_else(|| RpcError::Request(format!("no tick for {}", master.symbol)))?;
        let execution_price = match side {
            Side::Buy => tick.ask,
            Side::Sell => tick.bid,
        };

        let sltp = distance_preserve(side, execution_price, master.price_open, master.sl, master.tp);
        let type_filling = self.filling_mode(&master.symbol).await;

        let request = OrderRequest {
            action: TradeAction::Deal,
            symbol: master.symbol.clone(),
            volume: slave_volume,
            order_type: OrderType::from(side),
            price: execution_price,
            sl: sltp.sl,
            tp: sltp.tp,
            deviation: config.max_slippage,
            magic: config.magic_number,
            comment: format!("CT:{}", master.ticket),
            type_filling,
            position: None,
        };

        let order_result = self.client.order_send(request).await?;
        Ok(OpenOutcome {
            order_result,
            slave_volume,
            execution_price,
            lot_warning,
        })
    }

    /// Closes the slave position opposite `slave_ticket` at the current market price for `symbol`
    /// (§4.4): a market order in the reverse direction referencing `position`.
    pub async fn close_position(
        &self,
        slave_ticket: i64,
        symbol: &str,
        side: Side,
        volume: f64,
    ) -> Result<OrderResult, RpcError> {
        let closing_side = side.inverted();
        let tick = self
            .client
            .symbol_info_tick(symbol)
            .await?
            .ok_or_else(|| RpcError::Request(format!("no tick for {symbol}")))?;
        let price = match closing_side {
            Side::Buy => tick.ask,
            Side::Sell => tick.bid,
        };

        let config = self.config.lock().await.clone();
        let type_filling = self.filling_mode(symbol).await;
        self.client
            .order_send(OrderRequest {
                action: TradeAction::Deal,
                symbol: symbol.to_string(),
                volume,
                order_type: OrderType::from(closing_side),
                price,
                sl: 0.0,
                tp: 0.0,
                deviation: config.max_slippage,
                magic: config.magic_number,
                comment: "CT:close".to_string(),
                type_filling,
                position: Some(slave_ticket),
            })
            .await
    }

    /// Partial-closes `volume` off `slave_ticket`, mirroring `close_position` with a volume less
    /// than the position's current full size (§4.4, §4.3 `calculate_partial_close`).
    pub async fn partial_close_position(
        &self,
        slave_ticket: i64,
        symbol: &str,
        side: Side,
        volume: f64,
    ) -> Result<OrderResult, RpcError> {
        self.close_position(slave_ticket, symbol, side, volume).await
    }

    /// Re-applies distance-preserved SL/TP on a modification, reusing the slave's own recorded
    /// entry price as the output basis instead of re-fetching a live tick (the position already
    /// exists) while still measuring distance from the master's entry — the REDESIGN FLAG: the
    /// original only ran this transform on open, leaving modify as a pass-through of raw prices.
    pub async fn modify_position(
        &self,
        slave_ticket: i64,
        symbol: &str,
        side: Side,
        slave_entry_price: f64,
        master_entry_price: f64,
        master_sl: f64,
        master_tp: f64,
    ) -> Result<OrderResult, RpcError> {
        let sltp = distance_preserve(side, slave_entry_price, master_entry_price, master_sl, master_tp);

        self.client
            .order_send(OrderRequest {
                action: TradeAction::Sltp,
                symbol: symbol.to_string(),
                volume: 0.0,
                order_type: OrderType::from(side),
                price: 0.0,
                sl: sltp.sl,
                tp: sltp.tp,
                deviation: 0,
                magic: 0,
                comment: String::new(),
                type_filling: 0,
                position: Some(slave_ticket),
            })
            .await
    }

    pub async fn get_position_by_ticket(&self, ticket: i64) -> Result<Option<PositionSnapshot>, RpcError> {
        let positions = self.client.positions_get().await?;
        Ok(positions.into_iter().find(|p| p.ticket == ticket))
    }

    pub async fn refresh_account_info(&self) {
        match self.client.account_info().await {
            Ok(info) => {
                self.state.lock().await.update_from_account_info(
                    info.balance,
                    info.equity,
                    info.margin_level.unwrap_or(0.0),
                );
            }
            Err(e) => self.state.lock().await.record_error(e.to_string()),
        }
    }

    pub async fn balance(&self) -> f64 {
        self.state.lock().await.balance
    }

    pub async fn shutdown(&self) {
        self.client.shutdown().await;
        self.state.lock().await.connected = false;
    }

    pub fn is_retryable(retcode: i32) -> bool {
        retcode::is_retryable(retcode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::rpc::TestRpcClient;
    use crate::domain::models::LotMode;
    use crate::ports::rpc::SymbolTick;

    fn slave_config() -> SlaveConfig {
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
            symbols_filter: None,
            magic_number: 123456,
            invert_trades: false,
            max_slippage: 20,
        }
    }

    fn master_position() -> PositionSnapshot {
        PositionSnapshot {
            ticket: 1001,
            symbol: "EURUSD".into(),
            side: Side::Buy,
            volume: 0.5,
            price_open: 1.1000,
            sl: 1.0950,
            tp: 1.1100,
            magic: 0,
            comment: String::new(),
            time: 0,
            profit: 0.0,
        }
    }

    // === S1 — single open, single slave, EXACT ===
    #[tokio::test]
    async fn open_position_sends_an_order_with_distance_preserved_sltp() {
        let client = Arc::new(TestRpcClient::new());
        client.set_symbol_tick("EURUSD", SymbolTick { bid: 1.1004, ask: 1.1005 });
        client.queue_order_result(Ok(OrderResult { retcode: 10009, order: 5001, comment: "done".into() }));

        let executor = SlaveExecutor::new(client.clone(), slave_config());
        let lot_calc = LotCalculator::new(0.0, 0.0);

        let outcome = executor.open_position(&master_position(), &lot_calc).await.unwrap();
        assert_eq!(outcome.slave_volume, 0.5);
        assert_eq!(outcome.order_result.order, 5001);

        let sent = client.sent_orders();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].price, 1.1005);
        assert!((sent[0].sl - (1.1005 - 0.0050)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn inverted_slave_flips_the_order_side() {
        let client = Arc::new(TestRpcClient::new());
        client.set_symbol_tick("EURUSD", SymbolTick { bid: 1.1004, ask: 1.1005 });
        client.queue_order_result(Ok(OrderResult { retcode: 10009, order: 5002, comment: "done".into() }));

        let mut config = slave_config();
        config.invert_trades = true;
        let executor = SlaveExecutor::new(client.clone(), config);
        let lot_calc = LotCalculator::new(0.0, 0.0);

        executor.open_position(&master_position(), &lot_calc).await.unwrap();
        let sent = client.sent_orders();
        assert_eq!(sent[0].order_type, OrderType::Sell);
        assert_eq!(sent[0].price, 1.1004);
    }

    #[tokio::test]
    async fn close_position_references_the_slave_ticket_and_reverses_the_side() {
        let client = Arc::new(TestRpcClient::new());
        client.set_symbol_tick("EURUSD", SymbolTick { bid: 1.1004, ask: 1.1005 });
        client.queue_order_result(Ok(OrderResult { retcode: 10009, order: 9999, comment: "closed".into() }));

        let executor = SlaveExecutor::new(client.clone(), slave_config());
        executor
            .close_position(5001, "EURUSD", Side::Buy, 0.5)
            .await
            .unwrap();

        let sent = client.sent_orders();
        assert_eq!(sent[0].position, Some(5001));
        assert_eq!(sent[0].order_type, OrderType::Sell);
        assert_eq!(sent[0].price, 1.1004);
        assert_eq!(sent[0].comment, "CT:close");
    }

    #[tokio::test]
    async fn open_position_picks_ioc_when_fok_unsupported() {
        let client = Arc::new(TestRpcClient::new());
        client.set_symbol_tick("EURUSD", SymbolTick { bid: 1.1004, ask: 1.1005 });
        client.set_symbol_info(
            "EURUSD",
            SymbolInfo { visible: true, filling_mode: 0b10, volume_min: 0.01, volume_max: 10.0, volume_step: 0.01 },
        );
        client.queue_order_result(Ok(OrderResult { retcode: 10009, order: 5003, comment: "done".into() }));

        let executor = SlaveExecutor::new(client.clone(), slave_config());
        let lot_calc = LotCalculator::new(0.0, 0.0);
        executor.open_position(&master_position(), &lot_calc).await.unwrap();

        assert_eq!(client.sent_orders()[0].type_filling, 1);
    }

    #[test]
    fn filling_mode_prefers_fok_then_ioc_then_return() {
        assert_eq!(select_filling_mode(0b01), 0);
        assert_eq!(select_filling_mode(0b11), 0);
        assert_eq!(select_filling_mode(0b10), 1);
        assert_eq!(select_filling_mode(0b00), 2);
    }
}
