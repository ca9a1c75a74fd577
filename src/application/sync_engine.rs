use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{Mutex, RwLock};

use crate::application::master_monitor::MasterMonitor;
use crate::application::slave_executor::SlaveExecutor;
use crate::domain::models::{
    retcode, AuditLogEntry, ChangeSet, EngineSettings, MappingStatus, PositionMapping, Side,
    SlaveConfig, SlaveConfigUpdate,
};
use crate::domain::services::{
    execute_with_retry, AttemptOutcome, LotCalculator, RetryPolicy, SymbolVolumeInfo,
};
use crate::ports::rpc::RpcClient;
use crate::ports::store::MappingStore;

/// Top-level orchestrator (§4.7): starts the monitor and slave executors, runs the poll loop,
/// fans each change out to eligible slaves, updates the store, runs the heartbeat. The slaves map
/// and the in-memory mapping cache are the two pieces of state shared between the poll loop, the
/// heartbeat task, and control-surface operations (§5) — both live behind `tokio::sync::RwLock`.
pub struct SyncEngine {
    master: Mutex<MasterMonitor>,
    slaves: RwLock<HashMap<String, Arc<SlaveExecutor>>>,
    mappings: RwLock<HashMap<i64, Vec<PositionMapping>>>,
    store: Arc<dyn MappingStore>,
    settings: EngineSettings,
    running: AtomicBool,
}

impl SyncEngine {
    pub fn new(master: MasterMonitor, store: Arc<dyn MappingStore>, settings: EngineSettings) -> Self {
        Self {
            master: Mutex::new(master),
            slaves: RwLock::new(HashMap::new()),
            mappings: RwLock::new(HashMap::new()),
            store,
            settings,
            running: AtomicBool::new(false),
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.settings.retry_attempts,
            Duration::from_millis(self.settings.retry_delay_ms),
            Duration::from_secs(30),
        )
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn slave_names(&self) -> Vec<String> {
        self.slaves.read().await.keys().cloned().collect()
    }

    pub async fn slave_config(&self, name: &str) -> Option<SlaveConfig> {
        let slaves = self.slaves.read().await;
        match slaves.get(name) {
            Some(executor) => Some(executor.config_snapshot().await),
            None => None,
        }
    }

    pub async fn slave_state(&self, name: &str) -> Option<crate::domain::models::AccountState> {
        let slaves = self.slaves.read().await;
        match slaves.get(name) {
            Some(executor) => Some(executor.state_snapshot().await),
            None => None,
        }
    }

    pub async fn master_state(&self) -> crate::domain::models::AccountState {
        self.master.lock().await.state().clone()
    }

    pub async fn mapping_count(&self) -> usize {
        self.mappings.read().await.values().map(Vec::len).sum()
    }

    pub async fn mappings_for_master_ticket(&self, ticket: i64) -> Vec<PositionMapping> {
        self.mappings.read().await.get(&ticket).cloned().unwrap_or_default()
    }

    pub async fn all_mappings(&self) -> Vec<PositionMapping> {
        self.mappings.read().await.values().flatten().cloned().collect()
    }

    pub async fn slaves_connected(&self) -> usize {
        let slaves = self.slaves.read().await;
        let mut count = 0;
        for executor in slaves.values() {
            if executor.state_snapshot().await.connected {
                count += 1;
            }
        }
        count
    }

    /// `start(initial_delay)` (§4.7): wait for broker containers to boot, initialize the master
    /// with generous retries, initialize every enabled slave, drop the ones that fail, refuse to
    /// run if none survive, load the persisted open-mapping set, then return — the caller spawns
    /// `run_poll_loop`/`run_heartbeat` as background tasks.
    pub async fn start(self: &Arc<Self>, initial_delay: Duration) -> anyhow::Result<()> {
        tokio::time::sleep(initial_delay).await;

        let master_ok = self
            .master
            .lock()
            .await
            .initialize(self.settings.retry_attempts.max(5), Duration::from_millis(self.settings.retry_delay_ms))
            .await;
        if !master_ok {
            anyhow::bail!("failed to initialize master connection");
        }

        let mut surviving = 0;
        {
            let slaves = self.slaves.read().await;
            for executor in slaves.values() {
                if executor.is_enabled().await && executor.initialize().await {
                    surviving += 1;
                }
            }
        }
        if !self.slaves.read().await.is_empty() && surviving == 0 {
            anyhow::bail!("every configured slave failed to initialize");
        }

        let loaded = self.store.load_open_mappings().await?;
        *self.mappings.write().await = loaded;

        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.master.lock().await.shutdown().await;
        let slaves = self.slaves.read().await;
        for executor in slaves.values() {
            executor.shutdown().await;
        }
    }

    /// The poll loop (§4.7): `detect_changes` → `process` (if non-empty) → sleep. Errors in one
    /// iteration are logged and followed by a 1s cooldown rather than aborting the loop.
    pub async fn run_poll_loop(self: Arc<Self>) {
        while self.running.load(Ordering::SeqCst) {
            let changes = self.master.lock().await.detect_changes().await;
            if !changes.is_empty() {
                self.process(changes).await;
            }
            tokio::time::sleep(Duration::from_millis(self.settings.polling_interval_ms)).await;
        }
    }

    /// Heartbeat task (§4.7, every `heartbeat_interval_ms`): refreshes master account info, then
    /// pushes the master balance to each slave implicitly by reading it fresh in `process`.
    pub async fn run_heartbeat(self: Arc<Self>) {
        while self.running.load(Ordering::SeqCst) {
            self.master.lock().await.update_account_info().await;
            let slaves = self.slaves.read().await;
            for executor in slaves.values() {
                executor.refresh_account_info().await;
            }
            drop(slaves);
            tokio::time::sleep(Duration::from_millis(self.settings.heartbeat_interval_ms)).await;
        }
    }

    pub async fn process(&self, changes: ChangeSet) {
        let master_balance = self.master.lock().await.balance();

        tokio::join!(
            self.process_opens(&changes.opens, master_balance),
            self.process_closes(&changes.closes),
            self.process_partials(&changes.partials, master_balance),
            self.process_modifications(&changes.modifications),
        );
    }

    async fn process_opens(
        &self,
        opens: &[crate::domain::models::PositionSnapshot],
        master_balance: f64,
    ) {
        for master_pos in opens {
            let slaves: Vec<(String, Arc<SlaveExecutor>)> = {
                let guard = self.slaves.read().await;
                guard
                    .iter()
                    .map(|(name, executor)| (name.clone(), executor.clone()))
                    .collect()
            };

            let mut tasks = Vec::new();
            for (name, executor) in slaves {
                let master_pos = master_pos.clone();
                let policy = self.retry_policy();
                tasks.push(tokio::spawn(async move {
                    if !executor.is_enabled().await || !executor.should_copy_symbol(&master_pos.symbol).await {
                        return (name, None);
                    }
                    let slave_balance = executor.balance().await;
                    let lot_calc = LotCalculator::new(master_balance, slave_balance);
                    let outcome = open_with_retry(&executor, &master_pos, lot_calc, policy).await;
                    (name, outcome)
                }));
            }

            let mut new_mappings = Vec::new();
            for task in tasks {
                let (slave_name, outcome) = match task.await {
                    Ok(v) => v,
                    Err(_) => continue,
                };
                match outcome {
                    Some(outcome) if outcome.order_result.retcode == retcode::DONE => {
                        let side = self
                            .slave_config(&slave_name)
                            .await
                            .map(|cfg| if cfg.invert_trades { master_pos.side.inverted() } else { master_pos.side })
                            .unwrap_or(master_pos.side);
                        let mapping = PositionMapping::new_open(
                            master_pos.ticket,
                            slave_name.clone(),
                            outcome.order_result.order,
                            master_pos.volume,
                            outcome.slave_volume,
                            master_pos.symbol.clone(),
                            side,
                            master_pos.price_open,
                            outcome.execution_price,
                        );
                        let _ = self
                            .store
                            .log_event(
                                AuditLogEntry::new("slave_open_succeeded")
                                    .with_master_ticket(master_pos.ticket)
                                    .with_slave_name(slave_name)
                                    .with_slave_ticket(outcome.order_result.order),
                            )
                            .await;
                        new_mappings.push(mapping);
                    }
                    Some(outcome) => {
                        // S5: non-retryable rejection — no mapping row, audit only.
                        let _ = self
                            .store
                            .log_event(
                                AuditLogEntry::new("slave_open_rejected")
                                    .with_master_ticket(master_pos.ticket)
                                    .with_slave_name(slave_name)
                                    .with_details(json!({ "retcode": outcome.order_result.retcode })),
                            )
                            .await;
                    }
                    None => {}
                }
            }

            if !new_mappings.is_empty() {
                if self.store.save_mappings(master_pos.ticket, new_mappings.clone()).await.is_ok() {
                    self.mappings
                        .write()
                        .await
                        .entry(master_pos.ticket)
                        .or_default()
                        .extend(new_mappings);
                }
            }
        }
    }

    async fn process_closes(&self, closes: &[crate::domain::models::PositionSnapshot]) {
        for closed in closes {
            let mappings = {
                let guard = self.mappings.read().await;
                guard.get(&closed.ticket).cloned()
            };
            let Some(mappings) = mappings else {
                tracing::warn!(ticket = closed.ticket, "close for unknown master ticket, skipping");
                continue;
            };

            let slaves = self.slaves.read().await;
            let mut tasks = Vec::new();
            for mapping in mappings.iter().filter(|m| m.status == MappingStatus::Open) {
                if let Some(executor) = slaves.get(&mapping.slave_name).cloned() {
                    let symbol = mapping.symbol.clone();
                    let direction = mapping.direction;
                    let volume = mapping.slave_volume;
                    let slave_ticket = mapping.slave_ticket;
                    tasks.push(tokio::spawn(async move {
                        executor.close_position(slave_ticket, &symbol, direction, volume).await
                    }));
                }
            }
            drop(slaves);
            for task in tasks {
                let _ = task.await;
            }

            let _ = self.store.update_mappings_status(closed.ticket, MappingStatus::Closed).await;
            self.mappings.write().await.remove(&closed.ticket);
        }
    }

    async fn process_partials(&self, partials: &[crate::domain::models::PartialClose], _master_balance: f64) {
        for partial in partials {
            let mappings = {
                let guard = self.mappings.read().await;
                guard.get(&partial.ticket).cloned().unwrap_or_default()
            };

            let mut tasks = Vec::new();
            for mapping in mappings.into_iter().filter(|m| m.status == MappingStatus::Open) {
                let slaves = self.slaves.read().await;
                let Some(executor) = slaves.get(&mapping.slave_name).cloned() else { continue };
                drop(slaves);

                let closed_volume = partial.closed_volume;
                let original_volume = partial.original_volume;
                tasks.push(tokio::spawn(async move {
                    let symbol_info = symbol_volume_info(&executor, &mapping.symbol).await;
                    let lot_calc = LotCalculator::new(0.0, 0.0);
                    let close_volume = lot_calc.calculate_partial_close(
                        closed_volume,
                        original_volume,
                        mapping.slave_volume,
                        symbol_info,
                    );
                    if close_volume <= 0.0 {
                        return (mapping, None);
                    }

                    let result = executor
                        .partial_close_position(mapping.slave_ticket, &mapping.symbol, mapping.direction, close_volume)
                        .await;
                    (mapping, result.ok().map(|order_result| (order_result, close_volume)))
                }));
            }

            for task in tasks {
                let Ok((mapping, outcome)) = task.await else { continue };
                let Some((order_result, close_volume)) = outcome else { continue };
                if order_result.retcode != retcode::DONE {
                    continue;
                }

                let remaining = (mapping.slave_volume - close_volume).max(0.0);
                let _ = self.store.update_mapping_volume(partial.ticket, &mapping.slave_name, remaining).await;
                let mut guard = self.mappings.write().await;
                if let Some(rows) = guard.get_mut(&partial.ticket) {
                    for row in rows.iter_mut() {
                        if row.slave_name == mapping.slave_name {
                            row.slave_volume = remaining;
                        }
                    }
                }
            }
        }
    }

    async fn process_modifications(&self, modifications: &[crate::domain::models::Modification]) {
        for modification in modifications {
            let mappings = {
                let guard = self.mappings.read().await;
                guard.get(&modification.ticket).cloned().unwrap_or_default()
            };

            let mut tasks = Vec::new();
            for mapping in mappings.into_iter().filter(|m| m.status == MappingStatus::Open) {
                let slaves = self.slaves.read().await;
                let Some(executor) = slaves.get(&mapping.slave_name).cloned() else { continue };
                drop(slaves);

                let new_sl = modification.new_sl;
                let new_tp = modification.new_tp;
                tasks.push(tokio::spawn(async move {
                    let slave_entry = match executor.get_position_by_ticket(mapping.slave_ticket).await {
                        Ok(Some(pos)) => pos.price_open,
                        _ => mapping.slave_price_open,
                    };

                    executor
                        .modify_position(
                            mapping.slave_ticket,
                            &mapping.symbol,
                            mapping.direction,
                            slave_entry,
                            mapping.master_price_open,
                            new_sl,
                            new_tp,
                        )
                        .await
                }));
            }

            for task in tasks {
                let _ = task.await;
            }
        }
    }

    // === Dynamic operations (§4.7), safe against the poll loop via the slaves RwLock ===

    pub async fn add_slave(&self, config: SlaveConfig, client: Arc<dyn RpcClient>) -> anyhow::Result<()> {
        let mut slaves = self.slaves.write().await;
        if slaves.contains_key(&config.name) {
            anyhow::bail!("slave '{}' already exists", config.name);
        }

        let executor = Arc::new(SlaveExecutor::new(client, config.clone()));
        if config.enabled {
            executor.initialize().await;
        }
        slaves.insert(config.name.clone(), executor);
        drop(slaves);

        let _ = self
            .store
            .log_event(AuditLogEntry::new("slave_added").with_slave_name(config.name))
            .await;
        Ok(())
    }

    pub async fn remove_slave(&self, name: &str, close_positions: bool) -> anyhow::Result<()> {
        let executor = {
            let mut slaves = self.slaves.write().await;
            slaves.remove(name)
        };
        let Some(executor) = executor else {
            anyhow::bail!("unknown slave '{name}'");
        };

        if close_positions {
            let mut guard = self.mappings.write().await;
            for (master_ticket, rows) in guard.iter_mut() {
                for mapping in rows.iter().filter(|m| m.slave_name == name && m.status == MappingStatus::Open) {
                    let _ = executor
                        .close_position(mapping.slave_ticket, &mapping.symbol, mapping.direction, mapping.slave_volume)
                        .await;
                    let _ = self.store.update_mappings_status(*master_ticket, MappingStatus::Closed).await;
                }
            }
            for rows in guard.values_mut() {
                rows.retain(|m| m.slave_name != name);
            }
            guard.retain(|_, rows| !rows.is_empty());
        }

        executor.shutdown().await;
        let _ = self
            .store
            .log_event(AuditLogEntry::new("slave_removed").with_slave_name(name.to_string()))
            .await;
        Ok(())
    }

    pub async fn enable_slave(&self, name: &str) -> anyhow::Result<()> {
        let executor = {
            let slaves = self.slaves.read().await;
            slaves.get(name).cloned()
        };
        let Some(executor) = executor else { anyhow::bail!("unknown slave '{name}'") };
        executor.set_enabled(true).await;
        if !executor.state_snapshot().await.connected {
            executor.initialize().await;
        }
        let _ = self
            .store
            .log_event(AuditLogEntry::new("slave_enabled").with_slave_name(name.to_string()))
            .await;
        Ok(())
    }

    pub async fn disable_slave(&self, name: &str, close_positions: bool) -> anyhow::Result<()> {
        let executor = {
            let slaves = self.slaves.read().await;
            slaves.get(name).cloned()
        };
        let Some(executor) = executor else { anyhow::bail!("unknown slave '{name}'") };

        if close_positions {
            let guard = self.mappings.read().await;
            for (master_ticket, rows) in guard.iter() {
                for mapping in rows.iter().filter(|m| m.slave_name == name && m.status == MappingStatus::Open) {
                    let _ = executor
                        .close_position(mapping.slave_ticket, &mapping.symbol, mapping.direction, mapping.slave_volume)
                        .await;
                    let _ = self.store.update_mappings_status(*master_ticket, MappingStatus::Closed).await;
                }
            }
        }

        executor.set_enabled(false).await;
        executor.shutdown().await;
        let _ = self
            .store
            .log_event(AuditLogEntry::new("slave_disabled").with_slave_name(name.to_string()))
            .await;
        Ok(())
    }

    pub async fn update_slave(&self, name: &str, update: SlaveConfigUpdate) -> anyhow::Result<()> {
        let executor = {
            let slaves = self.slaves.read().await;
            slaves.get(name).cloned()
        };
        let Some(executor) = executor else { anyhow::bail!("unknown slave '{name}'") };

        let mut config = executor.config_snapshot().await;
        config.apply_whitelisted_update(&update);
        executor.set_config(config).await;

        let _ = self
            .store
            .log_event(AuditLogEntry::new("slave_updated").with_slave_name(name.to_string()))
            .await;
        Ok(())
    }
}

async fn symbol_volume_info(executor: &SlaveExecutor, symbol: &str) -> Option<SymbolVolumeInfo> {
    executor.symbol_volume_info_for(symbol).await
}

/// Runs `open_position` under bounded retry, keeping the last attempt's outcome around since
/// `RetryResult` itself only carries the terminal status (§4.5).
async fn open_with_retry(
    executor: &Arc<SlaveExecutor>,
    master_pos: &crate::domain::models::PositionSnapshot,
    lot_calc: LotCalculator,
    policy: RetryPolicy,
) -> Option<crate::application::slave_executor::OpenOutcome> {
    let last: std::sync::Mutex<Option<crate::application::slave_executor::OpenOutcome>> =
        std::sync::Mutex::new(None);

    execute_with_retry(policy, |_attempt| {
        let executor = executor.clone();
        let master_pos = master_pos.clone();
        async {
            match executor.open_position(&master_pos, &lot_calc).await {
                Ok(outcome) => {
                    let retcode = outcome.order_result.retcode;
                    let done = retcode == crate::domain::models::retcode::DONE;
                    *last.lock().unwrap() = Some(outcome);
                    if done {
                        AttemptOutcome::Done
                    } else {
                        AttemptOutcome::Retcode(retcode)
                    }
                }
                Err(e) => AttemptOutcome::TransportError(e.to_string()),
            }
        }
    })
    .await;

    last.into_inner().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::persistence::SqliteStore;
    use crate::adapters::outbound::rpc::TestRpcClient;
    use crate::domain::models::{LotMode, OrderType, PositionSnapshot};
    use crate::ports::rpc::{AccountInfo, OrderResult, SymbolTick};

    fn master_config() -> crate::domain::models::MasterConfig {
        crate::domain::models::MasterConfig {
            name: "master".into(),
            host: "mt5-master".into(),
            port: 8001,
            login: None,
            password: None,
            server: None,
        }
    }

    fn slave_config(name: &str) -> SlaveConfig {
        SlaveConfig {
            name: name.into(),
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

    fn master_position(ticket: i64) -> PositionSnapshot {
        PositionSnapshot {
            ticket,
            symbol: "EURUSD".into(),
            side: Side::Buy,
            volume: 0.10,
            price_open: 1.1000,
            sl: 1.0950,
            tp: 1.1100,
            magic: 0,
            comment: String::new(),
            time: 0,
            profit: 0.0,
        }
    }

    async fn engine_with_one_slave() -> (Arc<SyncEngine>, Arc<TestRpcClient>, Arc<TestRpcClient>) {
        let master_client = Arc::new(TestRpcClient::new());
        master_client.set_positions(vec![]);
        master_client.set_account_info(AccountInfo { login: 1, balance: 10_000.0, equity: 10_000.0, margin_level: None });

        let monitor = MasterMonitor::new(master_config(), master_client.clone());
        let store = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
        let engine = Arc::new(SyncEngine::new(monitor, store, EngineSettings::default()));

        let slave_client = Arc::new(TestRpcClient::new());
        slave_client.set_symbol_tick("EURUSD", SymbolTick { bid: 1.1004, ask: 1.1005 });
        engine.add_slave(slave_config("slave1"), slave_client.clone()).await.unwrap();

        engine.start(Duration::from_millis(1)).await.unwrap();
        (engine, master_client, slave_client)
    }

    // === S1 — single open, single slave, EXACT ===
    #[tokio::test]
    async fn processing_an_open_creates_a_mapping_on_success() {
        let (engine, _master_client, slave_client) = engine_with_one_slave().await;
        slave_client.queue_order_result(Ok(OrderResult { retcode: 10009, order: 7001, comment: "done".into() }));

        let mut changes = ChangeSet::default();
        changes.opens.push(master_position(1));
        engine.process(changes).await;

        let mappings = engine.mappings_for_master_ticket(1).await;
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].slave_ticket, 7001);
        assert_eq!(mappings[0].status, MappingStatus::Open);

        let sent = slave_client.sent_orders();
        assert_eq!(sent[0].order_type, OrderType::Buy);
    }

    // === S5 — non-retryable: exactly one attempt, no mapping row ===
    #[tokio::test]
    async fn a_non_retryable_rejection_yields_no_mapping_row() {
        let (engine, _master_client, slave_client) = engine_with_one_slave().await;
        slave_client.queue_order_result(Ok(OrderResult { retcode: retcode::NO_MONEY, order: 0, comment: "no money".into() }));

        let mut changes = ChangeSet::default();
        changes.opens.push(master_position(2));
        engine.process(changes).await;

        assert!(engine.mappings_for_master_ticket(2).await.is_empty());
        assert_eq!(slave_client.sent_orders().len(), 1);
    }

    #[tokio::test]
    async fn a_close_for_an_unknown_ticket_is_skipped_without_panicking() {
        let (engine, _master_client, _slave_client) = engine_with_one_slave().await;
        let mut changes = ChangeSet::default();
        changes.closes.push(master_position(999));
        engine.process(changes).await;
    }

    #[tokio::test]
    async fn remove_slave_rejects_an_unknown_name() {
        let (engine, _master_client, _slave_client) = engine_with_one_slave().await;
        assert!(engine.remove_slave("does-not-exist", false).await.is_err());
    }

    #[tokio::test]
    async fn add_slave_rejects_a_duplicate_name() {
        let (engine, _master_client, _slave_client) = engine_with_one_slave().await;
        let dup_client = Arc::new(TestRpcClient::new());
        assert!(engine.add_slave(slave_config("slave1"), dup_client).await.is_err());
    }
}
