use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::models::{AuditLogEntry, MappingStatus, PositionMapping};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable mapping from master ticket to the set of (slave, slave ticket, volumes, status) (§4.6).
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Upserts by `(master_ticket, slave_name)` (inv. 4).
    async fn save_mappings(
        &self,
        master_ticket: i64,
        mappings: Vec<PositionMapping>,
    ) -> Result<(), StoreError>;

    /// Loads every `status='open'` row, grouped by `master_ticket`.
    async fn load_open_mappings(&self) -> Result<HashMap<i64, Vec<PositionMapping>>, StoreError>;

    /// Sets `status`; also sets `closed_at=now` when `status == Closed` (inv. 5).
    async fn update_mappings_status(
        &self,
        master_ticket: i64,
        status: MappingStatus,
    ) -> Result<(), StoreError>;

    async fn update_mapping_volume(
        &self,
        master_ticket: i64,
        slave_name: &str,
        volume: f64,
    ) -> Result<(), StoreError>;

    async fn get_mapping(
        &self,
        master_ticket: i64,
        slave_name: &str,
    ) -> Result<Option<PositionMapping>, StoreError>;

    async fn log_event(&self, entry: AuditLogEntry) -> Result<(), StoreError>;

    async fn list_mappings(&self) -> Result<Vec<PositionMapping>, StoreError>;
}
