use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use super::schema::create_schema;
use crate::domain::models::{AuditLogEntry, MappingStatus, PositionMapping, Side};
use crate::ports::store::{MappingStore, StoreError};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(database_url).await?;
        create_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_mapping(row: &sqlx::sqlite::SqliteRow) -> Result<PositionMapping, StoreError> {
        let direction: String = row.get("direction");
        let status: String = row.get("status");
        Ok(PositionMapping {
            id: Some(row.get::<i64, _>("id")),
            master_ticket: row.get("master_ticket"),
            slave_name: row.get("slave_name"),
            slave_ticket: row.get("slave_ticket"),
            master_volume: row.get("master_volume"),
            slave_volume: row.get("slave_volume"),
            symbol: row.get("symbol"),
            direction: side_from_str(&direction),
            master_price_open: row.get("master_price_open"),
            slave_price_open: row.get("slave_price_open"),
            status: MappingStatus::parse(&status).unwrap_or(MappingStatus::Error),
            created_at: row.get("created_at"),
            closed_at: row.get("closed_at"),
        })
    }
}

fn side_to_str(side: Side) -> &'static str {
    match side {
        Side::Buy => "BUY",
        Side::Sell => "SELL",
    }
}

fn side_from_str(s: &str) -> Side {
    match s {
        "SELL" => Side::Sell,
        _ => Side::Buy,
    }
}

#[async_trait]
impl MappingStore for SqliteStore {
    async fn save_mappings(
        &self,
        master_ticket: i64,
        mappings: Vec<PositionMapping>,
    ) -> Result<(), StoreError> {
        for mapping in mappings {
            sqlx::query(
                r#"
                INSERT INTO position_mappings
                    (master_ticket, slave_name, slave_ticket, master_volume, slave_volume,
                     symbol, direction, master_price_open, slave_price_open, status, created_at, closed_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(master_ticket, slave_name) DO UPDATE SET
                    slave_ticket = excluded.slave_ticket,
                    master_volume = excluded.master_volume,
                    slave_volume = excluded.slave_volume,
                    status = excluded.status,
                    closed_at = excluded.closed_at
                "#,
            )
            .bind(master_ticket)
            .bind(&mapping.slave_name)
            .bind(mapping.slave_ticket)
            .bind(mapping.master_volume)
            .bind(mapping.slave_volume)
            .bind(&mapping.symbol)
            .bind(side_to_str(mapping.direction))
            .bind(mapping.master_price_open)
            .bind(mapping.slave_price_open)
            .bind(mapping.status.as_str())
            .bind(mapping.created_at)
            .bind(mapping.closed_at)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn load_open_mappings(&self) -> Result<HashMap<i64, Vec<PositionMapping>>, StoreError> {
        let rows = sqlx::query("SELECT * FROM position_mappings WHERE status = 'open'")
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<i64, Vec<PositionMapping>> = HashMap::new();
        for row in &rows {
            let mapping = Self::row_to_mapping(row)?;
            grouped.entry(mapping.master_ticket).or_default().push(mapping);
        }
        Ok(grouped)
    }

    async fn update_mappings_status(
        &self,
        master_ticket: i64,
        status: MappingStatus,
    ) -> Result<(), StoreError> {
        let closed_at: Option<DateTime<Utc>> = if status == MappingStatus::Closed {
            Some(Utc::now())
        } else {
            None
        };

        sqlx::query(
            "UPDATE position_mappings SET status = ?, closed_at = ? WHERE master_ticket = ?",
        )
        .bind(status.as_str())
        .bind(closed_at)
        .bind(master_ticket)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_mapping_volume(
        &self,
        master_ticket: i64,
        slave_name: &str,
        volume: f64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE position_mappings SET slave_volume = ? WHERE master_ticket = ? AND slave_name = ?",
        )
        .bind(volume)
        .bind(master_ticket)
        .bind(slave_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_mapping(
        &self,
        master_ticket: i64,
        slave_name: &str,
    ) -> Result<Option<PositionMapping>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM position_mappings WHERE master_ticket = ? AND slave_name = ?",
        )
        .bind(master_ticket)
        .bind(slave_name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_mapping).transpose()
    }

    async fn log_event(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        let details = entry
            .details
            .map(|v| serde_json::to_string(&v))
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO audit_log (event_type, master_ticket, slave_name, slave_ticket, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.event_type)
        .bind(entry.master_ticket)
        .bind(&entry.slave_name)
        .bind(entry.slave_ticket)
        .bind(details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_mappings(&self) -> Result<Vec<PositionMapping>, StoreError> {
        let rows = sqlx::query("SELECT * FROM position_mappings ORDER BY master_ticket")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_mapping).collect()
    }
}
