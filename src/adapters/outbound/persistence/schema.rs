use sqlx::sqlite::SqlitePool;

/// Creates the three relations of §4.6 idempotently; no migration framework (matches the teacher).
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS position_mappings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            master_ticket INTEGER NOT NULL,
            slave_name TEXT NOT NULL,
            slave_ticket INTEGER NOT NULL,
            master_volume REAL NOT NULL,
            slave_volume REAL NOT NULL,
            symbol TEXT NOT NULL,
            direction TEXT NOT NULL,
            master_price_open REAL NOT NULL DEFAULT 0,
            slave_price_open REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'open',
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            closed_at DATETIME,
            UNIQUE (master_ticket, slave_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS operation_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            operation_type TEXT NOT NULL,
            master_ticket INTEGER NOT NULL,
            slave_name TEXT NOT NULL,
            payload TEXT NOT NULL DEFAULT '{}',
            attempts INTEGER NOT NULL DEFAULT 0,
            max_attempts INTEGER NOT NULL DEFAULT 3,
            status TEXT NOT NULL DEFAULT 'pending',
            error_message TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            next_retry_at DATETIME,
            completed_at DATETIME
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_type TEXT NOT NULL,
            master_ticket INTEGER,
            slave_name TEXT,
            slave_ticket INTEGER,
            details TEXT,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_mappings_master_ticket ON position_mappings(master_ticket)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_mappings_status ON position_mappings(status)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_queue_status_retry ON operation_queue(status, next_retry_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_event_type ON audit_log(event_type)")
        .execute(pool)
        .await?;

    Ok(())
}
