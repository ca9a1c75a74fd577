use super::SqliteStore;
use crate::domain::models::{MappingStatus, PositionMapping, Side};
use crate::ports::store::MappingStore;

async fn in_memory_store() -> SqliteStore {
    SqliteStore::new("sqlite::memory:").await.expect("schema creation")
}

fn mapping(master_ticket: i64, slave_name: &str, slave_ticket: i64) -> PositionMapping {
    PositionMapping::new_open(
        master_ticket,
        slave_name,
        slave_ticket,
        0.1,
        0.1,
        "EURUSD",
        Side::Buy,
        1.1000,
        1.1005,
    )
}

#[tokio::test]
async fn save_then_load_open_mappings_round_trips() {
    let store = in_memory_store().await;
    store.save_mappings(1, vec![mapping(1, "slave1", 7001)]).await.unwrap();

    let open = store.load_open_mappings().await.unwrap();
    assert_eq!(open.get(&1).unwrap().len(), 1);
    assert_eq!(open[&1][0].slave_ticket, 7001);
}

// === S6 — restart recovery: a crash-restart reloads identical rows ===
#[tokio::test]
async fn mappings_survive_a_fresh_connection_to_the_same_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("copier.db");
    let url = format!("sqlite://{}?mode=rwc", db_path.display());

    {
        let store = SqliteStore::new(&url).await.unwrap();
        store.save_mappings(42, vec![mapping(42, "slave1", 9001)]).await.unwrap();
    }

    let reopened = SqliteStore::new(&url).await.unwrap();
    let open = reopened.load_open_mappings().await.unwrap();
    assert_eq!(open[&42][0].slave_ticket, 9001);
}

#[tokio::test]
async fn save_mappings_upserts_on_master_ticket_and_slave_name() {
    let store = in_memory_store().await;
    store.save_mappings(1, vec![mapping(1, "slave1", 7001)]).await.unwrap();

    let mut updated = mapping(1, "slave1", 7001);
    updated.slave_volume = 0.04;
    store.save_mappings(1, vec![updated]).await.unwrap();

    let loaded = store.get_mapping(1, "slave1").await.unwrap().unwrap();
    assert_eq!(loaded.slave_volume, 0.04);

    let all = store.list_mappings().await.unwrap();
    assert_eq!(all.iter().filter(|m| m.master_ticket == 1 && m.slave_name == "slave1").count(), 1);
}

#[tokio::test]
async fn update_mappings_status_sets_closed_at_only_when_closed() {
    let store = in_memory_store().await;
    store.save_mappings(1, vec![mapping(1, "slave1", 7001)]).await.unwrap();

    store.update_mappings_status(1, MappingStatus::Closed).await.unwrap();
    let closed = store.get_mapping(1, "slave1").await.unwrap().unwrap();
    assert_eq!(closed.status, MappingStatus::Closed);
    assert!(closed.closed_at.is_some());
}

#[tokio::test]
async fn update_mapping_volume_updates_only_the_targeted_row() {
    let store = in_memory_store().await;
    store.save_mappings(1, vec![mapping(1, "slave1", 7001), mapping(1, "slave2", 7002)]).await.unwrap();

    store.update_mapping_volume(1, "slave1", 0.04).await.unwrap();

    assert_eq!(store.get_mapping(1, "slave1").await.unwrap().unwrap().slave_volume, 0.04);
    assert_eq!(store.get_mapping(1, "slave2").await.unwrap().unwrap().slave_volume, 0.1);
}

#[tokio::test]
async fn log_event_records_audit_entries_without_touching_mappings() {
    let store = in_memory_store().await;
    store
        .log_event(crate::domain::models::AuditLogEntry::new("slave_open_rejected").with_master_ticket(1))
        .await
        .unwrap();
    assert!(store.list_mappings().await.unwrap().is_empty());
}
