use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::OperationStatus;

/// Durable-retry-queue row (§4.6). Reserved for a future durable-retry variant; the live retry
/// path (`domain::services::retry`) does not consult this table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub id: Option<i64>,
    pub operation_type: String,
    pub master_ticket: i64,
    pub slave_name: String,
    pub payload: serde_json::Value,
    pub attempts: u32,
    pub max_attempts: u32,
    pub status: OperationStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Append-only audit trail row (§3). Written for lifecycle and trade events; never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Option<i64>,
    pub event_type: String,
    pub master_ticket: Option<i64>,
    pub slave_name: Option<String>,
    pub slave_ticket: Option<i64>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            id: None,
            event_type: event_type.into(),
            master_ticket: None,
            slave_name: None,
            slave_ticket: None,
            details: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_master_ticket(mut self, ticket: i64) -> Self {
        self.master_ticket = Some(ticket);
        self
    }

    pub fn with_slave_name(mut self, name: impl Into<String>) -> Self {
        self.slave_name = Some(name.into());
        self
    }

    pub fn with_slave_ticket(mut self, ticket: i64) -> Self {
        self.slave_ticket = Some(ticket);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
