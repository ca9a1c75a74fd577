use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{MappingStatus, Side};

/// Persistent row linking a master ticket to the slave position spawned from it (§3).
/// Uniqueness invariant: `(master_ticket, slave_name)` is unique across the store (inv. 4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionMapping {
    pub id: Option<i64>,
    pub master_ticket: i64,
    pub slave_name: String,
    pub slave_ticket: i64,
    pub master_volume: f64,
    pub slave_volume: f64,
    pub symbol: String,
    pub direction: Side,
    /// Entry prices recorded at open time; the modify path's distance-preservation (§4.4/§4.7)
    /// measures distance from `master_price_open` and re-applies it from `slave_price_open`.
    pub master_price_open: f64,
    pub slave_price_open: f64,
    pub status: MappingStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl PositionMapping {
    #[allow(clippy::too_many_arguments)]
    pub fn new_open(
        master_ticket: i64,
        slave_name: impl Into<String>,
        slave_ticket: i64,
        master_volume: f64,
        slave_volume: f64,
        symbol: impl Into<String>,
        direction: Side,
        master_price_open: f64,
        slave_price_open: f64,
    ) -> Self {
        Self {
            id: None,
            master_ticket,
            slave_name: slave_name.into(),
            slave_ticket,
            master_volume,
            slave_volume,
            symbol: symbol.into(),
            direction,
            master_price_open,
            slave_price_open,
            status: MappingStatus::Open,
            created_at: Utc::now(),
            closed_at: None,
        }
    }
}
