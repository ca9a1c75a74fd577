use serde::{Deserialize, Serialize};

/// Position / order side, matching MT5's `POSITION_TYPE_BUY`/`POSITION_TYPE_SELL` (0/1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn inverted(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn from_mt5_type(raw: i32) -> Option<Side> {
        match raw {
            0 => Some(Side::Buy),
            1 => Some(Side::Sell),
            _ => None,
        }
    }
}

/// Lot sizing policy applied by the Lot Calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LotMode {
    Exact,
    Fixed,
    Multiplier,
    Proportional,
}

impl Default for LotMode {
    fn default() -> Self {
        LotMode::Exact
    }
}

/// Lifecycle status of a `PositionMapping` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    Open,
    Closed,
    Error,
}

impl MappingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MappingStatus::Open => "open",
            MappingStatus::Closed => "closed",
            MappingStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<MappingStatus> {
        match s {
            "open" => Some(MappingStatus::Open),
            "closed" => Some(MappingStatus::Closed),
            "error" => Some(MappingStatus::Error),
            _ => None,
        }
    }
}

/// `order_send` order type, mirrors MT5's `ORDER_TYPE_*` family (market orders only, per Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Buy = 0,
    Sell = 1,
}

impl From<Side> for OrderType {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => OrderType::Buy,
            Side::Sell => OrderType::Sell,
        }
    }
}

/// `order_send` trade action constants (§6): only DEAL and SLTP are used (market orders with SL/TP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Deal = 1,
    Sltp = 6,
}

/// Broker retcode constants (§6).
pub mod retcode {
    pub const DONE: i32 = 10009;
    pub const PLACED: i32 = 10008;
    pub const REJECT: i32 = 10006;
    pub const INVALID_VOLUME: i32 = 10014;
    pub const INVALID_PRICE: i32 = 10015;
    pub const INVALID_STOPS: i32 = 10016;
    pub const NO_MONEY: i32 = 10019;
    pub const MARKET_CLOSED: i32 = 10018;
    pub const CONNECTION: i32 = 10031;

    /// Retcodes for which the Retry Manager never schedules a second attempt (§4.5).
    pub const NON_RETRYABLE: [i32; 5] =
        [REJECT, INVALID_VOLUME, INVALID_PRICE, INVALID_STOPS, NO_MONEY];

    pub fn is_retryable(code: i32) -> bool {
        code != DONE && !NON_RETRYABLE.contains(&code)
    }
}

/// Status of a single Retry Manager operation attempt (§4.5 state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_inverts() {
        assert_eq!(Side::Buy.inverted(), Side::Sell);
        assert_eq!(Side::Sell.inverted(), Side::Buy);
    }

    #[test]
    fn side_from_mt5_type() {
        assert_eq!(Side::from_mt5_type(0), Some(Side::Buy));
        assert_eq!(Side::from_mt5_type(1), Some(Side::Sell));
        assert_eq!(Side::from_mt5_type(2), None);
    }

    #[test]
    fn non_retryable_retcodes_match_spec() {
        assert!(!retcode::is_retryable(retcode::REJECT));
        assert!(!retcode::is_retryable(retcode::NO_MONEY));
        assert!(retcode::is_retryable(retcode::MARKET_CLOSED));
        assert!(retcode::is_retryable(retcode::CONNECTION));
        assert!(!retcode::is_retryable(retcode::DONE));
    }

    #[test]
    fn mapping_status_roundtrips_through_str() {
        for s in [MappingStatus::Open, MappingStatus::Closed, MappingStatus::Error] {
            assert_eq!(MappingStatus::parse(s.as_str()), Some(s));
        }
    }
}
