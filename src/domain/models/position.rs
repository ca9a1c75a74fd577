use serde::{Deserialize, Serialize};

use super::enums::Side;

/// Immutable value captured from the broker on a single poll (§3). Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub ticket: i64,
    pub symbol: String,
    pub side: Side,
    pub volume: f64,
    pub price_open: f64,
    pub sl: f64,
    pub tp: f64,
    pub magic: i32,
    pub comment: String,
    pub time: i64,
    pub profit: f64,
}

/// `{ticket, closed_volume, remaining_volume, original_volume}`, `0 < closed_volume < original_volume`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialClose {
    pub ticket: i64,
    pub closed_volume: f64,
    pub remaining_volume: f64,
    pub original_volume: f64,
}

/// `{ticket, old_sl, new_sl, old_tp, new_tp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    pub ticket: i64,
    pub old_sl: f64,
    pub new_sl: f64,
    pub old_tp: f64,
    pub new_tp: f64,
}

/// Four disjoint ordered sequences; a ticket appears in at most one per detection pass (§3, inv. 3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub opens: Vec<PositionSnapshot>,
    pub closes: Vec<PositionSnapshot>,
    pub partials: Vec<PartialClose>,
    pub modifications: Vec<Modification>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.opens.is_empty()
            && self.closes.is_empty()
            && self.partials.is_empty()
            && self.modifications.is_empty()
    }

    pub fn len(&self) -> usize {
        self.opens.len() + self.closes.len() + self.partials.len() + self.modifications.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ticket: i64) -> PositionSnapshot {
        PositionSnapshot {
            ticket,
            symbol: "EURUSD".to_string(),
            side: Side::Buy,
            volume: 0.1,
            price_open: 1.1,
            sl: 1.095,
            tp: 1.11,
            magic: 0,
            comment: String::new(),
            time: 0,
            profit: 0.0,
        }
    }

    #[test]
    fn empty_changeset_is_empty() {
        assert!(ChangeSet::default().is_empty());
    }

    #[test]
    fn changeset_with_one_open_is_not_empty() {
        let mut cs = ChangeSet::default();
        cs.opens.push(snapshot(1));
        assert!(!cs.is_empty());
        assert_eq!(cs.len(), 1);
    }
}
