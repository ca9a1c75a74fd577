use std::collections::HashMap;

use crate::domain::models::{ChangeSet, Modification, PartialClose, PositionSnapshot};

/// Default volume tolerance for partial-close detection (§4.1).
pub const DEFAULT_VOLUME_TOLERANCE: f64 = 0.001;
/// Default price tolerance for SL/TP modification detection (§4.1).
pub const DEFAULT_PRICE_TOLERANCE: f64 = 0.00001;

/// Compares consecutive position snapshots and yields a typed `ChangeSet` (§4.1).
pub struct ChangeDetector {
    previous: HashMap<i64, PositionSnapshot>,
    volume_tolerance: f64,
    price_tolerance: f64,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME_TOLERANCE, DEFAULT_PRICE_TOLERANCE)
    }
}

impl ChangeDetector {
    pub fn new(volume_tolerance: f64, price_tolerance: f64) -> Self {
        Self {
            previous: HashMap::new(),
            volume_tolerance,
            price_tolerance,
        }
    }

    /// Installs the baseline without emitting changes, so pre-existing positions are never copied.
    pub fn set_initial(&mut self, snapshot: Vec<PositionSnapshot>) {
        self.previous = snapshot.into_iter().map(|s| (s.ticket, s)).collect();
    }

    pub fn reset(&mut self) {
        self.previous.clear();
    }

    /// Computes the diff against the stored baseline, then adopts `current` as the new baseline.
    pub fn diff(&mut self, current: Vec<PositionSnapshot>) -> ChangeSet {
        let mut change_set = ChangeSet::default();
        let current_by_ticket: HashMap<i64, &PositionSnapshot> =
            current.iter().map(|s| (s.ticket, s)).collect();

        for snapshot in &current {
            if !self.previous.contains_key(&snapshot.ticket) {
                change_set.opens.push(snapshot.clone());
            }
        }

        for (ticket, prev) in &self.previous {
            if !current_by_ticket.contains_key(ticket) {
                change_set.closes.push(prev.clone());
            }
        }

        for (ticket, prev) in &self.previous {
            let Some(curr) = current_by_ticket.get(ticket) else {
                continue;
            };

            if curr.volume < prev.volume - self.volume_tolerance {
                change_set.partials.push(PartialClose {
                    ticket: *ticket,
                    closed_volume: round2(prev.volume - curr.volume),
                    remaining_volume: curr.volume,
                    original_volume: prev.volume,
                });
                continue;
            }

            if (curr.sl - prev.sl).abs() > self.price_tolerance
                || (curr.tp - prev.tp).abs() > self.price_tolerance
            {
                change_set.modifications.push(Modification {
                    ticket: *ticket,
                    old_sl: prev.sl,
                    new_sl: curr.sl,
                    old_tp: prev.tp,
                    new_tp: curr.tp,
                });
            }

            // A volume increase on an existing ticket is not a defined change kind (§4.1); ignored.
        }

        self.previous = current.into_iter().map(|s| (s.ticket, s)).collect();
        change_set
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
