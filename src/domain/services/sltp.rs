use crate::domain::models::Side;

/// Result of a distance-preserving SL/TP transform: 0 means "unset" on the slave side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlTp {
    pub sl: f64,
    pub tp: f64,
}

/// Preserves the *distance* between entry price and SL/TP rather than the absolute level (§4.4,
/// §9): distance is measured from `reference_price` (the master's entry) and re-applied from
/// `entry_price` (the executing account's own entry). Used identically by the open path (a fresh
/// execution price) and the modify path (the slave's already-recorded entry) — the REDESIGN FLAG
/// that fixes the source's pass-through bug on the modify path: both call sites go through this
/// one function.
pub fn distance_preserve(side: Side, entry_price: f64, reference_price: f64, sl: f64, tp: f64) -> SlTp {
    let sl_distance = if sl > 0.0 { (reference_price - sl).abs() } else { 0.0 };
    let tp_distance = if tp > 0.0 { (reference_price - tp).abs() } else { 0.0 };

    let (sl_out, tp_out) = match side {
        Side::Buy => (
            if sl_distance > 0.0 { entry_price - sl_distance } else { 0.0 },
            if tp_distance > 0.0 { entry_price + tp_distance } else { 0.0 },
        ),
        Side::Sell => (
            if sl_distance > 0.0 { entry_price + sl_distance } else { 0.0 },
            if tp_distance > 0.0 { entry_price - tp_distance } else { 0.0 },
        ),
    };

    SlTp { sl: sl_out, tp: tp_out }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === S1 — single open, single slave, EXACT ===
    #[test]
    fn buy_preserves_distance_from_master_entry() {
        let result = distance_preserve(Side::Buy, 1.1005, 1.1000, 1.0950, 1.1100);
        assert!((result.sl - (1.1005 - 0.0050)).abs() < 1e-9);
        assert!((result.tp - (1.1005 + 0.0100)).abs() < 1e-9);
    }

    // === S2 — invert ===
    #[test]
    fn sell_mirrors_the_distance_on_the_other_side() {
        let result = distance_preserve(Side::Sell, 1.1005, 1.1000, 1.0950, 1.1100);
        assert!((result.sl - (1.1005 + 0.0050)).abs() < 1e-9);
        assert!((result.tp - (1.1005 - 0.0100)).abs() < 1e-9);
    }

    #[test]
    fn zero_master_sl_yields_unset_slave_sl() {
        let result = distance_preserve(Side::Buy, 1.1005, 1.1000, 0.0, 1.1100);
        assert_eq!(result.sl, 0.0);
    }

    #[test]
    fn zero_master_tp_yields_unset_slave_tp() {
        let result = distance_preserve(Side::Buy, 1.1005, 1.1000, 1.0950, 0.0);
        assert_eq!(result.tp, 0.0);
    }
}
