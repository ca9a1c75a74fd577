use crate::domain::models::{LotMode, SlaveConfig};

/// Broker volume constraints for a symbol (§4.3), as returned by `symbol_info`.
#[derive(Debug, Clone, Copy)]
pub struct SymbolVolumeInfo {
    pub volume_min: f64,
    pub volume_max: f64,
    pub volume_step: f64,
}

/// Pure function of (master lot, slave config, balances, symbol constraints) → slave lot (§4.3).
/// Carries the slave's balance across calls since PROPORTIONAL mode needs both balances at once;
/// holds no other state, so identical inputs always produce identical outputs (inv. 8).
#[derive(Debug, Clone, Copy)]
pub struct LotCalculator {
    master_balance: f64,
    slave_balance: f64,
}

impl LotCalculator {
    pub fn new(master_balance: f64, slave_balance: f64) -> Self {
        Self {
            master_balance,
            slave_balance,
        }
    }

    pub fn update_master_balance(&mut self, balance: f64) {
        self.master_balance = balance;
    }

    pub fn update_slave_balance(&mut self, balance: f64) {
        self.slave_balance = balance;
    }

    /// Returns `(lot, warning)`; `warning` is set only on the PROPORTIONAL fallback-to-EXACT path.
    pub fn calculate(
        &self,
        master_lot: f64,
        config: &SlaveConfig,
        symbol_info: Option<SymbolVolumeInfo>,
    ) -> (f64, Option<&'static str>) {
        let (mut lot, warning) = match config.lot_mode {
            LotMode::Exact => (master_lot, None),
            LotMode::Fixed => (config.lot_value, None),
            LotMode::Multiplier => (master_lot * config.lot_value, None),
            LotMode::Proportional => {
                if self.master_balance > 0.0 {
                    (master_lot * self.slave_balance / self.master_balance, None)
                } else {
                    (
                        master_lot,
                        Some("proportional lot sizing requires master_balance > 0; falling back to EXACT"),
                    )
                }
            }
        };

        lot = lot.clamp(config.min_lot, config.max_lot);

        if let Some(info) = symbol_info {
            lot = lot.clamp(info.volume_min, info.volume_max);
            if info.volume_step > 0.0 {
                lot = (lot / info.volume_step).round() * info.volume_step;
            }
        }

        (round2(lot), warning)
    }

    /// `calculate_partial_close` (§4.3): returns 0 if `master_original <= 0`.
    pub fn calculate_partial_close(
        &self,
        master_closed: f64,
        master_original: f64,
        slave_current: f64,
        symbol_info: Option<SymbolVolumeInfo>,
    ) -> f64 {
        if master_original <= 0.0 {
            return 0.0;
        }

        let close_ratio = master_closed / master_original;
        let mut close_volume = slave_current * close_ratio;

        if let Some(info) = symbol_info {
            // Spec Open Question 1: raising to volume_min here can close *more* than the
            // proportional math dictates, leaving the slave under-closed relative to master.
            // Preserved intentionally — see DESIGN.md.
            if close_volume < info.volume_min {
                close_volume = info.volume_min;
            }
            if info.volume_step > 0.0 {
                close_volume = (close_volume / info.volume_step).round() * info.volume_step;
            }
        }

        round2(close_volume)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
