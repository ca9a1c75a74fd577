pub mod change_detector;
pub mod lot_calculator;
pub mod retry;
pub mod sltp;

pub use change_detector::ChangeDetector;
pub use lot_calculator::{LotCalculator, SymbolVolumeInfo};
pub use retry::{execute_with_retry, AttemptOutcome, RetryPolicy, RetryResult};
pub use sltp::{distance_preserve, SlTp};
