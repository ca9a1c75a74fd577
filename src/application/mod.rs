pub mod master_monitor;
pub mod slave_executor;
pub mod sync_engine;

pub use master_monitor::MasterMonitor;
pub use slave_executor::{OpenOutcome, SlaveExecutor};
pub use sync_engine::SyncEngine;
