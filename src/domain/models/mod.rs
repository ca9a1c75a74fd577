pub mod account;
pub mod config;
pub mod enums;
pub mod mapping;
pub mod operation;
pub mod position;

pub use account::AccountState;
pub use config::{EngineSettings, MasterConfig, SlaveConfig, SlaveConfigUpdate};
pub use enums::{retcode, LotMode, MappingStatus, OperationStatus, OrderType, Side, TradeAction};
pub use mapping::PositionMapping;
pub use operation::{AuditLogEntry, QueuedOperation};
pub use position::{ChangeSet, Modification, PartialClose, PositionSnapshot};
