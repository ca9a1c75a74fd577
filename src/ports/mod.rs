pub mod rpc;
pub mod store;

pub use rpc::{AccountInfo, OrderRequest, OrderResult, RpcClient, RpcError, SymbolInfo, SymbolTick};
pub use store::{MappingStore, StoreError};
