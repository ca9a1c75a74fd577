//! RPC client adapters implementing `ports::rpc::RpcClient` (§6). The wire protocol to a running
//! MT5 bridge process is mechanical plumbing per spec §1/§6 — `StubRpcClient` models the connection
//! lifecycle only. `TestRpcClient` is the deterministic in-memory double used by unit/scenario
//! tests, mirroring the teacher's capability-interface + concrete-adapter split (`ports/adapters.rs`).

mod stub;
mod test_double;

pub use stub::StubRpcClient;
pub use test_double::TestRpcClient;
