//! # tally-ledger: Credit network composition, config, persistence.
//!
//! Composes the Tally subsystems into a running credit network:
//! - [`network::CreditNetwork`]: ledger store, debt tracker and rate engine
//!   behind one lock, with a per-account reentrancy guard around reserve calls
//! - [`reserve::MemoryReservePool`]: in-memory reserve pool
//! - [`snapshot::LedgerSnapshot`]: bincode persistence of the core state
//! - [`config::LedgerConfig`]: layered configuration

pub mod config;
pub mod network;
pub mod reserve;
pub mod snapshot;

pub use config::LedgerConfig;
pub use network::{CreditNetwork, MintReceipt, NetworkStatus, TransferReceipt};
pub use reserve::MemoryReservePool;
pub use snapshot::LedgerSnapshot;
