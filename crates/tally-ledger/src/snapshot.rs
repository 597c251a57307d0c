//! Bincode persistence of the core network state.
//!
//! A snapshot holds the ledger store and the demurrage coordinator (debt
//! tracker and rate engine). The reserve pool is an external collaborator
//! and persists its own state.

use std::fs;
use std::path::Path;

use tally_core::error::{SnapshotError, TallyError};
use tally_core::ledger::LedgerStore;
use tally_demurrage::DemurrageCoordinator;
use tracing::debug;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialisable copy of a network's core state.
#[derive(Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub ledger: LedgerStore,
    pub coordinator: DemurrageCoordinator,
}

impl LedgerSnapshot {
    pub fn new(ledger: LedgerStore, coordinator: DemurrageCoordinator) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            ledger,
            coordinator,
        }
    }

    /// Check the snapshot is internally consistent.
    ///
    /// Rebuilds the ledger totals from the positions and compares them with
    /// the stored ones, so a tampered or truncated file is rejected.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Inconsistent(format!(
                "unsupported snapshot version {}",
                self.version
            )));
        }
        let rebuilt =
            LedgerStore::from_positions(self.ledger.accounts().map(|(id, pos)| (*id, *pos)))?;
        if rebuilt.total_supply() != self.ledger.total_supply() {
            return Err(SnapshotError::Inconsistent(format!(
                "total supply {} does not match positions ({})",
                self.ledger.total_supply(),
                rebuilt.total_supply()
            )));
        }
        if rebuilt.weighted_supply() != self.ledger.weighted_supply() {
            return Err(SnapshotError::Inconsistent(
                "weighted supply does not match positions".into(),
            ));
        }
        let rate = self.coordinator.conversion_rate();
        if let Some((id, _)) = self.ledger.accounts().find(|(_, p)| p.checkpoint < rate) {
            return Err(SnapshotError::Inconsistent(format!(
                "account {id} checkpoint is below the current rate"
            )));
        }
        Ok(())
    }

    /// Encode with the standard bincode configuration.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Decode and validate.
    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let (snapshot, read): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| SnapshotError::Decode(e.to_string()))?;
        if read != bytes.len() {
            return Err(SnapshotError::Decode(format!(
                "{} trailing bytes",
                bytes.len() - read
            )));
        }
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Write a snapshot to `path`, creating parent directories.
///
/// Writes to a sibling temporary file first and renames it into place.
pub fn save_snapshot(path: &Path, snapshot: &LedgerSnapshot) -> Result<(), TallyError> {
    let bytes = snapshot.encode()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "snapshot saved");
    Ok(())
}

/// Read a snapshot from `path`. `Ok(None)` if the file does not exist.
pub fn load_snapshot(path: &Path) -> Result<Option<LedgerSnapshot>, TallyError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let snapshot = LedgerSnapshot::decode(&bytes)?;
    debug!(path = %path.display(), holders = snapshot.ledger.holder_count(), "snapshot loaded");
    Ok(Some(snapshot))
}
