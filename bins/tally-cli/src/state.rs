//! On-disk state for the CLI: the network snapshot, the reserve pool and
//! the labels accounts were created under.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tally_core::types::AccountId;
use tally_demurrage::SupplyBasis;
use tally_ledger::reserve::ReserveState;
use tally_ledger::{CreditNetwork, LedgerSnapshot, MemoryReservePool};

#[derive(Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct CliState {
    pub snapshot: LedgerSnapshot,
    pub reserve: ReserveState,
    pub labels: BTreeMap<AccountId, String>,
}

/// A live network rebuilt from [`CliState`].
pub struct Session {
    pub network: CreditNetwork,
    pub reserve: Arc<MemoryReservePool>,
    pub labels: BTreeMap<AccountId, String>,
}

impl Session {
    /// A fresh, empty network.
    pub fn fresh(basis: SupplyBasis, reserve_funds: u64) -> Self {
        let reserve = Arc::new(MemoryReservePool::with_funds(reserve_funds));
        Self {
            network: CreditNetwork::with_basis(basis, reserve.clone()),
            reserve,
            labels: BTreeMap::new(),
        }
    }

    pub fn from_state(state: CliState) -> Result<Self> {
        let reserve = Arc::new(MemoryReservePool::from_state(state.reserve));
        let network = CreditNetwork::from_snapshot(state.snapshot, reserve.clone())
            .context("state file is inconsistent")?;
        Ok(Self {
            network,
            reserve,
            labels: state.labels,
        })
    }

    pub fn to_state(&self) -> CliState {
        CliState {
            snapshot: self.network.snapshot(),
            reserve: self.reserve.state(),
            labels: self.labels.clone(),
        }
    }

    /// Resolve an account argument: `0x`-prefixed hex, or a label.
    pub fn account(&mut self, arg: &str) -> Result<AccountId> {
        if arg.starts_with("0x") {
            return arg
                .parse()
                .with_context(|| format!("invalid account id: {arg}"));
        }
        let id = AccountId::from_label(arg);
        self.labels.entry(id).or_insert_with(|| arg.to_string());
        Ok(id)
    }

    /// Display name for an account.
    pub fn name(&self, id: &AccountId) -> String {
        match self.labels.get(id) {
            Some(label) => format!("{label} ({id})"),
            None => id.to_string(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| {
            format!(
                "failed to read state file {} (run `tally-cli init` first)",
                path.display()
            )
        })?;
        let (state, read): (CliState, usize) =
            bincode::decode_from_slice(&bytes, bincode::config::standard())
                .context("failed to decode state file")?;
        if read != bytes.len() {
            bail!(
                "state file {} has {} trailing bytes",
                path.display(),
                bytes.len() - read
            );
        }
        Self::from_state(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = bincode::encode_to_vec(self.to_state(), bincode::config::standard())
            .context("failed to encode state")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }
}
