//! Deterministic development accounts.

use fundme_common::{Address, Wei};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Seed used when none is configured.
pub const DEFAULT_SEED: &str = "fundme-devnet";

/// Native balance each development account starts with.
pub const DEFAULT_INITIAL_BALANCE: Wei = Wei::from_ether(10_000);

/// Derive the address of account `index` under `seed`.
pub fn derive_address(seed: &str, index: usize) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update((index as u64).to_be_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    Address::from_digest(&digest)
}

/// Address of the contract deployed by `deployer` with `nonce`.
pub fn contract_address(deployer: &Address, nonce: u64) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(deployer.as_bytes());
    hasher.update(nonce.to_be_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    Address::from_digest(&digest)
}

/// A development account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevAccount {
    /// Position in the account list. Account 0 deploys the contracts.
    pub index: usize,
    /// Account address.
    pub address: Address,
    /// Display name.
    pub label: String,
}

/// The ordered set of funded development accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevAccounts {
    accounts: Vec<DevAccount>,
    initial_balance: Wei,
}

impl DevAccounts {
    /// Derive `count` accounts from `seed`, each starting with `initial_balance`.
    pub fn generate(count: usize, seed: &str, initial_balance: Wei) -> Self {
        let accounts = (0..count.max(1))
            .map(|index| DevAccount {
                index,
                address: derive_address(seed, index),
                label: if index == 0 {
                    "deployer".to_string()
                } else {
                    format!("account{}", index)
                },
            })
            .collect();

        Self {
            accounts,
            initial_balance,
        }
    }

    /// `count` accounts from the default seed and balance.
    pub fn with_defaults(count: usize) -> Self {
        Self::generate(count, DEFAULT_SEED, DEFAULT_INITIAL_BALANCE)
    }

    /// Account 0.
    pub fn deployer(&self) -> &DevAccount {
        &self.accounts[0]
    }

    /// Account at `index`.
    pub fn get(&self, index: usize) -> Option<&DevAccount> {
        self.accounts.get(index)
    }

    /// Account by label.
    pub fn by_label(&self, label: &str) -> Option<&DevAccount> {
        self.accounts.iter().find(|a| a.label == label)
    }

    /// Iterate in index order.
    pub fn iter(&self) -> impl Iterator<Item = &DevAccount> {
        self.accounts.iter()
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Check if there are no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Starting balance of every account.
    pub fn initial_balance(&self) -> Wei {
        self.initial_balance
    }
}
