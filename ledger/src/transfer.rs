//! Outbound value transfer seam.

use fundme_common::{Address, Wei};
use thiserror::Error;

/// Why an outbound transfer did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Recipient refused the value.
    #[error("recipient {0} rejected the transfer")]
    Rejected(Address),

    /// Recipient is not known to the host.
    #[error("unknown recipient {0}")]
    UnknownRecipient(Address),

    /// Crediting the recipient would overflow its balance.
    #[error("recipient {0} balance overflow")]
    BalanceOverflow(Address),
}

/// Pays native value out of the ledger on behalf of the host environment.
///
/// The ledger calls this only after its own bookkeeping is final, and
/// restores that bookkeeping if the transfer fails.
pub trait ValueTransfer {
    /// Move `amount` to `to`.
    fn transfer(&mut self, to: &Address, amount: Wei) -> Result<(), TransferError>;
}

impl<F> ValueTransfer for F
where
    F: FnMut(&Address, Wei) -> Result<(), TransferError>,
{
    fn transfer(&mut self, to: &Address, amount: Wei) -> Result<(), TransferError> {
        self(to, amount)
    }
}
