//! In-memory chain executing calls against a deployed FundMe.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use fundme_common::{Address, TxId, Usd, Wei};
use fundme_ledger::{CallContext, FundMe, TransferError, ValueTransfer};
use fundme_oracle::{MockV3Aggregator, PriceFeed};

use crate::accounts::{contract_address, DevAccounts};
use crate::config::{answer_from_usd, ChainConfig};
use crate::error::{ChainError, ChainResult};

/// Addresses fixed when the fixture was deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub fund_me: Address,
    pub price_feed: Address,
    pub deployer: Address,
}

/// Entry point a transaction invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Fund,
    Receive,
    Fallback,
    Withdraw,
}

/// Result of a transaction that executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_id: TxId,
    pub kind: TxKind,
    pub from: Address,
    pub to: Address,
    pub value: Wei,
    pub block_number: u64,
    pub block_time: DateTime<Utc>,
    /// USD-equivalent of an accepted contribution.
    pub usd_value: Option<Usd>,
    /// Amount paid out by a withdrawal.
    pub withdrawn: Option<Wei>,
}

/// Pays withdrawals into chain accounts.
struct AccountsTransfer<'a> {
    balances: &'a mut HashMap<Address, Wei>,
    rejects_value: &'a HashSet<Address>,
}

impl ValueTransfer for AccountsTransfer<'_> {
    fn transfer(&mut self, to: &Address, amount: Wei) -> Result<(), TransferError> {
        if self.rejects_value.contains(to) {
            return Err(TransferError::Rejected(*to));
        }

        let balance = self
            .balances
            .get_mut(to)
            .ok_or(TransferError::UnknownRecipient(*to))?;
        *balance = balance
            .checked_add(amount)
            .map_err(|_| TransferError::BalanceOverflow(*to))?;
        Ok(())
    }
}

/// Development chain with a mock ETH/USD feed and one FundMe deployed.
///
/// Transactions execute one at a time. Attached value leaves the sender
/// before the contract runs and comes back if the contract errors, so a
/// reverted call leaves no trace besides the error.
pub struct DevChain {
    accounts: DevAccounts,
    balances: HashMap<Address, Wei>,
    rejects_value: HashSet<Address>,
    feed: Arc<MockV3Aggregator>,
    fund_me: FundMe,
    deployment: Deployment,
    block_number: u64,
    now: DateTime<Utc>,
    receipts: Vec<Receipt>,
}

impl DevChain {
    /// Chain with `accounts` development accounts and default fixture.
    pub fn with_fixture(accounts: usize) -> Self {
        Self::with_config(ChainConfig {
            accounts,
            ..ChainConfig::default()
        })
    }

    /// Generate accounts and deploy the feed and the ledger.
    pub fn with_config(config: ChainConfig) -> Self {
        let now = Utc::now();
        let accounts = DevAccounts::generate(config.accounts, &config.seed, config.initial_balance);
        let deployer = accounts.deployer().address;

        let balances = accounts
            .iter()
            .map(|a| (a.address, accounts.initial_balance()))
            .collect();

        let feed = Arc::new(MockV3Aggregator::new_at(
            config.feed_decimals,
            config.initial_answer,
            now,
        ));
        let deployment = Deployment {
            fund_me: contract_address(&deployer, 1),
            price_feed: contract_address(&deployer, 0),
            deployer,
        };
        let fund_me = FundMe::new(
            deployer,
            deployment.price_feed,
            feed.clone(),
            config.ledger,
        );

        info!(
            accounts = accounts.len(),
            fund_me = %deployment.fund_me,
            price_feed = %deployment.price_feed,
            deployer = %deployer,
            "Development chain ready"
        );

        Self {
            accounts,
            balances,
            rejects_value: HashSet::new(),
            feed,
            fund_me,
            deployment,
            block_number: 0,
            now,
            receipts: Vec::new(),
        }
    }

    /// Call `fund` with `value` attached.
    pub fn fund(&mut self, from: &Address, value: Wei) -> ChainResult<Receipt> {
        self.execute(from, TxKind::Fund, value, &[])
    }

    /// Send plain value to the contract.
    pub fn send(&mut self, from: &Address, value: Wei) -> ChainResult<Receipt> {
        self.execute(from, TxKind::Receive, value, &[])
    }

    /// Send value with call data. Empty data takes the receive path.
    pub fn call(&mut self, from: &Address, value: Wei, data: &[u8]) -> ChainResult<Receipt> {
        let kind = if data.is_empty() {
            TxKind::Receive
        } else {
            TxKind::Fallback
        };
        self.execute(from, kind, value, data)
    }

    /// Call `withdraw`.
    pub fn withdraw(&mut self, from: &Address) -> ChainResult<Receipt> {
        self.execute(from, TxKind::Withdraw, Wei::ZERO, &[])
    }

    fn execute(
        &mut self,
        from: &Address,
        kind: TxKind,
        value: Wei,
        data: &[u8],
    ) -> ChainResult<Receipt> {
        let balance = *self
            .balances
            .get(from)
            .ok_or(ChainError::UnknownAccount(*from))?;
        let remaining = balance
            .checked_sub(value)
            .map_err(|_| ChainError::InsufficientBalance {
                account: *from,
                balance,
                required: value,
            })?;

        self.balances.insert(*from, remaining);
        self.block_number += 1;
        let ctx = CallContext::new(*from, value, self.now);

        let result = match kind {
            TxKind::Fund => self.fund_me.fund(&ctx).map(|q| (Some(q.usd_value), None)),
            TxKind::Receive => self.fund_me.receive(&ctx).map(|q| (Some(q.usd_value), None)),
            TxKind::Fallback => self
                .fund_me
                .fallback(&ctx, data)
                .map(|q| (Some(q.usd_value), None)),
            TxKind::Withdraw => {
                let mut transfer = AccountsTransfer {
                    balances: &mut self.balances,
                    rejects_value: &self.rejects_value,
                };
                self.fund_me
                    .withdraw(&ctx, &mut transfer)
                    .map(|amount| (None, Some(amount)))
            }
        };

        let (usd_value, withdrawn) = match result {
            Ok(outcome) => outcome,
            Err(error) => {
                // A failed call never credited anyone
                self.balances.insert(*from, balance);
                warn!(
                    tx_id = %ctx.tx_id,
                    from = %from,
                    kind = ?kind,
                    code = error.error_code(),
                    "Transaction reverted"
                );
                return Err(ChainError::Reverted {
                    tx_id: ctx.tx_id,
                    error,
                });
            }
        };

        let receipt = Receipt {
            tx_id: ctx.tx_id,
            kind,
            from: *from,
            to: self.deployment.fund_me,
            value,
            block_number: self.block_number,
            block_time: self.now,
            usd_value,
            withdrawn,
        };
        debug!(tx_id = %receipt.tx_id, block = receipt.block_number, kind = ?kind, "Transaction executed");
        self.receipts.push(receipt.clone());

        Ok(receipt)
    }

    /// Native balance of `address`. The ledger's address reports what the
    /// ledger holds.
    pub fn balance_of(&self, address: &Address) -> Wei {
        if *address == self.deployment.fund_me {
            return self.fund_me.balance();
        }
        self.balances.get(address).copied().unwrap_or(Wei::ZERO)
    }

    /// Sum of every account balance plus the ledger's balance.
    pub fn total_native_supply(&self) -> u128 {
        self.balances.values().map(|b| b.value()).sum::<u128>() + self.fund_me.balance().value()
    }

    /// Make `address` refuse incoming value.
    pub fn set_rejects_value(&mut self, address: Address, rejects: bool) {
        if rejects {
            self.rejects_value.insert(address);
        } else {
            self.rejects_value.remove(&address);
        }
    }

    /// Publish a raw feed answer stamped at the current block time.
    pub fn set_price_answer(&self, answer: i128) {
        self.feed.update_answer_at(answer, self.now);
    }

    /// Publish a USD price, converted to the feed's decimals.
    pub fn set_eth_usd(&self, price: Usd) -> ChainResult<()> {
        let answer =
            answer_from_usd(price, self.feed.decimals()).ok_or(ChainError::InvalidPrice(price))?;
        self.set_price_answer(answer);
        info!(price = %price, answer, "ETH/USD price updated");
        Ok(())
    }

    /// Move the block clock forward.
    pub fn advance_time(&mut self, seconds: i64) -> ChainResult<()> {
        self.now = Duration::try_seconds(seconds)
            .and_then(|by| self.now.checked_add_signed(by))
            .ok_or(ChainError::ClockOverflow { seconds })?;
        debug!(now = %self.now, "Block time advanced");
        Ok(())
    }

    /// Current block time.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Number of the last executed block.
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// The deployed ledger, for reads.
    pub fn fund_me(&self) -> &FundMe {
        &self.fund_me
    }

    /// The deployed mock feed.
    pub fn price_feed(&self) -> &Arc<MockV3Aggregator> {
        &self.feed
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn accounts(&self) -> &DevAccounts {
        &self.accounts
    }

    /// Receipts of executed transactions in order.
    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }
}

impl Default for DevChain {
    fn default() -> Self {
        Self::with_config(ChainConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundme_ledger::FundMeError;
    use fundme_oracle::OracleError;

    fn setup() -> (DevChain, Address, Address) {
        let chain = DevChain::with_fixture(10);
        let deployer = chain.accounts().deployer().address;
        let user = chain.accounts().get(1).unwrap().address;
        (chain, deployer, user)
    }

    fn send_value() -> Wei {
        Wei::from_ether(1)
    }

    #[test]
    fn test_constructor_sets_price_feed_address() {
        let (chain, deployer, _) = setup();

        assert_eq!(chain.fund_me().price_feed(), chain.deployment().price_feed);
        assert_eq!(chain.fund_me().owner(), deployer);
        assert_eq!(chain.deployment().deployer, deployer);
        assert_ne!(chain.deployment().fund_me, chain.deployment().price_feed);
    }

    #[test]
    fn test_fund_fails_without_enough_eth() {
        let (mut chain, deployer, _) = setup();
        let before = chain.balance_of(&deployer);

        let err = chain.fund(&deployer, Wei::ZERO).unwrap_err();
        assert!(matches!(
            err.revert_reason(),
            Some(FundMeError::InsufficientContribution { .. })
        ));
        assert_eq!(chain.balance_of(&deployer), before);
    }

    #[test]
    fn test_fund_updates_amount_funded() {
        let (mut chain, deployer, _) = setup();

        let receipt = chain.fund(&deployer, send_value()).unwrap();

        assert_eq!(receipt.usd_value, Some(Usd::from_dollars(2000)));
        assert_eq!(receipt.block_number, 1);
        assert_eq!(
            chain.fund_me().address_to_amount_funded(&deployer),
            send_value()
        );
        assert_eq!(chain.balance_of(&chain.deployment().fund_me), send_value());
    }

    #[test]
    fn test_fund_adds_funder_to_array() {
        let (mut chain, deployer, _) = setup();

        chain.fund(&deployer, send_value()).unwrap();
        assert_eq!(chain.fund_me().funder(0).unwrap(), deployer);
    }

    #[test]
    fn test_withdraw_with_a_single_funder() {
        let (mut chain, deployer, _) = setup();
        chain.fund(&deployer, send_value()).unwrap();

        let starting_contract = chain.balance_of(&chain.deployment().fund_me);
        let starting_deployer = chain.balance_of(&deployer);

        let receipt = chain.withdraw(&deployer).unwrap();

        assert_eq!(receipt.withdrawn, Some(starting_contract));
        assert_eq!(chain.balance_of(&chain.deployment().fund_me), Wei::ZERO);
        assert_eq!(
            chain.balance_of(&deployer),
            starting_deployer.checked_add(starting_contract).unwrap()
        );
    }

    #[test]
    fn test_withdraw_with_multiple_funders() {
        let (mut chain, deployer, _) = setup();
        let funders: Vec<Address> = chain.accounts().iter().skip(1).take(5).map(|a| a.address).collect();

        for funder in &funders {
            chain.fund(funder, send_value()).unwrap();
        }

        let starting_deployer = chain.balance_of(&deployer);
        chain.withdraw(&deployer).unwrap();

        assert_eq!(chain.balance_of(&chain.deployment().fund_me), Wei::ZERO);
        assert_eq!(
            chain.balance_of(&deployer),
            starting_deployer.checked_add(Wei::from_ether(5)).unwrap()
        );
        assert!(matches!(
            chain.fund_me().funder(0),
            Err(FundMeError::IndexOutOfRange { .. })
        ));
        for funder in &funders {
            assert_eq!(chain.fund_me().address_to_amount_funded(funder), Wei::ZERO);
        }
    }

    #[test]
    fn test_only_owner_can_withdraw() {
        let (mut chain, deployer, attacker) = setup();
        chain.fund(&deployer, send_value()).unwrap();

        let err = chain.withdraw(&attacker).unwrap_err();

        assert_eq!(
            err.revert_reason(),
            Some(&FundMeError::Unauthorized { caller: attacker })
        );
        assert_eq!(err.error_code(), "UNAUTHORIZED");
        assert_eq!(chain.balance_of(&chain.deployment().fund_me), send_value());
    }

    #[test]
    fn test_rejecting_owner_keeps_ledger_intact() {
        let (mut chain, deployer, user) = setup();
        chain.fund(&user, send_value()).unwrap();
        chain.set_rejects_value(deployer, true);
        let starting_deployer = chain.balance_of(&deployer);

        let err = chain.withdraw(&deployer).unwrap_err();

        assert!(matches!(
            err.revert_reason(),
            Some(FundMeError::TransferFailed { .. })
        ));
        assert_eq!(chain.balance_of(&deployer), starting_deployer);
        assert_eq!(chain.balance_of(&chain.deployment().fund_me), send_value());
        assert_eq!(chain.fund_me().funder(0).unwrap(), user);

        chain.set_rejects_value(deployer, false);
        assert!(chain.withdraw(&deployer).is_ok());
        assert_eq!(chain.balance_of(&chain.deployment().fund_me), Wei::ZERO);
    }

    #[test]
    fn test_plain_send_and_call_data_fund() {
        let (mut chain, _, user) = setup();

        let receipt = chain.send(&user, send_value()).unwrap();
        assert_eq!(receipt.kind, TxKind::Receive);

        let receipt = chain.call(&user, send_value(), &[0x12, 0x34]).unwrap();
        assert_eq!(receipt.kind, TxKind::Fallback);

        let receipt = chain.call(&user, send_value(), &[]).unwrap();
        assert_eq!(receipt.kind, TxKind::Receive);

        assert_eq!(
            chain.fund_me().address_to_amount_funded(&user),
            Wei::from_ether(3)
        );
        assert_eq!(chain.fund_me().funders_len(), 3);
    }

    #[test]
    fn test_small_send_reverts_and_refunds() {
        let (mut chain, _, user) = setup();
        let before = chain.balance_of(&user);

        assert!(chain.send(&user, Wei::new(1)).is_err());
        assert!(chain.call(&user, Wei::new(1), &[0xff]).is_err());

        assert_eq!(chain.balance_of(&user), before);
        assert_eq!(chain.fund_me().funders_len(), 0);
        assert!(chain.receipts().is_empty());
    }

    #[test]
    fn test_stale_price_rejects_funding() {
        let (mut chain, _, user) = setup();
        chain.advance_time(2 * 3600).unwrap();

        let err = chain.fund(&user, send_value()).unwrap_err();
        assert!(matches!(
            err.revert_reason(),
            Some(FundMeError::Oracle(OracleError::StaleRound { .. }))
        ));

        chain.set_eth_usd(Usd::from_dollars(2500)).unwrap();
        let receipt = chain.fund(&user, send_value()).unwrap();
        assert_eq!(receipt.usd_value, Some(Usd::from_dollars(2500)));
    }

    #[test]
    fn test_advance_time_out_of_range() {
        let (mut chain, _, _) = setup();
        let before = chain.now();

        assert_eq!(
            chain.advance_time(i64::MAX),
            Err(ChainError::ClockOverflow { seconds: i64::MAX })
        );
        // In range for a Duration but past the last representable date
        assert!(chain.advance_time(i64::MAX / 1000).is_err());
        assert_eq!(chain.now(), before);

        chain.advance_time(60).unwrap();
        assert_eq!(chain.now(), before + Duration::seconds(60));
    }

    #[test]
    fn test_price_drop_rejects_funding() {
        let (mut chain, _, user) = setup();
        chain.set_eth_usd(Usd::from_dollars(10)).unwrap();

        let err = chain.fund(&user, send_value()).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_CONTRIBUTION");
    }

    #[test]
    fn test_insufficient_balance() {
        let (mut chain, _, user) = setup();

        let err = chain.fund(&user, Wei::from_ether(20_000)).unwrap_err();
        assert!(matches!(err, ChainError::InsufficientBalance { account, .. } if account == user));
        assert_eq!(chain.block_number(), 0);
    }

    #[test]
    fn test_default_chain_prefunds_accounts() {
        let chain = DevChain::default();

        assert_eq!(chain.accounts().len(), 10);
        assert_eq!(chain.accounts().initial_balance(), Wei::from_ether(10_000));
        for account in chain.accounts().iter() {
            assert_eq!(chain.balance_of(&account.address), Wei::from_ether(10_000));
        }
        assert_eq!(chain.balance_of(&chain.deployment().fund_me), Wei::ZERO);
    }

    #[test]
    fn test_unknown_account() {
        let (mut chain, _, _) = setup();
        let stranger = Address::new([0x77; 20]);

        assert_eq!(
            chain.fund(&stranger, send_value()).unwrap_err(),
            ChainError::UnknownAccount(stranger)
        );
    }

    #[test]
    fn test_native_supply_is_conserved() {
        let (mut chain, deployer, user) = setup();
        let supply = chain.total_native_supply();

        chain.fund(&user, send_value()).unwrap();
        let _ = chain.fund(&user, Wei::new(5));
        let _ = chain.withdraw(&user);
        assert_eq!(chain.total_native_supply(), supply);

        chain.withdraw(&deployer).unwrap();
        assert_eq!(chain.total_native_supply(), supply);
    }

    #[test]
    fn test_receipt_serializes() {
        let (mut chain, _, user) = setup();
        let receipt = chain.fund(&user, send_value()).unwrap();

        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["kind"], "fund");
        assert_eq!(json["from"], user.to_string());
    }
}
