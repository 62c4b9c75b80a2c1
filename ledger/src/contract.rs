//! Core ledger implementation.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use fundme_common::{Address, TxId, Usd, Wei};
use fundme_oracle::{FeedGuard, PriceConverter, PriceFeed, Quote};

use crate::config::FundMeConfig;
use crate::error::{FundMeError, FundMeResult};
use crate::events::{EventKind, EventLog, LedgerEvent};
use crate::transfer::ValueTransfer;

/// Caller-supplied facts about one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Account that sent the call.
    pub caller: Address,
    /// Native value attached to the call.
    pub value: Wei,
    /// Transaction the call belongs to.
    pub tx_id: TxId,
    /// Time of the block executing the call.
    pub block_time: DateTime<Utc>,
}

impl CallContext {
    /// Create a context with a fresh transaction id.
    pub fn new(caller: Address, value: Wei, block_time: DateTime<Utc>) -> Self {
        Self {
            caller,
            value,
            tx_id: TxId::new(),
            block_time,
        }
    }

    /// Context for a call without attached value, stamped now.
    pub fn call(caller: Address) -> Self {
        Self::new(caller, Wei::ZERO, Utc::now())
    }

    /// Context for a call with attached value, stamped now.
    pub fn payable(caller: Address, value: Wei) -> Self {
        Self::new(caller, value, Utc::now())
    }
}

/// Ledger state cleared by a withdrawal, kept aside until the payout lands.
struct Checkpoint {
    amounts: HashMap<Address, Wei>,
    funders: Vec<Address>,
    balance: Wei,
}

/// Crowdfunding ledger.
///
/// Accepts contributions worth at least the configured USD minimum, keeps a
/// per-contributor total and an ordered contributor list, and lets the owner
/// withdraw everything held. Every mutator takes `&mut self`, so calls are
/// serialized by construction; each one either applies fully or not at all.
pub struct FundMe {
    owner: Address,
    price_feed_address: Address,
    price_feed: Arc<dyn PriceFeed>,
    config: FundMeConfig,
    guard: FeedGuard,
    address_to_amount_funded: HashMap<Address, Wei>,
    funders: Vec<Address>,
    balance: Wei,
    events: EventLog,
}

impl FundMe {
    /// Create a ledger owned by `owner`, priced through the feed deployed at
    /// `price_feed_address`.
    pub fn new(
        owner: Address,
        price_feed_address: Address,
        price_feed: Arc<dyn PriceFeed>,
        config: FundMeConfig,
    ) -> Self {
        info!(
            owner = %owner,
            price_feed = %price_feed_address,
            minimum_usd = %config.minimum_usd,
            "FundMe created"
        );

        let guard = config.feed_guard();
        Self {
            owner,
            price_feed_address,
            price_feed,
            config,
            guard,
            address_to_amount_funded: HashMap::new(),
            funders: Vec::new(),
            balance: Wei::ZERO,
            events: EventLog::new(),
        }
    }

    /// Accept a contribution.
    ///
    /// Prices the attached value, rejects it below the minimum, then credits
    /// the caller and appends them to the contributor list.
    #[instrument(skip(self, ctx), fields(caller = %ctx.caller, value = %ctx.value))]
    pub fn fund(&mut self, ctx: &CallContext) -> FundMeResult<Quote> {
        let quote = PriceConverter::quote(
            ctx.value,
            self.price_feed.as_ref(),
            &self.guard,
            ctx.block_time,
        )?;

        if quote.usd_value < self.config.minimum_usd {
            debug!(usd_value = %quote.usd_value, "Contribution below minimum");
            return Err(FundMeError::InsufficientContribution {
                usd_value: quote.usd_value,
                minimum: self.config.minimum_usd,
            });
        }

        let funded = self.address_to_amount_funded(&ctx.caller).checked_add(ctx.value)?;
        let balance = self.balance.checked_add(ctx.value)?;

        self.address_to_amount_funded.insert(ctx.caller, funded);
        self.funders.push(ctx.caller);
        self.balance = balance;
        self.events.push(
            ctx.tx_id,
            EventKind::Funded {
                funder: ctx.caller,
                amount: ctx.value,
                usd_value: quote.usd_value,
                round_id: quote.round_id,
            },
            ctx.block_time,
        );

        info!(
            funder = %ctx.caller,
            amount = %ctx.value,
            usd_value = %quote.usd_value,
            total_funded = %funded,
            "Contribution accepted"
        );

        Ok(quote)
    }

    /// Plain value transfer without call data.
    pub fn receive(&mut self, ctx: &CallContext) -> FundMeResult<Quote> {
        debug!(caller = %ctx.caller, "receive");
        self.fund(ctx)
    }

    /// Call with data that matches no function.
    pub fn fallback(&mut self, ctx: &CallContext, data: &[u8]) -> FundMeResult<Quote> {
        debug!(caller = %ctx.caller, data_len = data.len(), "fallback");
        self.fund(ctx)
    }

    /// Pay the whole held balance to the owner and reset every record.
    ///
    /// Bookkeeping is cleared before `transfer` runs. If the payout fails the
    /// cleared state is put back unchanged.
    #[instrument(skip(self, ctx, transfer), fields(caller = %ctx.caller))]
    pub fn withdraw(
        &mut self,
        ctx: &CallContext,
        transfer: &mut dyn ValueTransfer,
    ) -> FundMeResult<Wei> {
        if ctx.caller != self.owner {
            warn!(caller = %ctx.caller, "Withdraw by non-owner rejected");
            return Err(FundMeError::Unauthorized { caller: ctx.caller });
        }

        if !ctx.value.is_zero() {
            return Err(FundMeError::NonPayable { value: ctx.value });
        }

        let checkpoint = self.clear();
        let amount = checkpoint.balance;

        if let Err(e) = transfer.transfer(&self.owner, amount) {
            warn!(owner = %self.owner, amount = %amount, error = %e, "Payout failed, restoring ledger");
            self.restore(checkpoint);
            return Err(FundMeError::TransferFailed {
                to: self.owner,
                amount,
                reason: e.to_string(),
            });
        }

        let funders_cleared = checkpoint.funders.len();
        self.events.push(
            ctx.tx_id,
            EventKind::Withdrawn {
                owner: self.owner,
                amount,
                funders_cleared,
            },
            ctx.block_time,
        );

        info!(
            owner = %self.owner,
            amount = %amount,
            funders_cleared,
            "Withdrawal complete"
        );

        Ok(amount)
    }

    fn clear(&mut self) -> Checkpoint {
        Checkpoint {
            amounts: mem::take(&mut self.address_to_amount_funded),
            funders: mem::take(&mut self.funders),
            balance: mem::replace(&mut self.balance, Wei::ZERO),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.address_to_amount_funded = checkpoint.amounts;
        self.funders = checkpoint.funders;
        self.balance = checkpoint.balance;
    }

    /// Owner fixed at creation.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Address of the price feed fixed at creation.
    pub fn price_feed(&self) -> Address {
        self.price_feed_address
    }

    /// Version reported by the price feed.
    pub fn price_feed_version(&self) -> u64 {
        self.price_feed.version()
    }

    /// Total contributed by `funder` since the last withdrawal.
    pub fn address_to_amount_funded(&self, funder: &Address) -> Wei {
        self.address_to_amount_funded
            .get(funder)
            .copied()
            .unwrap_or(Wei::ZERO)
    }

    /// Contributor at `index` in contribution order.
    pub fn funder(&self, index: usize) -> FundMeResult<Address> {
        self.funders
            .get(index)
            .copied()
            .ok_or(FundMeError::IndexOutOfRange {
                index,
                len: self.funders.len(),
            })
    }

    /// All contributor list entries.
    pub fn funders(&self) -> &[Address] {
        &self.funders
    }

    /// Number of contributor list entries.
    pub fn funders_len(&self) -> usize {
        self.funders.len()
    }

    /// Minimum USD-equivalent for a contribution.
    pub fn minimum_usd(&self) -> Usd {
        self.config.minimum_usd
    }

    /// Native balance currently held.
    pub fn balance(&self) -> Wei {
        self.balance
    }

    /// Event history.
    pub fn events(&self) -> &[LedgerEvent] {
        self.events.as_slice()
    }

    /// USD-equivalent the ledger would assign to `amount` at `now`.
    pub fn conversion_rate(&self, amount: Wei, now: DateTime<Utc>) -> FundMeResult<Usd> {
        Ok(PriceConverter::get_conversion_rate(
            amount,
            self.price_feed.as_ref(),
            &self.guard,
            now,
        )?)
    }
}
