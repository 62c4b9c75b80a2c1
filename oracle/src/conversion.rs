//! Fixed-point conversion of native amounts into USD-equivalents.

use chrono::{DateTime, Duration, Utc};
use fundme_common::{Usd, Wei};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OracleError, OracleResult};
use crate::feed::{PriceFeed, RoundData};

/// Default maximum age of a usable round (one hour).
pub const DEFAULT_MAX_PRICE_AGE_SECS: i64 = 3_600;

/// Validation policy applied to every round before it is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedGuard {
    /// Maximum age of `updated_at`. `None` disables the staleness check.
    pub max_age: Option<Duration>,
}

impl FeedGuard {
    /// Create a guard with an explicit maximum age.
    pub fn new(max_age: Option<Duration>) -> Self {
        Self { max_age }
    }

    /// Guard that accepts rounds of any age.
    pub fn without_staleness() -> Self {
        Self { max_age: None }
    }

    /// Guard with a maximum age in seconds. `None` when `secs` is outside
    /// the range a `Duration` can hold.
    pub fn with_max_age_secs(secs: i64) -> Option<Self> {
        Duration::try_seconds(secs).map(|age| Self { max_age: Some(age) })
    }

    /// Validate a round as of `now`.
    pub fn check(&self, round: &RoundData, now: DateTime<Utc>) -> OracleResult<()> {
        if round.answer <= 0 {
            return Err(OracleError::NonPositiveAnswer {
                round_id: round.round_id,
                answer: round.answer,
            });
        }

        if round.answered_in_round < round.round_id || round.updated_at.timestamp() == 0 {
            return Err(OracleError::IncompleteRound {
                round_id: round.round_id,
            });
        }

        if let Some(max_age) = self.max_age {
            let age = now.signed_duration_since(round.updated_at);
            if age > max_age {
                return Err(OracleError::StaleRound {
                    round_id: round.round_id,
                    age_secs: age.num_seconds(),
                    max_age_secs: max_age.num_seconds(),
                });
            }
        }

        Ok(())
    }
}

impl Default for FeedGuard {
    fn default() -> Self {
        Self {
            max_age: Duration::try_seconds(DEFAULT_MAX_PRICE_AGE_SECS),
        }
    }
}

/// A priced amount together with the round it was priced against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Native amount that was priced.
    pub amount: Wei,
    /// USD-equivalent of `amount`.
    pub usd_value: Usd,
    /// Round used.
    pub round_id: u64,
    /// Raw feed answer.
    pub answer: i128,
    /// Feed decimals.
    pub decimals: u8,
}

/// Converts native amounts into USD-equivalents through a `PriceFeed`.
///
/// `usd = amount * answer / 10^decimals`, rounded toward zero. Both `amount`
/// and the result carry 18 decimals, so the feed's scale cancels out and no
/// intermediate 36-decimal product is needed.
pub struct PriceConverter;

impl PriceConverter {
    /// Price of one whole native unit in USD.
    pub fn get_price(
        feed: &dyn PriceFeed,
        guard: &FeedGuard,
        now: DateTime<Utc>,
    ) -> OracleResult<Usd> {
        Self::quote(Wei::new(fundme_common::ONE), feed, guard, now).map(|q| q.usd_value)
    }

    /// USD-equivalent of `amount`.
    pub fn get_conversion_rate(
        amount: Wei,
        feed: &dyn PriceFeed,
        guard: &FeedGuard,
        now: DateTime<Utc>,
    ) -> OracleResult<Usd> {
        Self::quote(amount, feed, guard, now).map(|q| q.usd_value)
    }

    /// Price `amount` against the latest validated round.
    pub fn quote(
        amount: Wei,
        feed: &dyn PriceFeed,
        guard: &FeedGuard,
        now: DateTime<Utc>,
    ) -> OracleResult<Quote> {
        let round = feed.latest_round_data()?;
        guard.check(&round, now)?;

        let decimals = feed.decimals();
        let usd_value = convert(amount, round.answer, decimals)?;

        debug!(
            amount = %amount,
            usd_value = %usd_value,
            round_id = round.round_id,
            "Priced amount"
        );

        Ok(Quote {
            amount,
            usd_value,
            round_id: round.round_id,
            answer: round.answer,
            decimals,
        })
    }
}

/// `amount * answer / 10^decimals` with checked arithmetic.
///
/// Both the answer and the amount are split at the feed scale, so no
/// product exceeds `amount * whole` or `scale * scale`.
fn convert(amount: Wei, answer: i128, decimals: u8) -> OracleResult<Usd> {
    let price = u128::try_from(answer).map_err(|_| OracleError::NonPositiveAnswer {
        round_id: 0,
        answer,
    })?;
    let scale = 10u128
        .checked_pow(u32::from(decimals))
        .ok_or(OracleError::Overflow)?;

    let whole = price / scale;
    let fraction = price % scale;

    let whole_part = amount.value().checked_mul(whole).ok_or(OracleError::Overflow)?;
    let fraction_high = (amount.value() / scale)
        .checked_mul(fraction)
        .ok_or(OracleError::Overflow)?;
    let fraction_low = (amount.value() % scale)
        .checked_mul(fraction)
        .ok_or(OracleError::Overflow)?
        / scale;

    whole_part
        .checked_add(fraction_high)
        .and_then(|v| v.checked_add(fraction_low))
        .map(Usd::new)
        .ok_or(OracleError::Overflow)
}
