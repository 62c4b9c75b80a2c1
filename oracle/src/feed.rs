//! Price feed trait and the local mock aggregator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OracleResult;

/// One oracle observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    /// Round identifier.
    pub round_id: u64,
    /// Price, fixed-point with the feed's `decimals()`.
    pub answer: i128,
    /// When the round started.
    pub started_at: DateTime<Utc>,
    /// When the answer was last updated.
    pub updated_at: DateTime<Utc>,
    /// Round in which the answer was computed.
    pub answered_in_round: u64,
}

/// A native-currency to USD exchange rate source.
///
/// Reads are synchronous: the ledger consults the feed inline while it
/// validates a contribution, and a failed read fails the contribution.
pub trait PriceFeed: Send + Sync {
    /// Number of decimals in `answer`.
    fn decimals(&self) -> u8;

    /// Human readable feed description.
    fn description(&self) -> &str;

    /// Feed implementation version.
    fn version(&self) -> u64;

    /// Get the most recent round.
    fn latest_round_data(&self) -> OracleResult<RoundData>;

    /// Get a specific historical round.
    fn get_round_data(&self, round_id: u64) -> OracleResult<RoundData>;
}

#[cfg(any(test, feature = "mock"))]
pub use mock::MockV3Aggregator;

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use chrono::{DateTime, Utc};
    use dashmap::DashMap;
    use parking_lot::RwLock;
    use tracing::debug;

    use super::{PriceFeed, RoundData};
    use crate::error::{OracleError, OracleResult};

    /// Decimals used by the local ETH/USD mock.
    pub const DEFAULT_DECIMALS: u8 = 8;

    /// Initial local ETH/USD answer: $2000 with 8 decimals.
    pub const DEFAULT_INITIAL_ANSWER: i128 = 2_000 * 100_000_000;

    /// In-memory aggregator for local development and tests.
    ///
    /// Every `update_answer` opens a new round, mirroring how a deployed
    /// aggregator exposes its history.
    pub struct MockV3Aggregator {
        decimals: u8,
        rounds: DashMap<u64, RoundData>,
        latest_round: RwLock<u64>,
        halted: RwLock<Option<String>>,
    }

    impl MockV3Aggregator {
        /// Create a mock and publish `initial_answer` as round 1.
        pub fn new(decimals: u8, initial_answer: i128) -> Self {
            Self::new_at(decimals, initial_answer, Utc::now())
        }

        /// Create a mock whose first round is stamped at `at`.
        pub fn new_at(decimals: u8, initial_answer: i128, at: DateTime<Utc>) -> Self {
            let feed = Self {
                decimals,
                rounds: DashMap::new(),
                latest_round: RwLock::new(0),
                halted: RwLock::new(None),
            };
            feed.update_answer_at(initial_answer, at);
            feed
        }

        /// Local ETH/USD defaults: 8 decimals at $2000.
        pub fn eth_usd() -> Self {
            Self::new(DEFAULT_DECIMALS, DEFAULT_INITIAL_ANSWER)
        }

        /// Publish a new answer as the next round, stamped now.
        pub fn update_answer(&self, answer: i128) {
            self.update_answer_at(answer, Utc::now());
        }

        /// Publish a new answer as the next round, stamped at `at`.
        pub fn update_answer_at(&self, answer: i128, at: DateTime<Utc>) {
            let mut latest = self.latest_round.write();
            *latest += 1;
            let round_id = *latest;

            self.rounds.insert(
                round_id,
                RoundData {
                    round_id,
                    answer,
                    started_at: at,
                    updated_at: at,
                    answered_in_round: round_id,
                },
            );
            debug!(round_id, answer, "Mock aggregator answer updated");
        }

        /// Overwrite a round with explicit data and make it the latest.
        pub fn update_round_data(
            &self,
            round_id: u64,
            answer: i128,
            updated_at: DateTime<Utc>,
            started_at: DateTime<Utc>,
        ) {
            self.update_round(RoundData {
                round_id,
                answer,
                started_at,
                updated_at,
                answered_in_round: round_id,
            });
        }

        /// Store a fully specified round and make it the latest.
        pub fn update_round(&self, round: RoundData) {
            let mut latest = self.latest_round.write();
            *latest = round.round_id;
            self.rounds.insert(round.round_id, round);
        }

        /// Make every read fail until `resume` is called.
        pub fn halt(&self, reason: impl Into<String>) {
            *self.halted.write() = Some(reason.into());
        }

        /// Undo `halt`.
        pub fn resume(&self) {
            *self.halted.write() = None;
        }

        /// Latest round id.
        pub fn latest_round(&self) -> u64 {
            *self.latest_round.read()
        }

        fn check_halted(&self) -> OracleResult<()> {
            match self.halted.read().as_ref() {
                Some(reason) => Err(OracleError::Unavailable(reason.clone())),
                None => Ok(()),
            }
        }
    }

    impl PriceFeed for MockV3Aggregator {
        fn decimals(&self) -> u8 {
            self.decimals
        }

        fn description(&self) -> &str {
            "v0.6/tests/MockV3Aggregator.sol"
        }

        fn version(&self) -> u64 {
            0
        }

        fn latest_round_data(&self) -> OracleResult<RoundData> {
            self.check_halted()?;
            let round_id = self.latest_round();
            self.get_round_data(round_id)
        }

        fn get_round_data(&self, round_id: u64) -> OracleResult<RoundData> {
            self.check_halted()?;
            self.rounds
                .get(&round_id)
                .map(|r| r.clone())
                .ok_or(OracleError::RoundNotFound(round_id))
        }
    }
}
