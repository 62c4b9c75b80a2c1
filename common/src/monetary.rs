//! Fixed-point monetary types for FundMe.
//!
//! Both native amounts and USD-equivalents carry 18 decimals and are stored
//! as unsigned integers in their smallest unit. `rust_decimal` is only used
//! at the edges, to parse and render human-readable values.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CommonError;

/// Decimal places of both native amounts and USD-equivalents.
pub const DECIMALS: u32 = 18;

/// One whole unit (1 ETH, or $1) in smallest units.
pub const ONE: u128 = 1_000_000_000_000_000_000;

/// Parse a non-negative decimal string into an 18-decimal integer.
fn parse_units(s: &str) -> Result<u128, CommonError> {
    let value: Decimal = s
        .trim()
        .parse()
        .map_err(|_| CommonError::InvalidAmount(s.to_string()))?;
    let value = value.normalize();

    if value.is_sign_negative() && !value.is_zero() {
        return Err(CommonError::InvalidAmount(s.to_string()));
    }
    if value.scale() > DECIMALS {
        return Err(CommonError::InvalidAmount(s.to_string()));
    }

    let mantissa = u128::try_from(value.mantissa().abs())
        .map_err(|_| CommonError::InvalidAmount(s.to_string()))?;
    mantissa
        .checked_mul(10u128.pow(DECIMALS - value.scale()))
        .ok_or(CommonError::Overflow {
            operation: "parse_units",
        })
}

/// Render an 18-decimal integer as a `Decimal`.
fn units_to_decimal(units: u128) -> Result<Decimal, CommonError> {
    let signed = i128::try_from(units).map_err(|_| CommonError::Overflow {
        operation: "units_to_decimal",
    })?;
    Decimal::try_from_i128_with_scale(signed, DECIMALS)
        .map(|d| d.normalize())
        .map_err(|_| CommonError::Overflow {
            operation: "units_to_decimal",
        })
}

/// A native-currency amount in wei (10^-18 ETH).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Wei(u128);

impl Wei {
    /// Zero wei.
    pub const ZERO: Wei = Wei(0);

    /// Create from a raw wei value.
    pub const fn new(wei: u128) -> Self {
        Self(wei)
    }

    /// Create from whole ether.
    pub const fn from_ether(ether: u64) -> Self {
        Self(ether as u128 * ONE)
    }

    /// Parse a decimal ether string such as `"0.025"`.
    pub fn parse_ether(s: &str) -> Result<Self, CommonError> {
        parse_units(s).map(Self)
    }

    /// Get the raw wei value.
    pub const fn value(&self) -> u128 {
        self.0
    }

    /// Check if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Wei) -> Result<Wei, CommonError> {
        self.0
            .checked_add(other.0)
            .map(Wei)
            .ok_or(CommonError::Overflow {
                operation: "wei addition",
            })
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Wei) -> Result<Wei, CommonError> {
        self.0
            .checked_sub(other.0)
            .map(Wei)
            .ok_or(CommonError::Underflow {
                operation: "wei subtraction",
            })
    }

    /// Value in ether as a decimal.
    pub fn to_ether(&self) -> Result<Decimal, CommonError> {
        units_to_decimal(self.0)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_ether() {
            Ok(ether) => write!(f, "{} ETH", ether),
            Err(_) => write!(f, "{} wei", self.0),
        }
    }
}

impl From<u128> for Wei {
    fn from(wei: u128) -> Self {
        Self(wei)
    }
}

/// A USD-equivalent value with 18 decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Usd(u128);

impl Usd {
    /// Zero dollars.
    pub const ZERO: Usd = Usd(0);

    /// Create from a raw 18-decimal value.
    pub const fn new(units: u128) -> Self {
        Self(units)
    }

    /// Create from whole dollars.
    pub const fn from_dollars(dollars: u64) -> Self {
        Self(dollars as u128 * ONE)
    }

    /// Parse a decimal dollar string such as `"49.99"`.
    pub fn parse(s: &str) -> Result<Self, CommonError> {
        parse_units(s.trim_start_matches('$')).map(Self)
    }

    /// Get the raw 18-decimal value.
    pub const fn value(&self) -> u128 {
        self.0
    }

    /// Value in dollars as a decimal.
    pub fn to_decimal(&self) -> Result<Decimal, CommonError> {
        units_to_decimal(self.0)
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal() {
            // Truncate cents
            Ok(dollars) => write!(
                f,
                "${:.2}",
                dollars.round_dp_with_strategy(2, RoundingStrategy::ToZero)
            ),
            Err(_) => write!(f, "{} usd-units", self.0),
        }
    }
}
