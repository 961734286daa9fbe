//! Decimal USDC amounts and their 6-decimal base-unit representation.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// USDC uses 6 decimal places on every chain we bridge.
pub const USDC_DECIMALS: u32 = 6;

/// Smallest transfer the bridge accepts, in USDC.
pub const MIN_TRANSFER: Decimal = Decimal::from_parts(1, 0, 0, false, 2); // 0.01

/// A human-scale USDC amount (e.g. "100", "0.25").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Usdc(pub Decimal);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Invalid amount: {input}")]
    Unparseable { input: String },
    #[error("Amount cannot be negative: {amount}")]
    Negative { amount: Decimal },
    #[error("Amount overflows 6-decimal base units: {amount}")]
    Overflow { amount: Decimal },
    #[error("Base-unit value {units} exceeds the representable USDC range")]
    BaseUnitsOverflow { units: U256 },
}

impl FromStr for Usdc {
    type Err = AmountError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(input)
            .map(Self)
            .map_err(|_| AmountError::Unparseable {
                input: input.to_string(),
            })
    }
}

impl Display for Usdc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Usdc {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Converts to base units (micro-USDC), truncating any precision below
    /// the sixth decimal place the way the token contract would.
    pub fn to_base_units(self) -> Result<U256, AmountError> {
        if self.0.is_sign_negative() {
            return Err(AmountError::Negative { amount: self.0 });
        }

        let scale = Decimal::from(10u64.pow(USDC_DECIMALS));
        let scaled = self
            .0
            .checked_mul(scale)
            .ok_or(AmountError::Overflow { amount: self.0 })?
            .trunc();
        let units = scaled
            .to_u128()
            .ok_or(AmountError::Overflow { amount: self.0 })?;

        Ok(U256::from(units))
    }

    /// Reconstructs a decimal amount from base units, for display.
    pub fn from_base_units(units: U256) -> Result<Self, AmountError> {
        let raw: i128 = units
            .try_into()
            .map_err(|_| AmountError::BaseUnitsOverflow { units })?;
        let decimal = Decimal::try_from_i128_with_scale(raw, USDC_DECIMALS)
            .map_err(|_| AmountError::BaseUnitsOverflow { units })?;

        Ok(Self(decimal))
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Whether the amount meets the 0.01 USDC transfer floor.
    pub fn meets_minimum(self) -> bool {
        self.0 >= MIN_TRANSFER
    }
}
