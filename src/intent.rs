//! Bridge intents and pre-submission validation.
//!
//! Every check here runs before any transaction is signed: bad amounts,
//! same-chain routes, and balance shortfalls are all caught while the intent
//! is still just data.

use alloy::primitives::{Address, U256};
use thiserror::Error;

use crate::amount::{AmountError, Usdc};
use crate::chains::{ChainRoute, RouteError, validate_pair};

/// A user's request to move USDC between two chains. Mutable form state;
/// nothing here has touched a wallet yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeIntent {
    pub source_chain_id: u64,
    pub destination_chain_id: u64,
    pub amount: Usdc,
    /// Sender on the source chain; also the mint recipient.
    pub sender: Address,
}

/// An intent that has passed validation against live balances.
#[derive(Debug, Clone)]
pub struct ValidatedIntent {
    pub source: &'static ChainRoute,
    pub destination: &'static ChainRoute,
    /// Amount in USDC base units.
    pub amount: U256,
    pub sender: Address,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error("Please enter an amount greater than zero")]
    NotPositive,
    #[error("Minimum amount is 0.01 USDC (got {amount})")]
    BelowMinimum { amount: Usdc },
    #[error("Insufficient balance: need {required} base units, have {available}")]
    InsufficientBalance { required: U256, available: U256 },
}

impl BridgeIntent {
    /// Validates the intent against the route table and the sender's source
    /// chain balance.
    pub fn validate(&self, source_balance: U256) -> Result<ValidatedIntent, IntentError> {
        let (source, destination) =
            validate_pair(self.source_chain_id, self.destination_chain_id)?;

        if !self.amount.is_positive() {
            return Err(IntentError::NotPositive);
        }
        if !self.amount.meets_minimum() {
            return Err(IntentError::BelowMinimum {
                amount: self.amount,
            });
        }

        let amount = self.amount.to_base_units()?;
        if amount > source_balance {
            return Err(IntentError::InsufficientBalance {
                required: amount,
                available: source_balance,
            });
        }

        Ok(ValidatedIntent {
            source,
            destination,
            amount,
            sender: self.sender,
        })
    }

    /// Exchanges source and destination. Applying this twice restores the
    /// original intent.
    pub fn swap_chains(&mut self) {
        std::mem::swap(&mut self.source_chain_id, &mut self.destination_chain_id);
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;
    use crate::chains::{ARC_TESTNET, ETHEREUM_SEPOLIA};

    fn intent(amount: &str) -> BridgeIntent {
        BridgeIntent {
            source_chain_id: ETHEREUM_SEPOLIA.chain_id,
            destination_chain_id: ARC_TESTNET.chain_id,
            amount: amount.parse().unwrap(),
            sender: address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
        }
    }

    #[test]
    fn accepts_amount_within_balance() {
        let validated = intent("100").validate(U256::from(500_000_000u64)).unwrap();
        assert_eq!(validated.amount, U256::from(100_000_000u64));
        assert_eq!(validated.source.domain_id, 0);
        assert_eq!(validated.destination.domain_id, 26);
    }

    #[test]
    fn rejects_amount_exceeding_balance() {
        let err = intent("501").validate(U256::from(500_000_000u64)).unwrap_err();
        assert_eq!(
            err,
            IntentError::InsufficientBalance {
                required: U256::from(501_000_000u64),
                available: U256::from(500_000_000u64),
            }
        );
    }

    #[test]
    fn rejects_amount_equal_to_balance_plus_one_unit() {
        let balance = U256::from(100_000_000u64);
        let err = intent("100.000001").validate(balance).unwrap_err();
        assert!(matches!(err, IntentError::InsufficientBalance { .. }));
    }

    #[test]
    fn rejects_zero_amount() {
        let err = intent("0").validate(U256::from(1_000_000u64)).unwrap_err();
        assert_eq!(err, IntentError::NotPositive);
    }

    #[test]
    fn rejects_below_minimum() {
        let err = intent("0.005").validate(U256::from(1_000_000u64)).unwrap_err();
        assert!(matches!(err, IntentError::BelowMinimum { .. }));
    }

    #[test]
    fn accepts_exact_minimum() {
        let validated = intent("0.01").validate(U256::from(1_000_000u64)).unwrap();
        assert_eq!(validated.amount, U256::from(10_000u64));
    }

    #[test]
    fn rejects_same_chain_route() {
        let mut bad = intent("1");
        bad.destination_chain_id = bad.source_chain_id;
        let err = bad.validate(U256::from(1_000_000u64)).unwrap_err();
        assert_eq!(
            err,
            IntentError::Route(RouteError::SameChain {
                chain_id: ETHEREUM_SEPOLIA.chain_id
            })
        );
    }

    #[test]
    fn route_check_runs_before_amount_checks() {
        // Same-chain with a zero amount: the route error wins.
        let mut bad = intent("0");
        bad.destination_chain_id = bad.source_chain_id;
        let err = bad.validate(U256::ZERO).unwrap_err();
        assert!(matches!(err, IntentError::Route(_)));
    }

    #[test]
    fn swap_chains_twice_restores_original() {
        let original = intent("42");
        let mut swapped = original.clone();

        swapped.swap_chains();
        assert_eq!(swapped.source_chain_id, ARC_TESTNET.chain_id);
        assert_eq!(swapped.destination_chain_id, ETHEREUM_SEPOLIA.chain_id);

        swapped.swap_chains();
        assert_eq!(swapped, original);
    }
}
