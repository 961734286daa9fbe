//! Per-chain contract access behind the [`ChainCaller`] seam.
//!
//! The sequencer never talks to a provider directly; it goes through this
//! trait so orchestration logic can be exercised against a mock without a
//! node. Writes are two-phase: a submit method returns the transaction hash
//! as soon as the node accepts it, and a confirm method waits for the
//! receipt, so an in-flight transaction is identifiable by hash before it
//! lands in a block. [`EvmCaller`] is the live implementation against one
//! chain's USDC and CCTP contracts.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider};
use alloy::rpc::types::TransactionReceipt;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, trace};

use crate::bindings::{IERC20, IMessageTransmitter, ITokenMessenger};
use crate::chains::ChainRoute;

/// Parameters for the source-chain burn call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnRequest {
    /// Amount in USDC base units.
    pub amount: U256,
    /// CCTP domain of the destination chain.
    pub destination_domain: u32,
    /// Recipient on the destination chain, left-padded to 32 bytes.
    pub mint_recipient: alloy::primitives::FixedBytes<32>,
    /// Fee ceiling forwarded to `depositForBurn`.
    pub max_fee: U256,
}

#[derive(Debug, Error)]
pub enum CallerError {
    #[error("Contract error: {0}")]
    Contract(#[from] alloy::contract::Error),
    #[error("Transaction error: {0}")]
    Transaction(#[from] alloy::providers::PendingTransactionError),
    #[error("Transaction {hash} reverted on {chain}")]
    Reverted { hash: TxHash, chain: &'static str },
    #[error("MessageSent event not found in burn receipt {hash}")]
    MessageSentEventNotFound { hash: TxHash },
}

/// Read and write access to one chain's bridge-relevant contracts.
#[async_trait]
pub trait ChainCaller: Send + Sync {
    fn route(&self) -> &'static ChainRoute;

    /// USDC balance of `owner`.
    async fn usdc_balance(&self, owner: Address) -> Result<U256, CallerError>;

    /// Allowance `owner` has granted this chain's TokenMessenger.
    async fn token_messenger_allowance(&self, owner: Address) -> Result<U256, CallerError>;

    /// Submits an approval of the TokenMessenger for `amount` of USDC,
    /// returning the hash as soon as the node accepts it.
    async fn approve_token_messenger(&self, amount: U256) -> Result<TxHash, CallerError>;

    /// Submits the USDC burn via `depositForBurn`.
    async fn deposit_for_burn(&self, request: BurnRequest) -> Result<TxHash, CallerError>;

    /// Submits the attested message via `receiveMessage` to mint on this
    /// chain.
    async fn receive_message(
        &self,
        message: Bytes,
        attestation: Bytes,
    ) -> Result<TxHash, CallerError>;

    /// Waits for a submitted transaction to confirm, failing on revert.
    async fn confirm(&self, hash: TxHash) -> Result<(), CallerError>;

    /// Burn confirmation. Additionally verifies a `MessageSent` event was
    /// emitted, since the attestation service keys off that event.
    async fn confirm_burn(&self, hash: TxHash) -> Result<(), CallerError>;
}

/// Live implementation backed by an alloy provider with a wallet filler.
pub struct EvmCaller {
    route: &'static ChainRoute,
    provider: DynProvider,
    usdc: IERC20::IERC20Instance<DynProvider>,
    token_messenger: ITokenMessenger::ITokenMessengerInstance<DynProvider>,
    message_transmitter: IMessageTransmitter::IMessageTransmitterInstance<DynProvider>,
}

impl EvmCaller {
    pub fn new(route: &'static ChainRoute, provider: DynProvider) -> Self {
        Self {
            route,
            usdc: IERC20::new(route.usdc, provider.clone()),
            token_messenger: ITokenMessenger::new(route.token_messenger, provider.clone()),
            message_transmitter: IMessageTransmitter::new(
                route.message_transmitter,
                provider.clone(),
            ),
            provider,
        }
    }

    async fn receipt(&self, hash: TxHash) -> Result<TransactionReceipt, CallerError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), hash)
            .get_receipt()
            .await?;

        if !receipt.status() {
            return Err(CallerError::Reverted {
                hash,
                chain: self.route.short_name,
            });
        }

        Ok(receipt)
    }
}

#[async_trait]
impl ChainCaller for EvmCaller {
    fn route(&self) -> &'static ChainRoute {
        self.route
    }

    async fn usdc_balance(&self, owner: Address) -> Result<U256, CallerError> {
        let balance = self.usdc.balanceOf(owner).call().await?;
        trace!(chain = self.route.short_name, %owner, %balance, "Read USDC balance");

        Ok(balance)
    }

    async fn token_messenger_allowance(&self, owner: Address) -> Result<U256, CallerError> {
        let allowance = self
            .usdc
            .allowance(owner, self.route.token_messenger)
            .call()
            .await?;
        trace!(chain = self.route.short_name, %owner, %allowance, "Read USDC allowance");

        Ok(allowance)
    }

    async fn approve_token_messenger(&self, amount: U256) -> Result<TxHash, CallerError> {
        let pending = self
            .usdc
            .approve(self.route.token_messenger, amount)
            .send()
            .await?;

        let hash = *pending.tx_hash();
        info!(chain = self.route.short_name, %hash, "USDC approve submitted");
        Ok(hash)
    }

    async fn deposit_for_burn(&self, request: BurnRequest) -> Result<TxHash, CallerError> {
        info!(
            chain = self.route.short_name,
            amount = %request.amount,
            destination_domain = request.destination_domain,
            max_fee = %request.max_fee,
            "Submitting depositForBurn"
        );

        let pending = self
            .token_messenger
            .depositForBurn(
                request.amount,
                request.destination_domain,
                request.mint_recipient,
                self.route.usdc,
                // bytes32(0) lets any address call receiveMessage on the
                // destination chain.
                alloy::primitives::FixedBytes::ZERO,
                request.max_fee,
                0,
            )
            .send()
            .await?;

        Ok(*pending.tx_hash())
    }

    async fn receive_message(
        &self,
        message: Bytes,
        attestation: Bytes,
    ) -> Result<TxHash, CallerError> {
        let pending = self
            .message_transmitter
            .receiveMessage(message, attestation)
            .send()
            .await?;

        let hash = *pending.tx_hash();
        info!(chain = self.route.short_name, %hash, "Mint submitted");
        Ok(hash)
    }

    async fn confirm(&self, hash: TxHash) -> Result<(), CallerError> {
        self.receipt(hash).await?;
        info!(chain = self.route.short_name, %hash, "Transaction confirmed");

        Ok(())
    }

    async fn confirm_burn(&self, hash: TxHash) -> Result<(), CallerError> {
        let receipt = self.receipt(hash).await?;

        if !receipt
            .inner
            .logs()
            .iter()
            .any(|log| IMessageTransmitter::MessageSent::decode_log(log.as_ref()).is_ok())
        {
            return Err(CallerError::MessageSentEventNotFound { hash });
        }

        info!(chain = self.route.short_name, %hash, "Burn confirmed");
        Ok(())
    }
}
