//! The bridge transaction sequencer.
//!
//! Drives a validated [`BridgeIntent`] through the four dependent stages of a
//! CCTP transfer: approve (only when allowance falls short) → burn →
//! attestation wait → mint. Control flows strictly forward; a failure at any
//! stage halts the sequence, marks that stage's record failed, and leaves
//! retrying to the operator. Nothing is rolled back — each stage is an
//! independent on-chain transaction.

use std::sync::Arc;

use alloy::primitives::{TxHash, U256};
use thiserror::Error;
use tracing::{info, warn};

use crate::attestation::{AttestationClient, AttestationError, AttestationRecord};
use crate::caller::{BurnRequest, CallerError, ChainCaller};
use crate::chains::address_to_bytes32;
use crate::intent::{BridgeIntent, IntentError, ValidatedIntent};

/// Default burn fee ceiling, in USDC base units (0.01 USDC). The effective
/// ceiling is always capped at a tenth of the amount, so the fee can never
/// swallow a transfer.
pub const DEFAULT_MAX_FEE: U256 = U256::from_limbs([10_000, 0, 0, 0]);

/// The three transaction kinds a transfer can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Approve,
    Burn,
    Mint,
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Approve => "approve",
            Self::Burn => "burn",
            Self::Mint => "mint",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// The live record for one transaction kind. At most one exists per kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub kind: TxKind,
    pub status: TxStatus,
    /// Set as soon as the node accepts the submission, so a pending record
    /// already identifies its transaction. `None` only when submission
    /// itself failed.
    pub hash: Option<TxHash>,
}

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOutcome {
    /// `None` when the existing allowance already covered the amount.
    pub approve_tx: Option<TxHash>,
    pub burn_tx: TxHash,
    pub mint_tx: TxHash,
    /// Amount burned, in base units.
    pub amount: U256,
}

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("Validation failed: {0}")]
    Validation(#[from] IntentError),
    #[error("Contract read failed: {0}")]
    Read(#[source] CallerError),
    #[error("{kind} transaction failed: {source}")]
    Transaction {
        kind: TxKind,
        #[source]
        source: CallerError,
    },
    #[error(transparent)]
    Attestation(#[from] AttestationError),
    #[error("A {kind} transaction is already in flight")]
    AlreadyInFlight { kind: TxKind },
    #[error("Mint already submitted for this attestation")]
    MintAlreadySubmitted,
}

/// Computes the burn fee ceiling: `min(default_fee, amount / 10)`.
///
/// Capping at a tenth of the amount avoids the fee ≥ amount edge case for
/// dust-sized transfers.
fn compute_max_fee(default_fee: U256, amount: U256) -> U256 {
    default_fee.min(amount / U256::from(10))
}

pub struct BridgeSequencer {
    source: Arc<dyn ChainCaller>,
    destination: Arc<dyn ChainCaller>,
    attestation: AttestationClient,
    default_max_fee: U256,
    records: [Option<TransactionRecord>; 3],
    mint_submitted: bool,
}

impl BridgeSequencer {
    pub fn new(
        source: Arc<dyn ChainCaller>,
        destination: Arc<dyn ChainCaller>,
        attestation: AttestationClient,
    ) -> Self {
        Self {
            source,
            destination,
            attestation,
            default_max_fee: DEFAULT_MAX_FEE,
            records: [None, None, None],
            mint_submitted: false,
        }
    }

    pub fn with_default_max_fee(mut self, fee: U256) -> Self {
        self.default_max_fee = fee;
        self
    }

    /// The live record for a transaction kind, if one was started.
    pub fn record(&self, kind: TxKind) -> Option<&TransactionRecord> {
        self.records[Self::slot(kind)].as_ref()
    }

    const fn slot(kind: TxKind) -> usize {
        match kind {
            TxKind::Approve => 0,
            TxKind::Burn => 1,
            TxKind::Mint => 2,
        }
    }

    fn begin(&mut self, kind: TxKind) -> Result<(), SequencerError> {
        if matches!(
            self.record(kind),
            Some(record) if record.status == TxStatus::Pending
        ) {
            return Err(SequencerError::AlreadyInFlight { kind });
        }

        self.records[Self::slot(kind)] = Some(TransactionRecord {
            kind,
            status: TxStatus::Pending,
            hash: None,
        });
        Ok(())
    }

    /// Records the submission outcome. On success the pending record picks
    /// up its hash; on failure no transaction exists, so the record fails
    /// without one.
    fn submitted(
        &mut self,
        kind: TxKind,
        result: Result<TxHash, CallerError>,
    ) -> Result<TxHash, SequencerError> {
        let slot = &mut self.records[Self::slot(kind)];
        match result {
            Ok(hash) => {
                *slot = Some(TransactionRecord {
                    kind,
                    status: TxStatus::Pending,
                    hash: Some(hash),
                });
                Ok(hash)
            }
            Err(source) => {
                *slot = Some(TransactionRecord {
                    kind,
                    status: TxStatus::Failed,
                    hash: None,
                });
                warn!(%kind, error = %source, "Bridge stage submission failed");
                Err(SequencerError::Transaction { kind, source })
            }
        }
    }

    /// Records the confirmation outcome of a submitted transaction. The
    /// hash is kept either way.
    fn finish(
        &mut self,
        kind: TxKind,
        hash: TxHash,
        result: Result<(), CallerError>,
    ) -> Result<TxHash, SequencerError> {
        let slot = &mut self.records[Self::slot(kind)];
        match result {
            Ok(()) => {
                *slot = Some(TransactionRecord {
                    kind,
                    status: TxStatus::Confirmed,
                    hash: Some(hash),
                });
                Ok(hash)
            }
            Err(source) => {
                *slot = Some(TransactionRecord {
                    kind,
                    status: TxStatus::Failed,
                    hash: Some(hash),
                });
                warn!(%kind, %hash, error = %source, "Bridge stage failed");
                Err(SequencerError::Transaction { kind, source })
            }
        }
    }

    /// Validates an intent against the sender's live source-chain balance.
    pub async fn validate(&self, intent: &BridgeIntent) -> Result<ValidatedIntent, SequencerError> {
        let balance = self
            .source
            .usdc_balance(intent.sender)
            .await
            .map_err(SequencerError::Read)?;

        Ok(intent.validate(balance)?)
    }

    /// Issues an approval only when the current allowance is insufficient.
    ///
    /// Requests unlimited allowance so repeated transfers skip this stage.
    pub async fn approve_if_needed(
        &mut self,
        intent: &ValidatedIntent,
    ) -> Result<Option<TxHash>, SequencerError> {
        let allowance = self
            .source
            .token_messenger_allowance(intent.sender)
            .await
            .map_err(SequencerError::Read)?;

        if allowance >= intent.amount {
            info!(%allowance, amount = %intent.amount, "Allowance sufficient, skipping approve");
            return Ok(None);
        }

        self.begin(TxKind::Approve)?;
        let submitted = self.source.approve_token_messenger(U256::MAX).await;
        let hash = self.submitted(TxKind::Approve, submitted)?;

        let confirmed = self.source.confirm(hash).await;
        self.finish(TxKind::Approve, hash, confirmed).map(Some)
    }

    /// Burns the amount on the source chain.
    pub async fn burn(&mut self, intent: &ValidatedIntent) -> Result<TxHash, SequencerError> {
        self.begin(TxKind::Burn)?;

        let request = BurnRequest {
            amount: intent.amount,
            destination_domain: intent.destination.domain_id,
            mint_recipient: address_to_bytes32(intent.sender),
            max_fee: compute_max_fee(self.default_max_fee, intent.amount),
        };
        let submitted = self.source.deposit_for_burn(request).await;
        let hash = self.submitted(TxKind::Burn, submitted)?;

        let confirmed = self.source.confirm_burn(hash).await;
        self.finish(TxKind::Burn, hash, confirmed)
    }

    /// Waits for the attestation covering a confirmed burn.
    pub async fn wait_for_attestation(
        &self,
        burn_tx: TxHash,
    ) -> Result<AttestationRecord, SequencerError> {
        let record = self
            .attestation
            .wait_for_attestation(self.source.route().domain_id, burn_tx)
            .await?;

        Ok(record)
    }

    /// Submits the attestation on the destination chain, consuming it.
    ///
    /// Guarded by a single-shot flag: once a mint has been submitted and not
    /// failed, further calls return [`SequencerError::MintAlreadySubmitted`]
    /// without touching the chain. A failed mint clears the flag so the
    /// operator can retry that stage.
    pub async fn mint(&mut self, record: AttestationRecord) -> Result<TxHash, SequencerError> {
        if self.mint_submitted {
            return Err(SequencerError::MintAlreadySubmitted);
        }
        self.mint_submitted = true;

        self.begin(TxKind::Mint)?;
        let submitted = self
            .destination
            .receive_message(record.message, record.attestation)
            .await;
        if submitted.is_err() {
            self.mint_submitted = false;
        }
        let hash = self.submitted(TxKind::Mint, submitted)?;

        let confirmed = self.destination.confirm(hash).await;
        if confirmed.is_err() {
            self.mint_submitted = false;
        }
        self.finish(TxKind::Mint, hash, confirmed)
    }

    /// Runs the whole pipeline for one intent.
    pub async fn run(&mut self, intent: &BridgeIntent) -> Result<BridgeOutcome, SequencerError> {
        let validated = self.validate(intent).await?;

        let approve_tx = self.approve_if_needed(&validated).await?;
        let burn_tx = self.burn(&validated).await?;
        let attestation = self.wait_for_attestation(burn_tx).await?;
        let mint_tx = self.mint(attestation).await?;

        info!(%burn_tx, %mint_tx, amount = %validated.amount, "Bridge transfer complete");

        Ok(BridgeOutcome {
            approve_tx,
            burn_tx,
            mint_tx,
            amount: validated.amount,
        })
    }
}
