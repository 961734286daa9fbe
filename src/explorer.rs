//! Read-only client for the Arcscan `?module=&action=` REST API.
//!
//! The explorer speaks the etherscan dialect: every numeric field arrives as
//! a string, list endpoints wrap their payload in a status envelope, and an
//! empty result set is reported as status `"0"`. Individual endpoint methods
//! surface errors; [`ExplorerClient::address_history`] swallows them into an
//! empty list so a flaky explorer never breaks the rest of a view.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_API_BASE: &str = "https://testnet.arcscan.app/api";

/// Decimals of the chain's native token, for wei formatting.
const NATIVE_DECIMALS: u32 = 18;
const NATIVE_SYMBOL: &str = "ARC";
/// Transactions with fewer confirmations than this display as pending.
const CONFIRMATION_DEPTH: u64 = 12;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("Explorer request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to build explorer HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Category assigned from a transaction's 4-byte method selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxCategory {
    Transfer,
    Approve,
    ApproveAll,
    Swap,
    Stake,
    Unstake,
    Bridge,
    Mint,
    NftTransfer,
    /// Plain value transfer into the queried address.
    Receive,
    /// Plain value transfer out of the queried address.
    Send,
    ContractCall,
}

impl TxCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Approve => "approve",
            Self::ApproveAll => "approve-all",
            Self::Swap => "swap",
            Self::Stake => "stake",
            Self::Unstake => "unstake",
            Self::Bridge => "bridge",
            Self::Mint => "mint",
            Self::NftTransfer => "nft-transfer",
            Self::Receive => "receive",
            Self::Send => "send",
            Self::ContractCall => "contract-call",
        }
    }
}

impl std::fmt::Display for TxCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Classifies calldata by its selector, falling back to the transfer
/// direction for empty input.
pub fn classify(input: &str, incoming: bool) -> TxCategory {
    match input.get(..10) {
        Some("0xa9059cbb" | "0x23b872dd") => TxCategory::Transfer,
        Some("0x095ea7b3") => TxCategory::Approve,
        Some("0xa22cb465") => TxCategory::ApproveAll,
        Some("0x38ed1739" | "0x7ff36ab5" | "0x18cbafe5") => TxCategory::Swap,
        Some("0xb6f9de95") => TxCategory::Stake,
        Some("0x2e1a7d4d") => TxCategory::Unstake,
        Some("0x3ccfd60b") => TxCategory::Bridge,
        Some("0x40c10f19") => TxCategory::Mint,
        Some("0x42842e0e") => TxCategory::NftTransfer,
        _ if input.is_empty() || input == "0x" || input == "0x0" => {
            if incoming {
                TxCategory::Receive
            } else {
                TxCategory::Send
            }
        }
        _ => TxCategory::ContractCall,
    }
}

/// Etherscan-style envelope; `status == "1"` means a non-empty result.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    result: Option<T>,
}

/// A row from `account/txlist`. Every field is a decimal string.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NormalTx {
    pub hash: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub input: String,
    #[serde(default, rename = "timeStamp")]
    pub time_stamp: String,
    #[serde(default, rename = "blockNumber")]
    pub block_number: String,
    #[serde(default, rename = "isError")]
    pub is_error: String,
    #[serde(default, rename = "txreceipt_status")]
    pub receipt_status: String,
    #[serde(default)]
    pub confirmations: String,
}

/// A row from `account/tokentx`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenTx {
    pub hash: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub input: String,
    #[serde(default, rename = "timeStamp")]
    pub time_stamp: String,
    #[serde(default, rename = "blockNumber")]
    pub block_number: String,
    #[serde(default)]
    pub confirmations: String,
    #[serde(default, rename = "contractAddress")]
    pub contract_address: String,
    #[serde(default, rename = "tokenSymbol")]
    pub token_symbol: String,
    #[serde(default, rename = "tokenDecimal")]
    pub token_decimal: String,
}

/// Detail payload from `transaction/gettxinfo`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TransactionDetail {
    pub hash: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub input: String,
    #[serde(default, rename = "blockNumber")]
    pub block_number: String,
    #[serde(default)]
    pub confirmations: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStatus {
    Success,
    Failed,
    Pending,
}

/// One formatted row of an address's history, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub hash: String,
    pub category: TxCategory,
    pub from: String,
    pub to: String,
    /// Human-readable amount with its token symbol, e.g. `"12.5 USDC"`.
    pub amount: String,
    pub status: HistoryStatus,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    pub block_number: u64,
    pub confirmations: u64,
}

pub struct ExplorerClient {
    http: Client,
    api_base: String,
    retry: ExponentialBuilder,
}

impl ExplorerClient {
    pub fn new(api_base: impl Into<String>) -> Result<Self, ExplorerError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(ExplorerError::Client)?;

        Ok(Self {
            http,
            api_base: api_base.into(),
            retry: ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(200))
                .with_max_times(3),
        })
    }

    #[cfg(test)]
    fn with_retry(mut self, retry: ExponentialBuilder) -> Self {
        self.retry = retry;
        self
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<Envelope<T>, ExplorerError> {
        let envelope = (|| async {
            self.http
                .get(&self.api_base)
                .query(params)
                .send()
                .await?
                .error_for_status()?
                .json::<Envelope<T>>()
                .await
        })
        .retry(self.retry)
        .when(|error: &reqwest::Error| error.is_timeout() || error.is_connect())
        .notify(|error, delay| {
            warn!(%error, ?delay, "Retrying explorer request");
        })
        .await?;

        Ok(envelope)
    }

    /// Normal transactions involving `address`, newest first.
    pub async fn transactions(&self, address: &str) -> Result<Vec<NormalTx>, ExplorerError> {
        let envelope: Envelope<Vec<NormalTx>> = self
            .get(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("page", "1"),
                ("offset", "100"),
                ("sort", "desc"),
            ])
            .await?;

        Ok(Self::list_result(envelope))
    }

    /// ERC-20 transfers involving `address`, newest first.
    pub async fn token_transfers(&self, address: &str) -> Result<Vec<TokenTx>, ExplorerError> {
        let envelope: Envelope<Vec<TokenTx>> = self
            .get(&[
                ("module", "account"),
                ("action", "tokentx"),
                ("address", address),
                ("page", "1"),
                ("offset", "100"),
                ("sort", "desc"),
            ])
            .await?;

        Ok(Self::list_result(envelope))
    }

    /// Native balance of `address` in whole tokens.
    pub async fn native_balance(&self, address: &str) -> Result<Decimal, ExplorerError> {
        let envelope: Envelope<String> = self
            .get(&[
                ("module", "account"),
                ("action", "balance"),
                ("address", address),
                ("tag", "latest"),
            ])
            .await?;

        let wei = match envelope {
            Envelope {
                status: Some(status),
                result: Some(wei),
            } if status == "1" => wei,
            _ => return Ok(Decimal::ZERO),
        };

        Ok(parse_units(&wei, NATIVE_DECIMALS).unwrap_or(Decimal::ZERO))
    }

    /// Detail for one transaction, or `None` when the explorer has no record.
    pub async fn transaction_detail(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionDetail>, ExplorerError> {
        let envelope: Envelope<TransactionDetail> = self
            .get(&[
                ("module", "transaction"),
                ("action", "gettxinfo"),
                ("txhash", tx_hash),
            ])
            .await?;

        Ok(envelope.result)
    }

    /// Combined normal + token history for `address`: de-duplicated by hash,
    /// classified by selector, newest first.
    ///
    /// Endpoint failures degrade to an empty contribution rather than failing
    /// the whole call.
    pub async fn address_history(&self, address: &str) -> Vec<HistoryEntry> {
        let (normal, token) = tokio::join!(self.transactions(address), self.token_transfers(address));

        let normal = normal.unwrap_or_else(|error| {
            warn!(%error, "Transaction list unavailable, continuing without it");
            Vec::new()
        });
        let token = token.unwrap_or_else(|error| {
            warn!(%error, "Token transfer list unavailable, continuing without it");
            Vec::new()
        });

        let mut entries: Vec<HistoryEntry> = Vec::with_capacity(normal.len() + token.len());
        for tx in &normal {
            entries.push(format_normal(tx, address));
        }
        for tx in &token {
            // A token transfer inside an already-listed transaction is a
            // duplicate of that hash.
            if entries.iter().any(|entry| entry.hash == tx.hash) {
                continue;
            }
            entries.push(format_token(tx, address));
        }

        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }

    fn list_result<T>(envelope: Envelope<Vec<T>>) -> Vec<T> {
        match envelope {
            Envelope {
                status: Some(status),
                result: Some(result),
            } if status == "1" => result,
            _ => Vec::new(),
        }
    }
}

/// Parses a base-unit decimal string into a whole-token [`Decimal`].
fn parse_units(raw: &str, decimals: u32) -> Option<Decimal> {
    let units: i128 = raw.parse().ok()?;
    Decimal::try_from_i128_with_scale(units, decimals).ok()
}

fn parse_u64(raw: &str) -> u64 {
    raw.parse().unwrap_or(0)
}

fn status_of(is_error: &str, receipt_status: &str, confirmations: &str) -> HistoryStatus {
    if is_error == "1" || receipt_status == "0" {
        HistoryStatus::Failed
    } else if parse_u64(confirmations) < CONFIRMATION_DEPTH {
        HistoryStatus::Pending
    } else {
        HistoryStatus::Success
    }
}

fn format_amount(value: &str, decimals: u32, symbol: &str) -> String {
    let amount = parse_units(value, decimals)
        .unwrap_or(Decimal::ZERO)
        .round_dp(6)
        .normalize();
    format!("{amount} {symbol}")
}

fn format_normal(tx: &NormalTx, address: &str) -> HistoryEntry {
    let incoming = tx.to.eq_ignore_ascii_case(address);
    HistoryEntry {
        hash: tx.hash.clone(),
        category: classify(&tx.input, incoming),
        from: tx.from.clone(),
        to: tx.to.clone(),
        amount: format_amount(&tx.value, NATIVE_DECIMALS, NATIVE_SYMBOL),
        status: status_of(&tx.is_error, &tx.receipt_status, &tx.confirmations),
        timestamp: parse_u64(&tx.time_stamp),
        block_number: parse_u64(&tx.block_number),
        confirmations: parse_u64(&tx.confirmations),
    }
}

fn format_token(tx: &TokenTx, address: &str) -> HistoryEntry {
    let incoming = tx.to.eq_ignore_ascii_case(address);
    let decimals = tx.token_decimal.parse().unwrap_or(NATIVE_DECIMALS);
    let symbol = if tx.token_symbol.is_empty() {
        "TOKEN"
    } else {
        &tx.token_symbol
    };

    HistoryEntry {
        hash: tx.hash.clone(),
        category: classify(&tx.input, incoming),
        from: tx.from.clone(),
        to: if tx.to.is_empty() {
            tx.contract_address.clone()
        } else {
            tx.to.clone()
        },
        amount: format_amount(&tx.value, decimals, symbol),
        status: status_of("", "", &tx.confirmations),
        timestamp: parse_u64(&tx.time_stamp),
        block_number: parse_u64(&tx.block_number),
        confirmations: parse_u64(&tx.confirmations),
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    const WALLET: &str = "0xAAaAaAaaAaAaAaaAaAAAAAAAAaaaAaAaAaaAaaAa";

    fn fast_retry() -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(1))
            .with_max_times(1)
    }

    fn client(server: &MockServer) -> ExplorerClient {
        ExplorerClient::new(server.url("/api"))
            .unwrap()
            .with_retry(fast_retry())
    }

    fn normal_tx(hash: &str, timestamp: u64, input: &str, confirmations: u64) -> serde_json::Value {
        json!({
            "hash": hash,
            "from": WALLET,
            "to": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
            "value": "1000000000000000000",
            "input": input,
            "timeStamp": timestamp.to_string(),
            "blockNumber": "100",
            "isError": "0",
            "txreceipt_status": "1",
            "confirmations": confirmations.to_string(),
        })
    }

    #[test]
    fn selector_map_matches_known_methods() {
        assert_eq!(classify("0xa9059cbb0000", false), TxCategory::Transfer);
        assert_eq!(classify("0x23b872dd0000", false), TxCategory::Transfer);
        assert_eq!(classify("0x095ea7b30000", false), TxCategory::Approve);
        assert_eq!(classify("0x38ed17390000", false), TxCategory::Swap);
        assert_eq!(classify("0xb6f9de950000", false), TxCategory::Stake);
        assert_eq!(classify("0x2e1a7d4d0000", false), TxCategory::Unstake);
        assert_eq!(classify("0x3ccfd60b0000", false), TxCategory::Bridge);
        assert_eq!(classify("0x40c10f190000", false), TxCategory::Mint);
        assert_eq!(classify("0x42842e0e0000", false), TxCategory::NftTransfer);
        assert_eq!(classify("0xa22cb4650000", false), TxCategory::ApproveAll);
        assert_eq!(classify("0xdeadbeef0000", false), TxCategory::ContractCall);
    }

    #[test]
    fn empty_input_classifies_by_direction() {
        assert_eq!(classify("0x", true), TxCategory::Receive);
        assert_eq!(classify("0x", false), TxCategory::Send);
        assert_eq!(classify("", true), TxCategory::Receive);
        assert_eq!(classify("0x0", false), TxCategory::Send);
    }

    #[tokio::test]
    async fn transactions_unwraps_the_envelope() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path("/api")
                .query_param("module", "account")
                .query_param("action", "txlist")
                .query_param("address", WALLET);
            then.status(200).json_body(json!({
                "status": "1",
                "message": "OK",
                "result": [normal_tx("0x01", 1_700_000_000, "0x", 50)],
            }));
        });

        let txs = client(&server).transactions(WALLET).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].hash, "0x01");
        assert_eq!(txs[0].confirmations, "50");
    }

    #[tokio::test]
    async fn status_zero_envelope_yields_empty_list() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api");
            then.status(200).json_body(json!({
                "status": "0",
                "message": "No transactions found",
                "result": [],
            }));
        });

        let txs = client(&server).transactions(WALLET).await.unwrap();
        assert!(txs.is_empty());
    }

    #[tokio::test]
    async fn native_balance_converts_wei() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path("/api")
                .query_param("action", "balance");
            then.status(200).json_body(json!({
                "status": "1",
                "result": "2500000000000000000",
            }));
        });

        let balance = client(&server).native_balance(WALLET).await.unwrap();
        assert_eq!(balance, Decimal::new(25, 1));
    }

    #[tokio::test]
    async fn history_merges_dedupes_and_sorts_newest_first() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path("/api")
                .query_param("action", "txlist");
            then.status(200).json_body(json!({
                "status": "1",
                "result": [
                    normal_tx("0xold", 1_700_000_000, "0x", 99),
                    normal_tx("0xshared", 1_700_000_500, "0xa9059cbb00", 99),
                ],
            }));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api")
                .query_param("action", "tokentx");
            then.status(200).json_body(json!({
                "status": "1",
                "result": [
                    {
                        // Same hash as the normal tx; must not duplicate.
                        "hash": "0xshared",
                        "from": "0xcccccccccccccccccccccccccccccccccccccccc",
                        "to": WALLET,
                        "value": "5000000",
                        "input": "0x",
                        "timeStamp": "1700000500",
                        "blockNumber": "101",
                        "confirmations": "99",
                        "tokenSymbol": "USDC",
                        "tokenDecimal": "6",
                    },
                    {
                        "hash": "0xnew",
                        "from": "0xcccccccccccccccccccccccccccccccccccccccc",
                        "to": WALLET,
                        "value": "12500000",
                        "input": "0x",
                        "timeStamp": "1700001000",
                        "blockNumber": "102",
                        "confirmations": "99",
                        "tokenSymbol": "USDC",
                        "tokenDecimal": "6",
                    },
                ],
            }));
        });

        let history = client(&server).address_history(WALLET).await;

        let hashes: Vec<&str> = history.iter().map(|entry| entry.hash.as_str()).collect();
        assert_eq!(hashes, vec!["0xnew", "0xshared", "0xold"]);
        assert_eq!(history[0].amount, "12.5 USDC");
        assert_eq!(history[0].category, TxCategory::Receive);
        assert_eq!(history[1].category, TxCategory::Transfer);
    }

    #[tokio::test]
    async fn history_degrades_to_empty_on_endpoint_failure() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api");
            then.status(500);
        });

        let history = client(&server).address_history(WALLET).await;
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn transaction_detail_passes_through_result() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path("/api")
                .query_param("module", "transaction")
                .query_param("action", "gettxinfo")
                .query_param("txhash", "0xabc");
            then.status(200).json_body(json!({
                "status": "1",
                "result": {
                    "hash": "0xabc",
                    "from": WALLET,
                    "to": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
                    "value": "0",
                    "input": "0x095ea7b3",
                    "blockNumber": "100",
                    "confirmations": "3",
                },
            }));
        });

        let detail = client(&server)
            .transaction_detail("0xabc")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.hash, "0xabc");
        assert_eq!(detail.input, "0x095ea7b3");
    }

    #[test]
    fn pending_below_confirmation_depth() {
        assert_eq!(status_of("0", "1", "11"), HistoryStatus::Pending);
        assert_eq!(status_of("0", "1", "12"), HistoryStatus::Success);
        assert_eq!(status_of("1", "1", "99"), HistoryStatus::Failed);
        assert_eq!(status_of("0", "0", "99"), HistoryStatus::Failed);
    }
}
