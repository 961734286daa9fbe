//! CLI commands for bridging USDC, checking balances, and browsing history.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, TxHash};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::amount::Usdc;
use crate::attestation::AttestationClient;
use crate::caller::ChainCaller;
use crate::chains::{self, SUPPORTED_ROUTES};
use crate::env::{Config, Env};
use crate::explorer::ExplorerClient;
use crate::intent::BridgeIntent;
use crate::reader::BalanceReader;
use crate::sequencer::BridgeSequencer;
use crate::session::Session;

/// Supported chain, as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChainArg {
    /// Ethereum Sepolia testnet
    Sepolia,
    /// BNB Smart Chain testnet
    BscTestnet,
    /// Polygon Amoy testnet
    Amoy,
    /// Arbitrum Sepolia testnet
    ArbitrumSepolia,
    /// Arc testnet
    Arc,
}

impl ChainArg {
    pub const fn chain_id(self) -> u64 {
        match self {
            Self::Sepolia => chains::ETHEREUM_SEPOLIA.chain_id,
            Self::BscTestnet => chains::BSC_TESTNET.chain_id,
            Self::Amoy => chains::POLYGON_AMOY.chain_id,
            Self::ArbitrumSepolia => chains::ARBITRUM_SEPOLIA.chain_id,
            Self::Arc => chains::ARC_TESTNET.chain_id,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "arc-bridge")]
#[command(about = "Bridge USDC between Arc and partner testnets over CCTP")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub env: Env,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Bridge USDC (full flow: approve -> burn -> attestation -> mint)
    Bridge {
        /// Source chain to burn on
        #[arg(long = "from")]
        from: ChainArg,
        /// Destination chain to mint on
        #[arg(long = "to")]
        to: ChainArg,
        /// Amount of USDC to bridge (omit to use --all)
        #[arg(short = 'a', long = "amount", conflicts_with = "all")]
        amount: Option<Usdc>,
        /// Bridge the entire USDC balance
        #[arg(long = "all", conflicts_with = "amount")]
        all: bool,
    },

    /// Complete a transfer whose burn confirmed but whose mint did not
    ///
    /// Provide the burn transaction hash; the attestation is fetched and the
    /// mint submitted on the destination chain.
    Recover {
        /// Transaction hash of the burn on the source chain
        #[arg(long = "burn-tx")]
        burn_tx: TxHash,
        /// Chain the burn happened on
        #[arg(long = "from")]
        from: ChainArg,
        /// Chain to mint on
        #[arg(long = "to")]
        to: ChainArg,
    },

    /// Show USDC balances for the signer on every supported chain
    Balances,

    /// Show explorer transaction history for an address
    History {
        /// Address to look up (defaults to the signer)
        #[arg(long)]
        address: Option<Address>,
    },
}

pub async fn run(config: Config, command: Commands) -> anyhow::Result<()> {
    run_command_with_writer(config, command, &mut std::io::stdout()).await
}

async fn run_command_with_writer<W: Write>(
    config: Config,
    command: Commands,
    stdout: &mut W,
) -> anyhow::Result<()> {
    match command {
        Commands::Bridge {
            from,
            to,
            amount,
            all,
        } => {
            let session = Session::new(config.signer, config.rpc_overrides);

            bridge_command(
                stdout,
                session.caller(from.chain_id()).await?,
                session.caller(to.chain_id()).await?,
                AttestationClient::new(config.attestation)?,
                session.signer_address(),
                amount,
                all,
                config.balance_refresh_interval,
            )
            .await?;
        }
        Commands::Recover { burn_tx, from, to } => {
            let session = Session::new(config.signer, config.rpc_overrides);

            recover_command(
                stdout,
                session.caller(from.chain_id()).await?,
                session.caller(to.chain_id()).await?,
                AttestationClient::new(config.attestation)?,
                burn_tx,
            )
            .await?;
        }
        Commands::Balances => {
            let session = Session::new(config.signer, config.rpc_overrides);
            balances_command(stdout, &session).await?;
        }
        Commands::History { address } => {
            let address = address.unwrap_or(config.signer.address());
            let explorer = ExplorerClient::new(config.explorer_api_base)?;
            history_command(stdout, &explorer, address).await?;
        }
    }

    info!("Command completed");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn bridge_command<W: Write>(
    stdout: &mut W,
    source: Arc<dyn ChainCaller>,
    destination: Arc<dyn ChainCaller>,
    attestation: AttestationClient,
    sender: Address,
    amount: Option<Usdc>,
    all: bool,
    refresh_interval: Duration,
) -> anyhow::Result<()> {
    let amount = match (amount, all) {
        (Some(amount), _) => amount,
        (None, true) => {
            let balance = source.usdc_balance(sender).await?;
            Usdc::from_base_units(balance)?
        }
        (None, false) => anyhow::bail!("Provide --amount or --all"),
    };

    let intent = BridgeIntent {
        source_chain_id: source.route().chain_id,
        destination_chain_id: destination.route().chain_id,
        amount,
        sender,
    };
    let source_name = source.route().name;
    let destination_name = destination.route().name;

    writeln!(stdout, "Bridging {amount} USDC: {source_name} -> {destination_name}")?;

    // Balances refresh on the configured interval and immediately after
    // each confirmed transaction.
    let reader = BalanceReader::new(Arc::clone(&source), Arc::clone(&destination), sender);
    let (mut snapshots, refresher) = reader.spawn_refresher(refresh_interval);

    let mut sequencer = BridgeSequencer::new(source, destination, attestation);

    let validated = sequencer.validate(&intent).await?;

    match sequencer.approve_if_needed(&validated).await? {
        Some(hash) => {
            writeln!(stdout, "Approval confirmed: {hash}")?;
            refresher.refresh_now();
        }
        None => writeln!(stdout, "Existing allowance is sufficient, skipping approval")?,
    }

    let burn_tx = sequencer.burn(&validated).await?;
    writeln!(stdout, "Burn confirmed: {burn_tx}")?;
    refresher.refresh_now();

    writeln!(stdout, "Waiting for attestation...")?;
    let record = sequencer.wait_for_attestation(burn_tx).await?;
    writeln!(stdout, "Attestation received")?;

    let mint_tx = sequencer.mint(record).await?;
    writeln!(stdout, "Mint confirmed: {mint_tx}")?;

    // Mark the pre-mint snapshot seen, then wait for the post-mint refresh.
    snapshots.borrow_and_update();
    refresher.refresh_now();
    if snapshots.changed().await.is_ok() {
        let snapshot = *snapshots.borrow();
        writeln!(
            stdout,
            "Balances now: {} USDC on {source_name}, {} USDC on {destination_name}",
            Usdc::from_base_units(snapshot.source_balance)?,
            Usdc::from_base_units(snapshot.destination_balance)?,
        )?;
    }
    writeln!(stdout, "Transfer complete")?;

    Ok(())
}

async fn recover_command<W: Write>(
    stdout: &mut W,
    source: Arc<dyn ChainCaller>,
    destination: Arc<dyn ChainCaller>,
    attestation: AttestationClient,
    burn_tx: TxHash,
) -> anyhow::Result<()> {
    writeln!(stdout, "Recovering transfer from burn {burn_tx}")?;

    let mut sequencer = BridgeSequencer::new(source, destination, attestation);

    writeln!(stdout, "Waiting for attestation...")?;
    let record = sequencer.wait_for_attestation(burn_tx).await?;
    writeln!(stdout, "Attestation received")?;

    let mint_tx = sequencer.mint(record).await?;
    writeln!(stdout, "Mint confirmed: {mint_tx}")?;

    Ok(())
}

async fn balances_command<W: Write>(stdout: &mut W, session: &Session) -> anyhow::Result<()> {
    let owner = session.signer_address();
    writeln!(stdout, "USDC balances for {owner}:")?;

    for route in &SUPPORTED_ROUTES {
        let caller = session.caller(route.chain_id).await?;
        let balance = caller.usdc_balance(owner).await?;
        let amount = Usdc::from_base_units(balance)?;
        writeln!(stdout, "  {:<18} {amount} USDC", route.name)?;
    }

    Ok(())
}

async fn history_command<W: Write>(
    stdout: &mut W,
    explorer: &ExplorerClient,
    address: Address,
) -> anyhow::Result<()> {
    let history = explorer.address_history(&address.to_string()).await;

    if history.is_empty() {
        writeln!(stdout, "No transactions found for {address}")?;
        return Ok(());
    }

    writeln!(stdout, "History for {address}:")?;
    for entry in &history {
        writeln!(
            stdout,
            "  {}  {:<13} {:<22} {:?}",
            entry.hash, entry.category, entry.amount, entry.status
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy::primitives::{U256, address};
    use clap::CommandFactory;
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::attestation::AttestationConfig;
    use crate::caller::mock::MockCaller;
    use crate::chains::{ARC_TESTNET, ETHEREUM_SEPOLIA};

    const SENDER: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn chain_args_map_to_chain_ids() {
        assert_eq!(ChainArg::Sepolia.chain_id(), 11155111);
        assert_eq!(ChainArg::BscTestnet.chain_id(), 97);
        assert_eq!(ChainArg::Amoy.chain_id(), 80002);
        assert_eq!(ChainArg::ArbitrumSepolia.chain_id(), 421614);
        assert_eq!(ChainArg::Arc.chain_id(), 5042002);
    }

    #[test]
    fn amount_and_all_are_mutually_exclusive() {
        let cmd = Cli::command();
        cmd.try_get_matches_from([
            "arc-bridge",
            "--private-key",
            "0x0000000000000000000000000000000000000000000000000000000000000001",
            "bridge",
            "--from",
            "sepolia",
            "--to",
            "arc",
            "--amount",
            "1",
            "--all",
        ])
        .unwrap_err();
    }

    fn attestation_client(server: &MockServer) -> AttestationClient {
        AttestationClient::new(AttestationConfig {
            api_base: server.base_url(),
            poll_interval: Duration::from_millis(1),
            error_retry_interval: Duration::from_millis(1),
            max_attempts: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn bridge_command_reports_every_stage() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path_contains("/v2/messages/0");
            then.status(200).json_body(json!({
                "messages": [{
                    "status": "complete",
                    "message": "0x0102",
                    "attestation": "0xffee"
                }]
            }));
        });

        let source = Arc::new(MockCaller::new(
            &ETHEREUM_SEPOLIA,
            U256::from(500_000_000u64),
            U256::ZERO,
        ));
        let destination = Arc::new(MockCaller::new(&ARC_TESTNET, U256::ZERO, U256::ZERO));

        let mut stdout = Vec::new();
        bridge_command(
            &mut stdout,
            source,
            destination,
            attestation_client(&server),
            SENDER,
            Some("100".parse().unwrap()),
            false,
            Duration::from_millis(5),
        )
        .await
        .unwrap();

        let output = String::from_utf8(stdout).unwrap();
        assert!(output.contains("Bridging 100 USDC: Ethereum Sepolia -> ARC Testnet"));
        assert!(output.contains("Approval confirmed"));
        assert!(output.contains("Burn confirmed"));
        assert!(output.contains("Attestation received"));
        assert!(output.contains("Mint confirmed"));
        assert!(output.contains("Balances now: 500 USDC on Ethereum Sepolia"), "got: {output}");
        assert!(output.contains("Transfer complete"));
    }

    #[tokio::test]
    async fn bridge_all_uses_the_full_balance() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path_contains("/v2/messages/0");
            then.status(200).json_body(json!({
                "messages": [{
                    "status": "complete",
                    "message": "0x0102",
                    "attestation": "0xffee"
                }]
            }));
        });

        let source = Arc::new(MockCaller::new(
            &ETHEREUM_SEPOLIA,
            U256::from(2_500_000u64),
            U256::MAX,
        ));
        let destination = Arc::new(MockCaller::new(&ARC_TESTNET, U256::ZERO, U256::ZERO));

        let mut stdout = Vec::new();
        bridge_command(
            &mut stdout,
            source,
            destination,
            attestation_client(&server),
            SENDER,
            None,
            true,
            Duration::from_millis(5),
        )
        .await
        .unwrap();

        let output = String::from_utf8(stdout).unwrap();
        assert!(output.contains("Bridging 2.5 USDC"), "got: {output}");
    }

    #[tokio::test]
    async fn bridge_without_amount_or_all_fails() {
        let server = MockServer::start_async().await;
        let source = Arc::new(MockCaller::new(&ETHEREUM_SEPOLIA, U256::ZERO, U256::ZERO));
        let destination = Arc::new(MockCaller::new(&ARC_TESTNET, U256::ZERO, U256::ZERO));

        let err = bridge_command(
            &mut Vec::new(),
            source,
            destination,
            attestation_client(&server),
            SENDER,
            None,
            false,
            Duration::from_millis(5),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("--amount or --all"));
    }

    #[tokio::test]
    async fn recover_command_mints_from_burn_hash() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path_contains("/v2/messages/0");
            then.status(200).json_body(json!({
                "messages": [{
                    "status": "complete",
                    "message": "0x0102",
                    "attestation": "0xffee"
                }]
            }));
        });

        let source = Arc::new(MockCaller::new(&ETHEREUM_SEPOLIA, U256::ZERO, U256::ZERO));
        let destination = Arc::new(MockCaller::new(&ARC_TESTNET, U256::ZERO, U256::ZERO));

        let mut stdout = Vec::new();
        recover_command(
            &mut stdout,
            source,
            Arc::clone(&destination) as Arc<dyn ChainCaller>,
            attestation_client(&server),
            TxHash::ZERO,
        )
        .await
        .unwrap();

        assert_eq!(destination.writes().len(), 1);
        let output = String::from_utf8(stdout).unwrap();
        assert!(output.contains("Mint confirmed"));
    }

    #[tokio::test]
    async fn history_command_prints_entries() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).query_param("action", "txlist");
            then.status(200).json_body(json!({
                "status": "1",
                "result": [{
                    "hash": "0xabc",
                    "from": SENDER.to_string(),
                    "to": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
                    "value": "1000000000000000000",
                    "input": "0x",
                    "timeStamp": "1700000000",
                    "blockNumber": "1",
                    "isError": "0",
                    "txreceipt_status": "1",
                    "confirmations": "99",
                }],
            }));
        });
        server.mock(|when, then| {
            when.method(GET).query_param("action", "tokentx");
            then.status(200)
                .json_body(json!({ "status": "1", "result": [] }));
        });

        let explorer = ExplorerClient::new(server.url("/api")).unwrap();
        let mut stdout = Vec::new();
        history_command(&mut stdout, &explorer, SENDER).await.unwrap();

        let output = String::from_utf8(stdout).unwrap();
        assert!(output.contains("0xabc"), "got: {output}");
        assert!(output.contains("send"), "got: {output}");
    }

    #[tokio::test]
    async fn history_command_reports_empty_history() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET);
            then.status(200)
                .json_body(json!({ "status": "0", "result": [] }));
        });

        let explorer = ExplorerClient::new(server.url("/api")).unwrap();
        let mut stdout = Vec::new();
        history_command(&mut stdout, &explorer, SENDER).await.unwrap();

        let output = String::from_utf8(stdout).unwrap();
        assert!(output.contains("No transactions found"));
    }
}
