use std::collections::HashMap;
use std::time::Duration;

use alloy::signers::local::PrivateKeySigner;
use clap::Parser;
use thiserror::Error;
use tracing::Level;

use crate::attestation::AttestationConfig;
use crate::{attestation, explorer};

#[derive(clap::ValueEnum, Debug, Clone)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        (&log_level).into()
    }
}

impl From<&LogLevel> for Level {
    fn from(log_level: &LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Invalid RPC override {entry:?}, expected chain_id=url")]
    InvalidRpcOverride { entry: String },
}

/// Everything the binary reads from flags or environment variables.
#[derive(Parser, Debug, Clone)]
pub struct Env {
    /// Hex private key used to sign transactions on every chain.
    #[clap(long, env, hide_env_values = true)]
    private_key: PrivateKeySigner,
    #[clap(long, env, default_value = "info")]
    log_level: LogLevel,
    /// Base URL of the Circle attestation API.
    #[clap(long, env, default_value = attestation::DEFAULT_API_BASE)]
    attestation_api_base: String,
    /// Seconds between attestation polls.
    #[clap(long, env, default_value = "5")]
    attestation_poll_interval: u64,
    /// Seconds to wait after a transient attestation fetch error.
    #[clap(long, env, default_value = "10")]
    attestation_error_retry_interval: u64,
    /// Maximum attestation polls before giving up.
    #[clap(long, env, default_value = "120")]
    attestation_max_attempts: usize,
    /// Base URL of the Arcscan-style explorer API.
    #[clap(long, env, default_value = explorer::DEFAULT_API_BASE)]
    explorer_api_base: String,
    /// Per-chain RPC replacements as comma-separated `chain_id=url` pairs.
    #[clap(long, env, value_delimiter = ',')]
    rpc_override: Vec<String>,
    /// Seconds between balance refreshes.
    #[clap(long, env, default_value = "10")]
    balance_refresh_interval: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub signer: PrivateKeySigner,
    pub log_level: LogLevel,
    pub attestation: AttestationConfig,
    pub explorer_api_base: String,
    pub rpc_overrides: HashMap<u64, String>,
    pub balance_refresh_interval: Duration,
}

impl Env {
    pub fn into_config(self) -> Result<Config, EnvError> {
        let mut rpc_overrides = HashMap::new();
        for entry in &self.rpc_override {
            let (chain_id, url) = entry
                .split_once('=')
                .ok_or_else(|| EnvError::InvalidRpcOverride {
                    entry: entry.clone(),
                })?;
            let chain_id = chain_id
                .trim()
                .parse()
                .map_err(|_| EnvError::InvalidRpcOverride {
                    entry: entry.clone(),
                })?;
            rpc_overrides.insert(chain_id, url.trim().to_string());
        }

        Ok(Config {
            signer: self.private_key,
            log_level: self.log_level,
            attestation: AttestationConfig {
                api_base: self.attestation_api_base,
                poll_interval: Duration::from_secs(self.attestation_poll_interval),
                error_retry_interval: Duration::from_secs(self.attestation_error_retry_interval),
                max_attempts: self.attestation_max_attempts,
            },
            explorer_api_base: self.explorer_api_base,
            rpc_overrides,
            balance_refresh_interval: Duration::from_secs(self.balance_refresh_interval),
        })
    }
}

pub fn setup_tracing(log_level: &LogLevel) {
    let level: Level = log_level.into();
    let default_filter = format!("arc_bridge={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
