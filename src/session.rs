//! A signed-in bridge session: one signer, lazily-connected per-chain
//! callers.
//!
//! Nothing touches the network at construction. The first `caller()` for a
//! chain builds a wallet-backed provider for it; later calls get the cached
//! caller, so "switching chains" is just a map lookup. Chains outside the
//! route table are rejected without connecting anywhere.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::caller::{ChainCaller, EvmCaller};
use crate::chains;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to connect to {chain} RPC at {url}: {source}")]
    Connect {
        chain: &'static str,
        url: String,
        #[source]
        source: alloy::transports::TransportError,
    },
    #[error("Chain id {chain_id} is not a supported route")]
    UnsupportedChain { chain_id: u64 },
}

/// Wallet-backed access to the supported chains, connected on demand.
pub struct Session {
    signer_address: Address,
    wallet: EthereumWallet,
    rpc_overrides: HashMap<u64, String>,
    callers: Mutex<HashMap<u64, Arc<EvmCaller>>>,
}

impl Session {
    /// Builds a session for the signer. No connections are made here.
    ///
    /// `rpc_overrides` maps chain ids to replacement RPC URLs; chains not in
    /// the map use the route's default endpoint.
    pub fn new(signer: PrivateKeySigner, rpc_overrides: HashMap<u64, String>) -> Self {
        let signer_address = signer.address();
        Self {
            signer_address,
            wallet: EthereumWallet::from(signer),
            rpc_overrides,
            callers: Mutex::new(HashMap::new()),
        }
    }

    pub fn signer_address(&self) -> Address {
        self.signer_address
    }

    /// The caller for a chain, connecting on first use and cached after.
    pub async fn caller(&self, chain_id: u64) -> Result<Arc<dyn ChainCaller>, SessionError> {
        let route =
            chains::route(chain_id).ok_or(SessionError::UnsupportedChain { chain_id })?;

        let mut callers = self.callers.lock().await;
        if let Some(caller) = callers.get(&chain_id) {
            return Ok(Arc::clone(caller) as Arc<dyn ChainCaller>);
        }

        let url = self
            .rpc_overrides
            .get(&chain_id)
            .map_or(route.rpc_url, String::as_str);

        let provider = ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .connect(url)
            .await
            .map_err(|source| SessionError::Connect {
                chain: route.short_name,
                url: url.to_string(),
                source,
            })?;

        info!(chain = route.short_name, url, "Connected");
        let caller = Arc::new(EvmCaller::new(route, provider.erased()));
        callers.insert(chain_id, Arc::clone(&caller));

        Ok(caller)
    }
}
