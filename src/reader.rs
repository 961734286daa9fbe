//! Periodic balance and allowance reads for a bridge route.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use tokio::sync::{Notify, watch};
use tracing::warn;

use crate::caller::{CallerError, ChainCaller};
use crate::task::PollTask;

/// One consistent read of everything the bridge form displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BalanceSnapshot {
    /// USDC balance on the source chain, in base units.
    pub source_balance: U256,
    /// USDC balance on the destination chain, in base units.
    pub destination_balance: U256,
    /// Allowance granted to the source chain's TokenMessenger.
    pub allowance: U256,
}

/// Reads balances for one owner across a source/destination pair.
#[derive(Clone)]
pub struct BalanceReader {
    source: Arc<dyn ChainCaller>,
    destination: Arc<dyn ChainCaller>,
    owner: Address,
}

/// Controls a running refresher loop: request an out-of-band refresh or
/// stop it. Dropping the handle also stops the loop.
pub struct RefreshHandle {
    trigger: Arc<Notify>,
    task: PollTask<()>,
}

impl RefreshHandle {
    /// Wakes the loop for an immediate refresh, without waiting out the
    /// interval. Called after each confirmed transaction so the published
    /// snapshot reflects it right away.
    pub fn refresh_now(&self) {
        self.trigger.notify_one();
    }

    pub fn cancel(self) {
        self.task.cancel();
    }
}

impl BalanceReader {
    pub fn new(
        source: Arc<dyn ChainCaller>,
        destination: Arc<dyn ChainCaller>,
        owner: Address,
    ) -> Self {
        Self {
            source,
            destination,
            owner,
        }
    }

    /// Fetches a fresh snapshot. The three reads run concurrently.
    pub async fn fetch(&self) -> Result<BalanceSnapshot, CallerError> {
        let (source_balance, destination_balance, allowance) = tokio::try_join!(
            self.source.usdc_balance(self.owner),
            self.destination.usdc_balance(self.owner),
            self.source.token_messenger_allowance(self.owner),
        )?;

        Ok(BalanceSnapshot {
            source_balance,
            destination_balance,
            allowance,
        })
    }

    /// Spawns a loop that refreshes the snapshot on an interval, publishing
    /// each successful read to the returned watch channel. The returned
    /// [`RefreshHandle`] can wake the loop early for an immediate refresh.
    /// Failed reads keep the previous snapshot and are retried on the next
    /// wakeup.
    pub fn spawn_refresher(
        self,
        interval: Duration,
    ) -> (watch::Receiver<BalanceSnapshot>, RefreshHandle) {
        let (sender, receiver) = watch::channel(BalanceSnapshot::default());
        let trigger = Arc::new(Notify::new());
        let wakeup = Arc::clone(&trigger);

        let task = PollTask::wrap(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = wakeup.notified() => {}
                }
                match self.fetch().await {
                    Ok(snapshot) => {
                        if sender.send(snapshot).is_err() {
                            // All receivers gone, nobody is watching.
                            return;
                        }
                    }
                    Err(error) => {
                        warn!(%error, "Balance refresh failed, keeping previous snapshot");
                    }
                }
            }
        }));

        (receiver, RefreshHandle { trigger, task })
    }
}
