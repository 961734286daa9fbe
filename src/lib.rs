//! Headless CCTP bridge for moving USDC between Arc and partner testnets.
//!
//! The library drives the full four-stage transfer (approve, burn,
//! attestation, mint) through [`sequencer::BridgeSequencer`], with supporting
//! modules for chain configuration, amount handling, balance polling, and
//! explorer history.

pub mod amount;
pub mod attestation;
mod bindings;
pub mod caller;
pub mod chains;
pub mod cli;
pub mod env;
pub mod explorer;
pub mod intent;
pub mod reader;
pub mod sequencer;
pub mod session;
pub mod task;

pub use env::setup_tracing;
