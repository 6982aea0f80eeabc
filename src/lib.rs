//! Custodial wallet engine for chat-embedded crypto assistants.
//!
//! The engine executes parsed chat intents against an EVM chain: wallet
//! custody with envelope-encrypted keys, balance snapshots, native and
//! ERC-20 transfers, router swaps, and background settlement monitoring.
//! [`orchestrator::WalletOrchestrator`] is the entry point; everything else
//! hangs off it.
//!
//! Layering, top to bottom:
//!
//! - [`orchestrator`] owns a session and dispatches [`intent::WalletIntent`]s
//! - [`transfer`], [`swap`], [`balances`], [`monitor`], [`prices`] implement
//!   the individual operations
//! - [`keys`] and [`oracle`] handle signing material, [`store`] persistence
//! - [`chain`] is the single JSON-RPC boundary; no other module talks to
//!   the node
//!
//! Nothing here renders chat. The embedding layer turns user text into a
//! [`intent::WalletIntent`] and presents the reply strings and
//! [`activity::ActivityEvent`]s this crate produces.

pub mod activity;
pub mod balances;
pub mod chain;
pub mod config;
pub mod error;
pub mod intent;
pub mod keys;
pub mod monitor;
pub mod oracle;
pub mod orchestrator;
pub mod prices;
pub mod registry;
pub mod state;
pub mod store;
pub mod swap;
pub mod transfer;

pub use config::Config;
pub use error::{Error, Result};
pub use intent::{SendEntities, SwapEntities, WalletIntent};
pub use orchestrator::{SessionIdentity, WalletOrchestrator};
