//! # coinplan-wallet — coin selection and unsigned transaction assembly.
//!
//! Turns a snapshot of a wallet's UTXOs into an unsigned transaction
//! skeleton for an external signer: enrichment with confirmation and dust
//! data, strategy-driven coin selection with a fee/selection fixpoint,
//! dust-aware change handling, and optional HD change-address derivation.
//!
//! # Modules
//!
//! - [`error`] — `SpendError` enum
//! - [`enrich`] — Raw UTXOs to selection candidates, balance summary
//! - [`fee`] — Size-based fee estimation
//! - [`policy`] — Selection strategies and per-spend policy
//! - [`coin_selection`] — Strategy engine, manual mode, send-max
//! - [`builder`] — Transaction skeleton assembly
//! - [`change`] — HD change-address resolution
//! - [`keys`] — Seed and reference BLAKE3 address deriver
//! - [`config`] — Layered `SpendConfig`
//! - [`planner`] — Fetch, select, assemble

pub mod builder;
pub mod change;
pub mod coin_selection;
pub mod config;
pub mod enrich;
pub mod error;
pub mod fee;
pub mod keys;
pub mod planner;
pub mod policy;

// Re-exports for convenient access
pub use builder::{OutputKind, SkeletonInput, SkeletonOutput, TransactionAssembler, TransactionSkeleton};
pub use change::HdChangeResolver;
pub use coin_selection::{CoinSelector, SelectionResult};
pub use config::SpendConfig;
pub use enrich::{EnrichedUtxo, UtxoSummary, enrich, summarize};
pub use error::SpendError;
pub use fee::{estimate_fee, estimate_vbytes};
pub use keys::{KeyChain, Seed};
pub use planner::{SpendPlanner, SpendRequest, UtxoSnapshot};
pub use policy::{SelectionPolicy, SelectionStrategy};
