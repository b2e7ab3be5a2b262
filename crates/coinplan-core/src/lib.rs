//! # coinplan-core
//! Foundation types, constants, and capability traits for coinplan.

pub mod address;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
pub mod utxo_source;
