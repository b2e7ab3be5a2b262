//! Property and scenario test suite for coinplan.
//!
//! Integration tests live under `tests/`; [`helpers`] builds UTXO sets and
//! snapshots shared between them.

pub mod helpers;
