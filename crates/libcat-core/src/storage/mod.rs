//! Storage layer
//!
//! Thin gateway over SQLite: connections, transactions and lock hints.
//! The catalog engine owns all SQL; this layer only decides how it runs.

pub mod gateway;

pub use gateway::{run_transaction, Gateway, TxMode};
