/// Account records and the balance events that are the only way to change them.
pub mod account;

/// Validated request structures built from raw transport bodies.
pub mod command;

/// Ledger entries and lazily paged account history.
pub mod ledger;

/// Repository interfaces for accounts and ledger entries, plus "in memory"
/// implementations.
pub mod store;

/// The transfer engine: ordered per-account locking, balance changes and
/// ledger append as one atomic unit.
pub mod engine;

/// Account creation, lookup and owner authentication.
pub mod service;

pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod ids;
pub mod system;

/// Batch driver used by the binary. Lives in the library so integration
/// tests can run it against in-memory input.
pub mod bin_utils;
