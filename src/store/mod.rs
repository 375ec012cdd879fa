use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::{
    account::{Account, PaymentId},
    error::ErrorKind,
    ledger::{HistoryCursor, LedgerEntry, NewEntry, Page},
};

pub mod in_memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account `{0}` already exists")]
    DuplicateId(PaymentId),
    #[error("An account is already registered for this owner")]
    DuplicateOwner,
    #[error("No unused payment id could be generated")]
    IdSpaceExhausted,
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::DuplicateId(_) | StoreError::DuplicateOwner => ErrorKind::Duplicate,
            StoreError::IdSpaceExhausted | StoreError::Unavailable(_) => ErrorKind::Resource,
        }
    }
}

/// Per-account lock guarding the only mutable shared state: the balance.
pub type AccountCell = Arc<Mutex<Account>>;

/// Repository of account records.
///
/// The store hands out lock cells; the transfer engine decides the order in
/// which they are locked.
pub trait AccountStore: Send + Sync {
    /// Fails with `DuplicateId` or `DuplicateOwner` without storing anything.
    fn insert(&self, account: Account) -> Result<(), StoreError>;

    fn cell(&self, id: &PaymentId) -> Result<Option<AccountCell>, StoreError>;

    /// Looks up by normalized email.
    fn find_by_email(&self, email: &str) -> Result<Option<PaymentId>, StoreError>;

    fn ids(&self) -> Result<Vec<PaymentId>, StoreError>;
}

/// Append-only store of completed transfers.
pub trait LedgerStore: Send + Sync {
    fn append(&self, entry: NewEntry) -> Result<LedgerEntry, StoreError>;

    /// Entries where `account` is sender or receiver, newest first: ordered by
    /// `(timestamp, id)` descending, so entries with equal timestamps list the
    /// later insertion (higher id) first. With `after`, only entries ordered
    /// strictly after that cursor are returned.
    fn list_for_account(
        &self,
        account: &PaymentId,
        after: Option<HistoryCursor>,
        limit: usize,
    ) -> Result<Page, StoreError>;
}
