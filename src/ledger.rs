use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    account::PaymentId,
    store::{LedgerStore, StoreError},
};

pub type EntryId = u64;

/// Completed transfer, before the store assigned its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub sender: PaymentId,
    pub receiver: PaymentId,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Immutable record of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    id: EntryId,
    sender: PaymentId,
    receiver: PaymentId,
    amount: Decimal,
    timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    pub(crate) fn assign(id: EntryId, entry: NewEntry) -> Self {
        Self {
            id,
            sender: entry.sender,
            receiver: entry.receiver,
            amount: entry.amount,
            timestamp: entry.timestamp,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn sender(&self) -> &PaymentId {
        &self.sender
    }

    pub fn receiver(&self) -> &PaymentId {
        &self.receiver
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn cursor(&self) -> HistoryCursor {
        HistoryCursor {
            timestamp: self.timestamp,
            id: self.id,
        }
    }
}

/// Position in a history listing. Listings are ordered by `(timestamp, id)`
/// descending, so a cursor selects everything strictly older than itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HistoryCursor {
    pub timestamp: DateTime<Utc>,
    pub id: EntryId,
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub entries: Vec<LedgerEntry>,
    /// Present when more entries may follow.
    pub next: Option<HistoryCursor>,
}

/// Lazily paged, newest-first history of one account.
///
/// Pages are fetched on demand; entries committed after iteration started
/// with a later timestamp are not picked up. Call `history` again to restart.
pub struct History<'a, L: ?Sized> {
    store: &'a L,
    account: PaymentId,
    page_size: usize,
    buffer: VecDeque<LedgerEntry>,
    cursor: Option<HistoryCursor>,
    exhausted: bool,
}

impl<'a, L> History<'a, L>
where
    L: LedgerStore + ?Sized,
{
    pub fn new(store: &'a L, account: PaymentId, page_size: usize) -> Self {
        Self {
            store,
            account,
            page_size: page_size.max(1),
            buffer: VecDeque::new(),
            cursor: None,
            exhausted: false,
        }
    }
}

impl<L> Iterator for History<'_, L>
where
    L: LedgerStore + ?Sized,
{
    type Item = Result<LedgerEntry, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(entry) = self.buffer.pop_front() {
            return Some(Ok(entry));
        }
        if self.exhausted {
            return None;
        }
        match self
            .store
            .list_for_account(&self.account, self.cursor, self.page_size)
        {
            Ok(page) => {
                self.exhausted = page.next.is_none();
                self.cursor = page.next;
                self.buffer.extend(page.entries);
                self.buffer.pop_front().map(Ok)
            }
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }
}
