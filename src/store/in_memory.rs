use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};

use crate::{
    account::{Account, PaymentId},
    ledger::{EntryId, HistoryCursor, LedgerEntry, NewEntry, Page},
};

use super::{AccountCell, AccountStore, LedgerStore, StoreError};

#[derive(Default)]
struct AccountIndex {
    accounts: HashMap<PaymentId, AccountCell>,
    by_email: HashMap<String, PaymentId>,
}

#[derive(Default)]
pub struct InMemoryAccountStore {
    index: RwLock<AccountIndex>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn insert(&self, account: Account) -> Result<(), StoreError> {
        let mut index = self.index.write();
        if index.by_email.contains_key(&account.owner().email) {
            return Err(StoreError::DuplicateOwner);
        }
        let email = account.owner().email.clone();
        let id = account.id().clone();
        match index.accounts.entry(id.clone()) {
            Entry::Occupied(_) => return Err(StoreError::DuplicateId(id)),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Mutex::new(account)));
            }
        }
        index.by_email.insert(email, id);
        Ok(())
    }

    fn cell(&self, id: &PaymentId) -> Result<Option<AccountCell>, StoreError> {
        Ok(self.index.read().accounts.get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<PaymentId>, StoreError> {
        Ok(self.index.read().by_email.get(email).cloned())
    }

    fn ids(&self) -> Result<Vec<PaymentId>, StoreError> {
        Ok(self.index.read().accounts.keys().cloned().collect())
    }
}

#[derive(Default)]
struct LedgerLog {
    entries: Vec<LedgerEntry>,
    // per participant, ascending by cursor; clock order makes the insert an append
    by_account: HashMap<PaymentId, Vec<(HistoryCursor, usize)>>,
}

#[derive(Default)]
pub struct InMemoryLedgerStore {
    log: RwLock<LedgerLog>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.log.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(&self, entry: NewEntry) -> Result<LedgerEntry, StoreError> {
        let mut log = self.log.write();
        let position = log.entries.len();
        let entry = LedgerEntry::assign(position as EntryId + 1, entry);
        let cursor = entry.cursor();
        let mut participants = vec![entry.sender()];
        if entry.receiver() != entry.sender() {
            participants.push(entry.receiver());
        }
        for participant in participants {
            let index = log.by_account.entry(participant.clone()).or_default();
            let at = index.partition_point(|(key, _)| *key < cursor);
            index.insert(at, (cursor, position));
        }
        log.entries.push(entry.clone());
        Ok(entry)
    }

    fn list_for_account(
        &self,
        account: &PaymentId,
        after: Option<HistoryCursor>,
        limit: usize,
    ) -> Result<Page, StoreError> {
        let log = self.log.read();
        let Some(positions) = log.by_account.get(account) else {
            return Ok(Page::default());
        };
        let end = match after {
            Some(cursor) => positions.partition_point(|(key, _)| *key < cursor),
            None => positions.len(),
        };
        let start = end.saturating_sub(limit);
        let entries: Vec<LedgerEntry> = positions[start..end]
            .iter()
            .rev()
            .map(|&(_, position)| log.entries[position].clone())
            .collect();
        let next = if start > 0 {
            entries.last().map(LedgerEntry::cursor)
        } else {
            None
        };
        Ok(Page { entries, next })
    }
}
