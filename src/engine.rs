use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use parking_lot::MutexGuard;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    account::{Account, AccountError, PaymentId},
    clock::{Clock, SystemClock},
    command::{CommandError, TransferCommand},
    config::LedgerConfig,
    error::ErrorKind,
    ledger::{History, LedgerEntry, NewEntry},
    store::{AccountCell, AccountStore, LedgerStore, StoreError},
};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Account `{0}` not found")]
    AccountNotFound(PaymentId),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error("Timed out waiting for account `{0}`")]
    LockTimeout(PaymentId),
    #[error("Transfer was cancelled before commit")]
    Cancelled,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Command(err) => err.kind(),
            TransferError::AccountNotFound(_) => ErrorKind::NotFound,
            TransferError::Account(err) => err.kind(),
            TransferError::LockTimeout(_) | TransferError::Cancelled => ErrorKind::Resource,
            TransferError::Store(err) => err.kind(),
        }
    }
}

/// Caller-side cancellation flag. Only honoured up to the commit point.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Moves funds between accounts and records every move in the ledger.
///
/// A transfer locks both accounts in ascending id order, re-reads them under
/// the locks, appends the ledger entry and only then applies both balance
/// changes. Appending is the commit point: a failed append leaves balances
/// untouched and nothing after it can fail.
///
/// Repeating a call repeats the transfer; there is no idempotency key.
pub struct TransferEngine<A, L> {
    accounts: Arc<A>,
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
    lock_timeout: Duration,
    history_page_size: usize,
}

impl<A, L> TransferEngine<A, L>
where
    A: AccountStore,
    L: LedgerStore,
{
    pub fn new(accounts: Arc<A>, ledger: Arc<L>, config: &LedgerConfig) -> Self {
        Self {
            accounts,
            ledger,
            clock: Arc::new(SystemClock),
            lock_timeout: config.lock_timeout,
            history_page_size: config.history_page_size,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn transfer(
        &self,
        sender: &PaymentId,
        receiver: &PaymentId,
        amount: Decimal,
    ) -> Result<LedgerEntry, TransferError> {
        let command = TransferCommand::new(sender.clone(), receiver.clone(), amount)?;
        self.execute(&command)
    }

    pub fn execute(&self, command: &TransferCommand) -> Result<LedgerEntry, TransferError> {
        self.execute_cancellable(command, &CancelToken::new())
    }

    pub fn execute_cancellable(
        &self,
        command: &TransferCommand,
        cancel: &CancelToken,
    ) -> Result<LedgerEntry, TransferError> {
        let sender_id = command.sender();
        let receiver_id = command.receiver();

        let sender_cell = self.cell(sender_id)?;
        let receiver_cell = self.cell(receiver_id)?;
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        let sender_first = sender_id < receiver_id;
        let ((first_id, first_cell), (second_id, second_cell)) = if sender_first {
            ((sender_id, &sender_cell), (receiver_id, &receiver_cell))
        } else {
            ((receiver_id, &receiver_cell), (sender_id, &sender_cell))
        };
        let mut first = self.lock(first_id, first_cell)?;
        let mut second = self.lock(second_id, second_cell)?;

        if cancel.is_cancelled() {
            warn!(sender = %sender_id, receiver = %receiver_id, "transfer cancelled before commit");
            return Err(TransferError::Cancelled);
        }

        let (sender, receiver): (&mut Account, &mut Account) = if sender_first {
            (&mut *first, &mut *second)
        } else {
            (&mut *second, &mut *first)
        };
        let debit = sender.handle_debit(command.amount())?;
        let credit = receiver.handle_credit(command.amount())?;

        let entry = self.ledger.append(NewEntry {
            sender: sender_id.clone(),
            receiver: receiver_id.clone(),
            amount: command.amount(),
            timestamp: self.clock.now(),
        })?;
        sender.apply(&debit);
        receiver.apply(&credit);

        drop(second);
        drop(first);
        info!(entry = entry.id(), sender = %sender_id, receiver = %receiver_id, "transfer committed");
        Ok(entry)
    }

    /// Newest-first history of `account`. Unknown accounts have an empty history.
    pub fn history(&self, account: &PaymentId) -> History<'_, L> {
        History::new(self.ledger.as_ref(), account.clone(), self.history_page_size)
    }

    /// Reads the given accounts while holding all of their locks at once, so
    /// the result never shows one side of a transfer without the other.
    /// Results follow the order of `ids`.
    pub fn snapshot(&self, ids: &[PaymentId]) -> Result<Vec<Account>, TransferError> {
        let mut cells = BTreeMap::new();
        for id in ids {
            if !cells.contains_key(id) {
                cells.insert(id.clone(), self.cell(id)?);
            }
        }
        // BTreeMap iterates in ascending id order, the same order transfers lock in
        let mut guards = Vec::with_capacity(cells.len());
        for (id, cell) in &cells {
            guards.push((id, self.lock(id, cell)?));
        }
        let accounts: BTreeMap<&PaymentId, Account> = guards
            .iter()
            .map(|(id, guard)| (*id, (**guard).clone()))
            .collect();
        while let Some(guard) = guards.pop() {
            drop(guard);
        }

        Ok(ids
            .iter()
            .filter_map(|id| accounts.get(id).cloned())
            .collect())
    }

    /// Sum of all balances, read as one consistent snapshot.
    pub fn total_balance(&self) -> Result<Decimal, TransferError> {
        let ids = self.accounts.ids()?;
        Ok(self
            .snapshot(&ids)?
            .iter()
            .map(Account::balance)
            .sum())
    }

    fn cell(&self, id: &PaymentId) -> Result<AccountCell, TransferError> {
        self.accounts
            .cell(id)?
            .ok_or_else(|| TransferError::AccountNotFound(id.clone()))
    }

    fn lock<'c>(
        &self,
        id: &PaymentId,
        cell: &'c AccountCell,
    ) -> Result<MutexGuard<'c, Account>, TransferError> {
        match cell.try_lock_for(self.lock_timeout) {
            Some(guard) => {
                debug!(account = %id, "account locked");
                Ok(guard)
            }
            None => {
                warn!(account = %id, "timed out waiting for account lock");
                Err(TransferError::LockTimeout(id.clone()))
            }
        }
    }
}
