use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::error::ErrorKind;

/// Opaque, globally unique account address (the "payment id").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaymentId(String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaymentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEventKind {
    Debited,
    Credited,
}

/// Validated balance change. Applying it cannot fail.
#[derive(Debug, Clone, Copy)]
pub struct BalanceEvent {
    amount: Decimal,
    kind: BalanceEventKind,
}

impl BalanceEvent {
    pub fn kind(&self) -> BalanceEventKind {
        self.kind
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Balance cannot hold the credited amount")]
    BalanceOverflow,
    #[error("Starting balance must not be negative")]
    NegativeStartingBalance,
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccountError::InsufficientFunds => ErrorKind::Conflict,
            AccountError::BalanceOverflow => ErrorKind::Conflict,
            AccountError::NegativeStartingBalance => ErrorKind::Validation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: PaymentId,
    owner: Owner,
    balance: Decimal,
}

impl Account {
    pub fn open(
        id: PaymentId,
        owner: Owner,
        starting_balance: Decimal,
    ) -> Result<Self, AccountError> {
        if starting_balance < Decimal::ZERO {
            return Err(AccountError::NegativeStartingBalance);
        }
        Ok(Self {
            id,
            owner,
            balance: starting_balance,
        })
    }

    pub fn id(&self) -> &PaymentId {
        &self.id
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Balance is only ever changed through events produced by the `handle_*`
    /// methods, so it stays non-negative.
    pub(crate) fn apply(&mut self, event: &BalanceEvent) {
        match event.kind {
            BalanceEventKind::Debited => {
                self.balance -= event.amount;
            }
            BalanceEventKind::Credited => {
                self.balance += event.amount;
            }
        }
    }

    pub fn handle_debit(&self, amount: Decimal) -> Result<BalanceEvent, AccountError> {
        if self.balance >= amount {
            Ok(BalanceEvent {
                amount,
                kind: BalanceEventKind::Debited,
            })
        } else {
            Err(AccountError::InsufficientFunds)
        }
    }

    pub fn handle_credit(&self, amount: Decimal) -> Result<BalanceEvent, AccountError> {
        match self.balance.checked_add(amount) {
            Some(_) => Ok(BalanceEvent {
                amount,
                kind: BalanceEventKind::Credited,
            }),
            None => Err(AccountError::BalanceOverflow),
        }
    }
}
