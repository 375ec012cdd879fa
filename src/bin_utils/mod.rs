//! Drives the ledger from a CSV operation script and prints the resulting
//! accounts. Stands in for the transport layer, which is not part of this crate.

use std::io::{Read, Write};

use anyhow::Result;
use thiserror::Error;

use crate::{
    account::PaymentId,
    command::{SignupRequest, TransferCommand, TransferRequest, normalize_email},
    config::LedgerConfig,
    engine::TransferError,
    error::ErrorKind,
    ledger::LedgerEntry,
    service::ServiceError,
    store::{AccountStore, LedgerStore},
    system::PaymentSystem,
};
use csv_parser::{CsvOperationParser, Operation, OperationKind};
use csv_printer::print_accounts;
pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Malformed row: {0}")]
    Parse(#[from] csv::Error),
    #[error(transparent)]
    Account(#[from] ServiceError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl DriverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::Parse(_) => ErrorKind::Validation,
            DriverError::Account(err) => err.kind(),
            DriverError::Transfer(err) => err.kind(),
        }
    }
}

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub config: LedgerConfig,
    pub error_printer: Box<dyn FnMut(u64, DriverError)>,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvOperationParser::new(self.input);
        let system = PaymentSystem::in_memory(&self.config);
        let mut opened = Vec::new();

        for (line, row) in parser {
            let result = row
                .map_err(DriverError::from)
                .and_then(|operation| match operation.kind {
                    OperationKind::Signup => signup(&system, operation).map(|id| opened.push(id)),
                    OperationKind::Transfer => transfer(&system, operation).map(|_| ()),
                });
            if let Err(err) = result {
                (self.error_printer)(line, err);
            }
        }

        let mut accounts = system.transfers.snapshot(&opened)?;
        accounts.sort_by(|a, b| a.owner().email.cmp(&b.owner().email));
        print_accounts(self.output, &accounts)
    }
}

fn signup<A, L>(system: &PaymentSystem<A, L>, operation: Operation) -> Result<PaymentId, DriverError>
where
    A: AccountStore,
    L: LedgerStore,
{
    let created = system.accounts.create_account(SignupRequest {
        name: operation.name,
        email: operation.email,
        password: operation.password,
    })?;
    Ok(created.id)
}

fn transfer<A, L>(
    system: &PaymentSystem<A, L>,
    operation: Operation,
) -> Result<LedgerEntry, DriverError>
where
    A: AccountStore,
    L: LedgerStore,
{
    let sender_email = operation.email.as_deref().unwrap_or_default();
    let sender = system.accounts.authenticate(
        sender_email,
        operation.password.as_deref().unwrap_or_default(),
    )?;
    // amount and self-transfer are rejected before the receiver is looked up
    let amount = TransferCommand::validate_amount(operation.amount).map_err(TransferError::from)?;
    let receiver = match operation.counterparty.as_deref() {
        Some(email) if normalize_email(email) == normalize_email(sender_email) => {
            Some(sender.id.to_string())
        }
        Some(email) => Some(system.accounts.find_by_email(email)?.id.to_string()),
        None => None,
    };
    let command = TransferCommand::parse(TransferRequest {
        sender: Some(sender.id.to_string()),
        receiver,
        amount: Some(amount),
    })
    .map_err(TransferError::from)?;
    Ok(system.transfers.execute(&command)?)
}
