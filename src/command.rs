use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    account::{Owner, PaymentId},
    error::ErrorKind,
};

/// Raw signup body as it arrives from the transport layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Raw transfer body as it arrives from the transport layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferRequest {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct SignupCommand {
    pub owner: Owner,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommand {
    sender: PaymentId,
    receiver: PaymentId,
    amount: Decimal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("`{field}` is required")]
    MissingField { field: &'static str },
    #[error("`email` is not a valid address")]
    InvalidEmail,
    #[error("Amount is required for a transfer")]
    AmountRequired,
    #[error("Amount must be greater than zero")]
    InvalidAmount,
    #[error("Sender and receiver must be different accounts")]
    SelfTransfer,
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Normalized form used for the one-account-per-owner check.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required(field: &'static str, value: Option<String>) -> Result<String, CommandError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CommandError::MissingField { field }),
    }
}

impl SignupCommand {
    pub fn parse(request: SignupRequest) -> Result<Self, CommandError> {
        let name = required("name", request.name)?.trim().to_string();
        let email = normalize_email(&required("email", request.email)?);
        let password = required("password", request.password)?;

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(CommandError::InvalidEmail),
        }

        Ok(Self {
            owner: Owner { name, email },
            password,
        })
    }
}

impl TransferCommand {
    /// Checks, in order: amount is positive, then sender differs from receiver.
    /// Account existence and funds are checked by the engine under lock.
    pub fn new(
        sender: PaymentId,
        receiver: PaymentId,
        amount: Decimal,
    ) -> Result<Self, CommandError> {
        let amount = Self::validate_amount(Some(amount))?;
        if sender == receiver {
            return Err(CommandError::SelfTransfer);
        }
        Ok(Self {
            sender,
            receiver,
            amount,
        })
    }

    pub fn parse(request: TransferRequest) -> Result<Self, CommandError> {
        let sender = required("sender", request.sender)?;
        let receiver = required("receiver", request.receiver)?;
        let amount = Self::validate_amount(request.amount)?;
        Self::new(
            PaymentId::new(sender.trim()),
            PaymentId::new(receiver.trim()),
            amount,
        )
    }

    /// Amount check on its own, for callers that must reject a bad amount
    /// before they can resolve both accounts.
    pub fn validate_amount(amount: Option<Decimal>) -> Result<Decimal, CommandError> {
        match amount {
            None => Err(CommandError::AmountRequired),
            Some(amount) if amount <= Decimal::ZERO => Err(CommandError::InvalidAmount),
            Some(amount) => Ok(amount),
        }
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
}
