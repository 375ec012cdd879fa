use std::io::Write;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::account::Account;

/// Listing row. Credentials never reach the output.
#[derive(Debug, Serialize)]
struct AccountRow<'a> {
    id: &'a str,
    name: &'a str,
    email: &'a str,
    balance: Decimal,
}

impl<'a> From<&'a Account> for AccountRow<'a> {
    fn from(account: &'a Account) -> Self {
        Self {
            id: account.id().as_str(),
            name: &account.owner().name,
            email: &account.owner().email,
            balance: account.balance(),
        }
    }
}

/// Writes `accounts` as `id,name,email,balance`, in the order given.
pub fn print_accounts<W: Write>(output: W, accounts: &[Account]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    for account in accounts {
        writer
            .serialize(AccountRow::from(account))
            .with_context(|| format!("writing account `{}`", account.id()))?;
    }
    writer.flush().context("flushing account listing")?;
    Ok(())
}
