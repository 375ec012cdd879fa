use std::{str::FromStr, time::Duration};

use rust_decimal::Decimal;
use thiserror::Error;

pub const STARTING_BALANCE_VAR: &str = "FASTPAY_STARTING_BALANCE";
pub const LOCK_TIMEOUT_VAR: &str = "FASTPAY_LOCK_TIMEOUT_MS";
pub const ID_DOMAIN_VAR: &str = "FASTPAY_ID_DOMAIN";
pub const HISTORY_PAGE_SIZE_VAR: &str = "FASTPAY_HISTORY_PAGE_SIZE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{var}` has an invalid value `{value}`")]
    Invalid { var: &'static str, value: String },
    #[error("`FASTPAY_STARTING_BALANCE` must not be negative")]
    NegativeStartingBalance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Balance every new account starts with.
    pub starting_balance: Decimal,
    /// Upper bound on waiting for a single account lock.
    pub lock_timeout: Duration,
    /// Suffix of generated payment ids.
    pub id_domain: String,
    pub history_page_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_balance: Decimal::from(1000),
            lock_timeout: Duration::from_millis(500),
            id_domain: "fastpay".to_string(),
            history_page_size: 50,
        }
    }
}

impl LedgerConfig {
    /// Defaults overlaid with `FASTPAY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(balance) = parse_var::<Decimal>(&lookup, STARTING_BALANCE_VAR)? {
            if balance < Decimal::ZERO {
                return Err(ConfigError::NegativeStartingBalance);
            }
            config.starting_balance = balance;
        }
        if let Some(millis) = parse_var::<u64>(&lookup, LOCK_TIMEOUT_VAR)? {
            config.lock_timeout = Duration::from_millis(millis);
        }
        if let Some(domain) = lookup(ID_DOMAIN_VAR) {
            let domain = domain.trim();
            if domain.is_empty() || domain.contains('@') {
                return Err(ConfigError::Invalid {
                    var: ID_DOMAIN_VAR,
                    value: domain.to_string(),
                });
            }
            config.id_domain = domain.to_string();
        }
        if let Some(size) = parse_var::<usize>(&lookup, HISTORY_PAGE_SIZE_VAR)? {
            if size == 0 {
                return Err(ConfigError::Invalid {
                    var: HISTORY_PAGE_SIZE_VAR,
                    value: size.to_string(),
                });
            }
            config.history_page_size = size;
        }
        Ok(config)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::Invalid { var, value })
}
