//! Seam to the credential collaborator. The ledger only needs to know which
//! account an authenticated caller owns; storing and checking secrets is
//! somebody else's job.

use std::collections::{HashMap, hash_map::Entry};

use parking_lot::RwLock;

use crate::account::PaymentId;

pub trait CredentialVerifier: Send + Sync {
    /// Claims `account` for `secret`. Returns `false`, leaving the stored
    /// secret alone, when the account already has one.
    fn register(&self, account: &PaymentId, secret: &str) -> bool;

    fn revoke(&self, account: &PaymentId);

    fn verify(&self, account: &PaymentId, secret: &str) -> bool;
}

/// Keeps secrets in memory. Meant for tests and the batch driver only.
#[derive(Default)]
pub struct InMemoryCredentials {
    secrets: RwLock<HashMap<PaymentId, String>>,
}

impl InMemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialVerifier for InMemoryCredentials {
    fn register(&self, account: &PaymentId, secret: &str) -> bool {
        match self.secrets.write().entry(account.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(secret.to_string());
                true
            }
        }
    }

    fn revoke(&self, account: &PaymentId) {
        self.secrets.write().remove(account);
    }

    fn verify(&self, account: &PaymentId, secret: &str) -> bool {
        let secrets = self.secrets.read();
        let Some(stored) = secrets.get(account) else {
            return false;
        };
        // compare every byte so the result does not leak the mismatch position
        stored.len() == secret.len()
            && stored
                .bytes()
                .zip(secret.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}
