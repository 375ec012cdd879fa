use uuid::Uuid;

use crate::account::PaymentId;

/// Opaque unique-string generator for new accounts.
///
/// Uniqueness is not required of the generator itself; the store rejects
/// collisions and account creation asks for another id.
pub trait PaymentIdGenerator: Send + Sync {
    fn generate(&self) -> PaymentId;
}

/// `<8 hex digits>@<domain>`, e.g. `9f86d081@fastpay`.
#[derive(Debug, Clone)]
pub struct RandomPaymentIds {
    domain: String,
}

impl RandomPaymentIds {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }
}

impl PaymentIdGenerator for RandomPaymentIds {
    fn generate(&self) -> PaymentId {
        let random = Uuid::new_v4().simple().to_string();
        PaymentId::new(format!("{}@{}", &random[..8], self.domain))
    }
}
