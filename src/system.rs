use std::sync::Arc;

use crate::{
    config::LedgerConfig,
    credentials::InMemoryCredentials,
    engine::TransferEngine,
    ids::RandomPaymentIds,
    service::AccountService,
    store::{
        AccountStore, LedgerStore,
        in_memory::{InMemoryAccountStore, InMemoryLedgerStore},
    },
};

/// Account service and transfer engine wired to the same stores.
pub struct PaymentSystem<A, L> {
    pub accounts: AccountService<A>,
    pub transfers: TransferEngine<A, L>,
}

impl<A, L> PaymentSystem<A, L>
where
    A: AccountStore,
    L: LedgerStore,
{
    pub fn new(accounts: AccountService<A>, transfers: TransferEngine<A, L>) -> Self {
        Self {
            accounts,
            transfers,
        }
    }
}

impl PaymentSystem<InMemoryAccountStore, InMemoryLedgerStore> {
    pub fn in_memory(config: &LedgerConfig) -> Self {
        let account_store = Arc::new(InMemoryAccountStore::new());
        let ledger_store = Arc::new(InMemoryLedgerStore::new());
        Self::new(
            AccountService::new(
                account_store.clone(),
                Arc::new(InMemoryCredentials::new()),
                Arc::new(RandomPaymentIds::new(config.id_domain.clone())),
                config,
            ),
            TransferEngine::new(account_store, ledger_store, config),
        )
    }
}
