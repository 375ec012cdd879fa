use std::{sync::Arc, time::Duration};

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    account::{Account, AccountError, Owner, PaymentId},
    command::{CommandError, SignupCommand, SignupRequest, normalize_email},
    config::LedgerConfig,
    credentials::CredentialVerifier,
    error::ErrorKind,
    ids::PaymentIdGenerator,
    store::{AccountStore, StoreError},
};

/// How many generated ids may collide before account creation gives up.
const MAX_ID_ATTEMPTS: usize = 8;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error("An account is already registered for this owner")]
    DuplicateOwner,
    #[error("Account `{0}` not found")]
    AccountNotFound(PaymentId),
    #[error("No account is registered for this owner")]
    UnknownOwner,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Timed out waiting for account `{0}`")]
    LockTimeout(PaymentId),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateOwner => ServiceError::DuplicateOwner,
            err => ServiceError::Store(err),
        }
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Command(err) => err.kind(),
            ServiceError::Account(err) => err.kind(),
            ServiceError::DuplicateOwner => ErrorKind::Duplicate,
            ServiceError::AccountNotFound(_) | ServiceError::UnknownOwner => ErrorKind::NotFound,
            ServiceError::InvalidCredentials => ErrorKind::Unauthorized,
            ServiceError::LockTimeout(_) => ErrorKind::Resource,
            ServiceError::Store(err) => err.kind(),
        }
    }
}

/// What signup and login hand back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub id: PaymentId,
    pub balance: Decimal,
}

/// Public view of an account. Carries no credential material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountView {
    pub id: PaymentId,
    pub owner: Owner,
    pub balance: Decimal,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id().clone(),
            owner: account.owner().clone(),
            balance: account.balance(),
        }
    }
}

/// Account creation and lookup. Never changes a balance.
pub struct AccountService<A> {
    accounts: Arc<A>,
    credentials: Arc<dyn CredentialVerifier>,
    ids: Arc<dyn PaymentIdGenerator>,
    starting_balance: Decimal,
    lock_timeout: Duration,
}

impl<A> AccountService<A>
where
    A: AccountStore,
{
    pub fn new(
        accounts: Arc<A>,
        credentials: Arc<dyn CredentialVerifier>,
        ids: Arc<dyn PaymentIdGenerator>,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            accounts,
            credentials,
            ids,
            starting_balance: config.starting_balance,
            lock_timeout: config.lock_timeout,
        }
    }

    pub fn create_account(&self, request: SignupRequest) -> Result<AccountSummary, ServiceError> {
        let SignupCommand { owner, password } = SignupCommand::parse(request)?;
        if self.accounts.find_by_email(&owner.email)?.is_some() {
            return Err(ServiceError::DuplicateOwner);
        }

        // a visible account always has credentials
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.generate();
            let account = Account::open(id.clone(), owner.clone(), self.starting_balance)?;
            if !self.credentials.register(&id, &password) {
                warn!(account = %id, "generated payment id already has credentials");
                continue;
            }
            match self.accounts.insert(account) {
                Ok(()) => {
                    info!(account = %id, "account created");
                    return Ok(AccountSummary {
                        id,
                        balance: self.starting_balance,
                    });
                }
                Err(StoreError::DuplicateId(id)) => {
                    self.credentials.revoke(&id);
                    warn!(account = %id, "generated payment id already taken");
                }
                Err(err) => {
                    self.credentials.revoke(&id);
                    return Err(err.into());
                }
            }
        }
        Err(StoreError::IdSpaceExhausted.into())
    }

    pub fn get_account(&self, id: &PaymentId) -> Result<AccountView, ServiceError> {
        let cell = self
            .accounts
            .cell(id)?
            .ok_or_else(|| ServiceError::AccountNotFound(id.clone()))?;
        let account = cell
            .try_lock_for(self.lock_timeout)
            .ok_or_else(|| ServiceError::LockTimeout(id.clone()))?
            .clone();
        Ok(account.into())
    }

    pub fn find_by_email(&self, email: &str) -> Result<AccountView, ServiceError> {
        let id = self
            .accounts
            .find_by_email(&normalize_email(email))?
            .ok_or(ServiceError::UnknownOwner)?;
        self.get_account(&id)
    }

    /// Resolves an owner's credentials to their account. Unknown owners and
    /// wrong secrets are indistinguishable to the caller.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<AccountSummary, ServiceError> {
        let Some(id) = self.accounts.find_by_email(&normalize_email(email))? else {
            return Err(ServiceError::InvalidCredentials);
        };
        if !self.credentials.verify(&id, password) {
            return Err(ServiceError::InvalidCredentials);
        }
        let view = self.get_account(&id)?;
        Ok(AccountSummary {
            id: view.id,
            balance: view.balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::{
        credentials::InMemoryCredentials,
        ids::RandomPaymentIds,
        store::{AccountCell, in_memory::InMemoryAccountStore},
    };

    use super::*;

    /// Hands out the same id for the first `collisions + 1` calls.
    struct CollidingIds {
        calls: AtomicUsize,
        collisions: usize,
    }

    impl PaymentIdGenerator for CollidingIds {
        fn generate(&self) -> PaymentId {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call <= self.collisions {
                PaymentId::from("00000000@fastpay")
            } else {
                PaymentId::new(format!("{call:08x}@fastpay"))
            }
        }
    }

    /// Rejects every insert as if the backing store went away.
    struct UnavailableAccounts;

    impl AccountStore for UnavailableAccounts {
        fn insert(&self, _account: Account) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("accounts offline".to_string()))
        }

        fn cell(&self, _id: &PaymentId) -> Result<Option<AccountCell>, StoreError> {
            Ok(None)
        }

        fn find_by_email(&self, _email: &str) -> Result<Option<PaymentId>, StoreError> {
            Ok(None)
        }

        fn ids(&self) -> Result<Vec<PaymentId>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn signup(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    fn service_with(ids: Arc<dyn PaymentIdGenerator>) -> AccountService<InMemoryAccountStore> {
        AccountService::new(
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(InMemoryCredentials::new()),
            ids,
            &LedgerConfig::default(),
        )
    }

    fn service() -> AccountService<InMemoryAccountStore> {
        service_with(Arc::new(RandomPaymentIds::new("fastpay")))
    }

    #[test]
    fn create_and_get_account() {
        let service = service();
        let created = service
            .create_account(signup("Alice", "alice@example.com", "pw"))
            .unwrap();
        assert_eq!(created.balance, Decimal::from(1000));
        assert!(created.id.as_str().ends_with("@fastpay"));

        let view = service.get_account(&created.id).unwrap();
        assert_eq!(view.id, created.id);
        assert_eq!(view.owner.name, "Alice");
        assert_eq!(view.balance, Decimal::from(1000));

        let by_email = service.find_by_email("ALICE@example.com").unwrap();
        assert_eq!(by_email, view);
    }

    #[test]
    fn duplicate_owner_rejected() {
        let service = service();
        service
            .create_account(signup("Alice", "alice@example.com", "pw"))
            .unwrap();
        let err = service
            .create_account(signup("Alice Again", " Alice@Example.com", "other"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateOwner));
        assert_eq!(err.kind(), ErrorKind::Duplicate);
    }

    #[test]
    fn invalid_signup_rejected() {
        let err = service()
            .create_account(SignupRequest {
                password: None,
                ..signup("Alice", "alice@example.com", "")
            })
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Command(CommandError::MissingField { field: "password" })
        ));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn unknown_account() {
        let service = service();
        let err = service
            .get_account(&PaymentId::from("deadbeef@fastpay"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::AccountNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = service.find_by_email("nobody@example.com").unwrap_err();
        assert!(matches!(err, ServiceError::UnknownOwner));
    }

    #[test]
    fn retry_on_id_collision() {
        let service = service_with(Arc::new(CollidingIds {
            calls: AtomicUsize::new(0),
            collisions: 2,
        }));
        let first = service
            .create_account(signup("A", "a@example.com", "pw"))
            .unwrap();
        assert_eq!(first.id.as_str(), "00000000@fastpay");
        let second = service
            .create_account(signup("B", "b@example.com", "pw"))
            .unwrap();
        assert_ne!(second.id, first.id);
    }

    #[test]
    fn give_up_when_ids_keep_colliding() {
        let service = service_with(Arc::new(CollidingIds {
            calls: AtomicUsize::new(0),
            collisions: usize::MAX - 1,
        }));
        service
            .create_account(signup("A", "a@example.com", "pw"))
            .unwrap();
        let err = service
            .create_account(signup("B", "b@example.com", "pw"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::IdSpaceExhausted)));
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(service.find_by_email("b@example.com").is_err());
    }

    #[test]
    fn authenticate_owner() {
        let service = service();
        let created = service
            .create_account(signup("Alice", "alice@example.com", "s3cret"))
            .unwrap();

        let summary = service.authenticate("Alice@example.com", "s3cret").unwrap();
        assert_eq!(summary, created);

        let wrong_password = service
            .authenticate("alice@example.com", "guess")
            .unwrap_err();
        let unknown_owner = service.authenticate("bob@example.com", "s3cret").unwrap_err();
        assert!(matches!(wrong_password, ServiceError::InvalidCredentials));
        assert!(matches!(unknown_owner, ServiceError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_owner.to_string());
        assert_eq!(wrong_password.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn skip_ids_that_already_have_credentials() {
        let credentials = Arc::new(InMemoryCredentials::new());
        assert!(credentials.register(&PaymentId::from("00000000@fastpay"), "taken"));
        let service = AccountService::new(
            Arc::new(InMemoryAccountStore::new()),
            credentials.clone(),
            Arc::new(CollidingIds {
                calls: AtomicUsize::new(0),
                collisions: 0,
            }),
            &LedgerConfig::default(),
        );

        let created = service
            .create_account(signup("A", "a@example.com", "pw"))
            .unwrap();
        assert_ne!(created.id.as_str(), "00000000@fastpay");
        assert!(credentials.verify(&PaymentId::from("00000000@fastpay"), "taken"));
        assert_eq!(service.authenticate("a@example.com", "pw").unwrap(), created);
    }

    #[test]
    fn failed_insert_leaves_no_credentials() {
        let credentials = Arc::new(InMemoryCredentials::new());
        let service = AccountService::new(
            Arc::new(UnavailableAccounts),
            credentials.clone(),
            Arc::new(CollidingIds {
                calls: AtomicUsize::new(0),
                collisions: 0,
            }),
            &LedgerConfig::default(),
        );

        let err = service
            .create_account(signup("A", "a@example.com", "pw"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::Unavailable(_))));
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(!credentials.verify(&PaymentId::from("00000000@fastpay"), "pw"));
    }

    #[test]
    fn negative_starting_balance_rejected() {
        let service = AccountService::new(
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(InMemoryCredentials::new()),
            Arc::new(RandomPaymentIds::new("fastpay")),
            &LedgerConfig {
                starting_balance: Decimal::NEGATIVE_ONE,
                ..LedgerConfig::default()
            },
        );
        let err = service
            .create_account(signup("A", "a@example.com", "pw"))
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Account(AccountError::NegativeStartingBalance)
        ));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
