//! Account registry.
//!
//! Every account lives behind its own async mutex together with its cart.
//! Holding that guard is the only way to mutate balance, owned resources or
//! cart contents, which serializes concurrent operations on one account while
//! leaving other accounts independent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use crate::domain::{Account, AccountId, Cart, Error, OwnerDirectory};

#[derive(Debug)]
pub struct AccountRecord {
    pub account: Account,
    pub cart: Cart,
}

pub type AccountGuard = OwnedMutexGuard<AccountRecord>;

#[derive(Debug, Default)]
pub struct AccountRegistry {
    accounts: DashMap<AccountId, Arc<Mutex<AccountRecord>>>,
    usernames: DashMap<String, AccountId>,
    names: DashMap<AccountId, String>,
    // Read-through listing cache; never consulted for balance decisions.
    snapshot: RwLock<Option<Arc<Vec<Account>>>>,
    generation: AtomicU64,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, username: &str) -> Result<AccountId, Error> {
        self.register_with(username, |_| Ok(()))
    }

    /// Registers under a fresh id. `persist` runs while the username is
    /// reserved and before the account becomes visible; an error from it
    /// leaves the registry untouched.
    pub fn register_with<F>(&self, username: &str, persist: F) -> Result<AccountId, Error>
    where
        F: FnOnce(&Account) -> Result<(), Error>,
    {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::BlankUsername);
        }

        match self.usernames.entry(username.to_string()) {
            Entry::Occupied(_) => Err(Error::UsernameTaken(username.to_string())),
            Entry::Vacant(slot) => {
                let account = Account::new(username);
                persist(&account)?;
                let id = account.id;
                self.insert(account);
                slot.insert(id);
                info!(account_id = %id, username, "Registered account");
                Ok(id)
            }
        }
    }

    /// Puts back an account rebuilt from stored history.
    pub fn restore(&self, account: Account) -> Result<(), Error> {
        match self.usernames.entry(account.username.clone()) {
            Entry::Occupied(_) => Err(Error::UsernameTaken(account.username)),
            Entry::Vacant(slot) => {
                slot.insert(account.id);
                self.insert(account);
                Ok(())
            }
        }
    }

    fn insert(&self, account: Account) {
        self.names.insert(account.id, account.username.clone());
        self.accounts.insert(
            account.id,
            Arc::new(Mutex::new(AccountRecord {
                account,
                cart: Cart::new(),
            })),
        );
        self.invalidate_snapshot();
    }

    pub fn find_by_username(&self, username: &str) -> Option<AccountId> {
        self.usernames.get(username.trim()).map(|id| *id.value())
    }

    /// Waits for exclusive access to the account and its cart.
    pub async fn lock(&self, account_id: AccountId) -> Result<AccountGuard, Error> {
        let record = self
            .accounts
            .get(&account_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(Error::AccountNotFound(account_id))?;
        Ok(record.lock_owned().await)
    }

    pub async fn account(&self, account_id: AccountId) -> Result<Account, Error> {
        Ok(self.lock(account_id).await?.account.clone())
    }

    pub async fn cart(&self, account_id: AccountId) -> Result<Cart, Error> {
        Ok(self.lock(account_id).await?.cart.clone())
    }

    /// All accounts ordered by username.
    pub async fn all_accounts(&self) -> Arc<Vec<Account>> {
        if let Ok(cached) = self.snapshot.read() {
            if let Some(accounts) = cached.as_ref() {
                return Arc::clone(accounts);
            }
        }

        let generation = self.generation.load(Ordering::Acquire);
        let records: Vec<Arc<Mutex<AccountRecord>>> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut accounts = Vec::with_capacity(records.len());
        for record in records {
            accounts.push(record.lock().await.account.clone());
        }
        accounts.sort_by(|a, b| a.username.cmp(&b.username));
        let accounts = Arc::new(accounts);

        if let Ok(mut cached) = self.snapshot.write() {
            // A commit raced with the rebuild; serve it but do not cache it.
            if self.generation.load(Ordering::Acquire) == generation {
                *cached = Some(Arc::clone(&accounts));
            }
        }
        accounts
    }

    pub fn invalidate_snapshot(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Ok(mut cached) = self.snapshot.write() {
            *cached = None;
        }
    }
}

impl OwnerDirectory for AccountRegistry {
    fn display_name(&self, account_id: AccountId) -> Option<String> {
        self.names.get(&account_id).map(|name| name.value().clone())
    }
}
