//! Deposit and purchase workflow.
//!
//! Each invocation runs VALIDATING -> MUTATING -> NOTIFYING, or ends in
//! REJECTED straight from VALIDATING. Validation and mutation happen under
//! the account's exclusive lock; the lock is released before the notifier is
//! called. The mutation is applied to a staged copy of the account and only
//! written back once the ledger append succeeded, so balance, owned resources,
//! ledger and cart either all change or none do.

use std::collections::HashMap;

use tracing::{error, info, warn};

use crate::domain::{
    Account, AccountEvent, AccountId, Advisory, Cart, CartItem, Catalog, EntryKind, Error, Ledger,
    LedgerEntry, Money, Outcome, Rejection, ResourceId,
};
use crate::notifier::DispatchAdapter;
use crate::registry::AccountRegistry;

const DEPOSIT_SUCCEEDED_SUBJECT: &str = "Your deposit has been successful!";
const DEPOSIT_FAILED_SUBJECT: &str = "Something went wrong!";
const PURCHASE_SUBJECT: &str = "Thank you for the purchase!";

pub struct Engine<L, C>
where
    L: Ledger,
    C: Catalog,
{
    registry: AccountRegistry,
    ledger: L,
    catalog: C,
    notifier: DispatchAdapter,
}

impl<L, C> Engine<L, C>
where
    L: Ledger,
    C: Catalog,
{
    pub fn new(ledger: L, catalog: C, notifier: DispatchAdapter) -> Self {
        Self {
            registry: AccountRegistry::new(),
            ledger,
            catalog,
            notifier,
        }
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn notifier(&self) -> &DispatchAdapter {
        &self.notifier
    }

    /// Rebuilds accounts from what `ledger` already holds: lifecycle events
    /// first, then the successful entries oldest first. Carts start empty.
    pub fn restore(ledger: L, catalog: C, notifier: DispatchAdapter) -> Result<Self, Error> {
        let engine = Self::new(ledger, catalog, notifier);

        let mut accounts: HashMap<AccountId, Account> = HashMap::new();
        for event in engine.ledger.account_events()? {
            match event {
                AccountEvent::Registered {
                    account_id,
                    username,
                    created_at,
                } => {
                    accounts.insert(account_id, Account::with_id(account_id, username, created_at));
                }
                AccountEvent::StatusChanged { account_id, active } => {
                    accounts
                        .get_mut(&account_id)
                        .ok_or(Error::AccountNotFound(account_id))?
                        .active = active;
                }
            }
        }

        let mut entries = engine.ledger.list_all()?;
        entries.reverse();
        for entry in entries.iter().filter(|e| e.is_successful()) {
            let account = accounts.get_mut(&entry.owner_id).ok_or_else(|| {
                Error::Persistence(format!(
                    "entry {} belongs to unknown account {}",
                    entry.id, entry.owner_id
                ))
            })?;
            match entry.kind {
                EntryKind::Deposit => account.credit(entry.amount)?,
                EntryKind::Purchase => {
                    account
                        .debit(entry.amount)
                        .map_err(|e| Error::Persistence(format!("entry {}: {}", entry.id, e)))?;
                    account.grant_resources(entry.resources.iter().copied());
                }
            }
        }

        let restored = accounts.len();
        for account in accounts.into_values() {
            engine.registry.restore(account)?;
        }
        info!(accounts = restored, entries = entries.len(), "Accounts restored from ledger");
        Ok(engine)
    }

    /// Creates the account, then stores a disabled default notification
    /// preference. A notifier failure does not undo the registration.
    pub async fn register(&self, username: &str) -> Result<AccountId, Error> {
        let account_id = self
            .registry
            .register_with(username, |account| {
                self.ledger.record_account(account.registered_event())
            })?;

        if let Err(e) = self
            .notifier
            .upsert_preference(account_id, false, None)
            .await
        {
            warn!(account_id = %account_id, error = %e, "Default notification preference not saved");
        }
        Ok(account_id)
    }

    pub async fn set_active(&self, account_id: AccountId, active: bool) -> Result<(), Error> {
        let mut record = self.registry.lock(account_id).await?;
        self.ledger
            .record_account(AccountEvent::StatusChanged { account_id, active })?;
        record.account.active = active;
        drop(record);

        self.registry.invalidate_snapshot();
        info!(account_id = %account_id, active, "Account status changed");
        Ok(())
    }

    /// Adds a catalog resource to the cart at its current price.
    pub async fn add_to_cart(
        &self,
        account_id: AccountId,
        resource_id: ResourceId,
    ) -> Result<CartItem, Error> {
        let item = self
            .catalog
            .item(resource_id)
            .ok_or(Error::UnknownResource(resource_id))?;

        let mut record = self.registry.lock(account_id).await?;
        if record.account.owns(&resource_id) {
            return Err(Error::AlreadyOwned(resource_id));
        }

        let cart_item = CartItem {
            resource_id,
            title: item.title,
            locked_price: item.price,
        };
        record.cart.add(cart_item.clone())?;
        Ok(cart_item)
    }

    pub async fn remove_from_cart(
        &self,
        account_id: AccountId,
        resource_id: ResourceId,
    ) -> Result<CartItem, Error> {
        let mut record = self.registry.lock(account_id).await?;
        record.cart.remove(&resource_id)
    }

    pub async fn clear_cart(&self, account_id: AccountId) -> Result<(), Error> {
        let mut record = self.registry.lock(account_id).await?;
        record.cart.clear();
        Ok(())
    }

    pub async fn cart(&self, account_id: AccountId) -> Result<Cart, Error> {
        self.registry.cart(account_id).await
    }

    /// Sum of the locked prices currently in the cart.
    pub async fn cart_total(&self, account_id: AccountId) -> Result<Money, Error> {
        self.registry.cart(account_id).await?.total()
    }

    pub fn history(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, Error> {
        self.ledger.list_for_account(account_id)
    }

    pub fn search_ledger(&self, query: &str) -> Result<Vec<LedgerEntry>, Error> {
        self.ledger.search(query, &self.registry)
    }

    fn append(&self, entry: &LedgerEntry) -> Result<(), Error> {
        self.ledger.append(entry.clone()).map(|_| ()).map_err(|e| {
            error!(entry = %entry, error = %e, "Ledger append failed, nothing committed");
            e
        })
    }

    /// Tops up the balance. Amount bounds are the caller's concern; only a
    /// zero amount is refused here.
    pub async fn deposit(&self, account_id: AccountId, amount: Money) -> Result<Outcome, Error> {
        if amount.is_zero() {
            return Err(Error::NonPositiveAmount(amount));
        }

        let mut record = self.registry.lock(account_id).await?;
        let username = record.account.username.clone();

        if !record.account.active {
            let entry = LedgerEntry::failed(account_id, amount, EntryKind::Deposit);
            self.append(&entry)?;
            drop(record);
            warn!(account_id = %account_id, amount = %amount, entry_id = %entry.id, "Deposit rejected, account inactive");

            let body = format!(
                "We apologize, {}! Funds weren't added to your account's balance. Please, try again later.",
                username
            );
            let advisory = self
                .notifier
                .dispatch(account_id, DEPOSIT_FAILED_SUBJECT, &body)
                .await
                .err()
                .map(Advisory::DepositNotificationFailed);

            return Ok(Outcome::Rejected {
                entry,
                reason: Rejection::AccountInactive,
                advisory,
            });
        }

        let mut staged = record.account.clone();
        staged.credit(amount)?;
        let entry = LedgerEntry::successful(account_id, amount, EntryKind::Deposit);
        self.append(&entry)?;
        record.account = staged;
        let balance = record.account.balance;
        drop(record);

        self.registry.invalidate_snapshot();
        info!(account_id = %account_id, amount = %amount, balance = %balance, entry_id = %entry.id, "Deposit committed");

        let body = format!(
            "Thank you, {}! Funds were added to your account's balance.",
            username
        );
        let advisory = self
            .notifier
            .dispatch(account_id, DEPOSIT_SUCCEEDED_SUBJECT, &body)
            .await
            .err()
            .map(Advisory::DepositNotificationFailed);

        Ok(Outcome::Committed { entry, advisory })
    }

    /// Buys everything in the cart at its locked prices.
    ///
    /// An empty cart is refused with `Error::EmptyCart` before any ledger
    /// entry is written. Insufficient funds record a FAILED entry and send no
    /// notification.
    pub async fn purchase(&self, account_id: AccountId) -> Result<Outcome, Error> {
        let mut record = self.registry.lock(account_id).await?;

        if record.cart.is_empty() {
            return Err(Error::EmptyCart(account_id));
        }

        let total = record.cart.total()?;
        let available = record.account.balance;
        if total > available {
            let entry = LedgerEntry::failed(account_id, total, EntryKind::Purchase);
            self.append(&entry)?;
            drop(record);
            warn!(account_id = %account_id, total = %total, available = %available, entry_id = %entry.id, "Purchase rejected, insufficient funds");

            return Ok(Outcome::Rejected {
                entry,
                reason: Rejection::InsufficientFunds {
                    required: total,
                    available,
                },
                advisory: None,
            });
        }

        let mut staged = record.account.clone();
        staged
            .debit(total)
            .map_err(|e| Error::FailedPurchase(e.to_string()))?;
        let resources: Vec<ResourceId> = record.cart.resource_ids().collect();
        let granted = staged.grant_resources(resources.iter().copied());
        let titles = record.cart.titles();

        let entry =
            LedgerEntry::successful(account_id, total, EntryKind::Purchase).with_resources(resources);
        self.append(&entry)?;
        record.account = staged;
        record.cart.clear();
        let balance = record.account.balance;
        drop(record);

        self.registry.invalidate_snapshot();
        info!(account_id = %account_id, total = %total, balance = %balance, granted, entry_id = %entry.id, "Purchase committed");

        let advisory = self
            .notifier
            .dispatch(account_id, PURCHASE_SUBJECT, &purchase_body(&titles))
            .await
            .err()
            .map(Advisory::PurchaseNotificationFailure);
        if let Some(advisory) = &advisory {
            error!(account_id = %account_id, entry_id = %entry.id, advisory = %advisory, "Purchase committed without confirmation");
        }

        Ok(Outcome::Committed { entry, advisory })
    }
}

fn purchase_body(titles: &[String]) -> String {
    let mut body = String::from("Thank you! Games were added to your library!\n");
    for title in titles {
        body.push_str("- ");
        body.push_str(title);
        body.push('\n');
    }
    body
}
