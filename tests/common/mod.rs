#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use purchase_engine::domain::{AccountEvent, AccountId, EntryId, Error, Ledger, LedgerEntry, Money, ResourceId};
use purchase_engine::notifier::{
    DispatchAdapter, InMemoryNotifier, Notification, NotificationPreference, NotificationRequest,
    NotifierClient, NotifierError, UpsertPreference,
};
use purchase_engine::{CatalogItem, Engine, InMemoryCatalog, InMemoryLedger};

/// Ledger whose store can be switched off to simulate an outage.
#[derive(Debug, Default)]
pub struct FlakyLedger {
    inner: InMemoryLedger,
    failing: AtomicBool,
}

impl FlakyLedger {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Ledger for FlakyLedger {
    fn append(&self, entry: LedgerEntry) -> Result<EntryId, Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Persistence("store unavailable".to_string()));
        }
        self.inner.append(entry)
    }

    fn list_for_account(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, Error> {
        self.inner.list_for_account(account_id)
    }

    fn list_all(&self) -> Result<Vec<LedgerEntry>, Error> {
        self.inner.list_all()
    }

    fn record_account(&self, event: AccountEvent) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Persistence("store unavailable".to_string()));
        }
        self.inner.record_account(event)
    }
}

/// Notifier that answers `send` only after a delay.
pub struct SlowNotifier {
    pub delay: Duration,
    pub inner: InMemoryNotifier,
}

#[async_trait]
impl NotifierClient for SlowNotifier {
    async fn upsert_preference(&self, request: UpsertPreference) -> Result<(), NotifierError> {
        self.inner.upsert_preference(request).await
    }

    async fn get_preference(
        &self,
        account_id: AccountId,
    ) -> Result<NotificationPreference, NotifierError> {
        self.inner.get_preference(account_id).await
    }

    async fn change_preference(
        &self,
        account_id: AccountId,
        enabled: bool,
    ) -> Result<NotificationPreference, NotifierError> {
        self.inner.change_preference(account_id, enabled).await
    }

    async fn send(&self, request: NotificationRequest) -> Result<(), NotifierError> {
        tokio::time::sleep(self.delay).await;
        self.inner.send(request).await
    }

    async fn list_history(&self, account_id: AccountId) -> Result<Vec<Notification>, NotifierError> {
        self.inner.list_history(account_id).await
    }

    async fn clear_history(&self, account_id: AccountId) -> Result<(), NotifierError> {
        self.inner.clear_history(account_id).await
    }

    async fn retry_failed(&self, account_id: AccountId) -> Result<(), NotifierError> {
        self.inner.retry_failed(account_id).await
    }
}

pub type TestEngine = Engine<FlakyLedger, InMemoryCatalog>;

pub struct Harness {
    pub engine: Arc<TestEngine>,
    pub notifier: Arc<InMemoryNotifier>,
}

pub fn money(s: &str) -> Money {
    s.parse().unwrap()
}

pub fn harness() -> Harness {
    let notifier = Arc::new(InMemoryNotifier::new());
    let adapter = DispatchAdapter::new(notifier.clone(), Duration::from_secs(2));
    let engine = Engine::new(FlakyLedger::default(), InMemoryCatalog::new(), adapter);
    Harness {
        engine: Arc::new(engine),
        notifier,
    }
}

pub fn engine_with_client(client: Arc<dyn NotifierClient>, timeout: Duration) -> TestEngine {
    Engine::new(
        FlakyLedger::default(),
        InMemoryCatalog::new(),
        DispatchAdapter::new(client, timeout),
    )
}

pub fn stock(engine: &TestEngine, title: &str, price: &str) -> ResourceId {
    let id = ResourceId::new();
    engine.catalog().insert(CatalogItem {
        id,
        title: title.to_string(),
        price: money(price),
    });
    id
}

/// Sets the balance directly, bypassing the ledger, the way fixtures do.
pub async fn seed_balance(engine: &TestEngine, account_id: AccountId, balance: &str) {
    let mut record = engine.registry().lock(account_id).await.unwrap();
    record.account.balance = money(balance);
}

pub async fn balance(engine: &TestEngine, account_id: AccountId) -> Money {
    engine.registry().account(account_id).await.unwrap().balance
}
