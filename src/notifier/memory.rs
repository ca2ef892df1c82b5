//! Notifier kept in process memory. Used when no remote notification
//! service is configured, and to simulate an outage.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::info;

use crate::domain::AccountId;
use crate::notifier::client::{
    Notification, NotificationPreference, NotificationRequest, NotifierClient, NotifierError,
    UpsertPreference,
};

const SUCCEEDED: &str = "SUCCEEDED";
const FAILED: &str = "FAILED";

#[derive(Debug)]
pub struct InMemoryNotifier {
    preferences: DashMap<AccountId, NotificationPreference>,
    history: DashMap<AccountId, Vec<Notification>>,
    online: AtomicBool,
    send_attempts: AtomicUsize,
}

impl Default for InMemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self {
            preferences: DashMap::new(),
            history: DashMap::new(),
            online: AtomicBool::new(true),
            send_attempts: AtomicUsize::new(0),
        }
    }

    /// While offline every call fails as a transport error.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of `send` calls received, successful or not.
    pub fn send_attempts(&self) -> usize {
        self.send_attempts.load(Ordering::SeqCst)
    }

    pub fn sent_to(&self, account_id: AccountId) -> Vec<Notification> {
        self.history
            .get(&account_id)
            .map(|h| h.value().clone())
            .unwrap_or_default()
    }

    fn ensure_online(&self) -> Result<(), NotifierError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(NotifierError::Transport("notifier offline".to_string()))
        }
    }

    fn deliverable(&self, account_id: AccountId) -> bool {
        self.preferences.get(&account_id).is_some_and(|p| {
            p.enabled && p.contact_info.as_deref().is_some_and(|c| !c.trim().is_empty())
        })
    }

    fn not_found(account_id: AccountId) -> NotifierError {
        NotifierError::Status {
            status: 404,
            message: format!("Notification preference for user id [{}] does not exist.", account_id),
        }
    }
}

#[async_trait]
impl NotifierClient for InMemoryNotifier {
    async fn upsert_preference(&self, request: UpsertPreference) -> Result<(), NotifierError> {
        self.ensure_online()?;
        self.preferences.insert(
            request.user_id,
            NotificationPreference {
                id: Some(request.user_id.to_string()),
                channel: request.channel,
                enabled: request.notification_enabled,
                contact_info: request.contact_info,
            },
        );
        Ok(())
    }

    async fn get_preference(
        &self,
        account_id: AccountId,
    ) -> Result<NotificationPreference, NotifierError> {
        self.ensure_online()?;
        self.preferences
            .get(&account_id)
            .map(|p| p.value().clone())
            .ok_or_else(|| Self::not_found(account_id))
    }

    async fn change_preference(
        &self,
        account_id: AccountId,
        enabled: bool,
    ) -> Result<NotificationPreference, NotifierError> {
        self.ensure_online()?;
        let mut preference = self
            .preferences
            .get_mut(&account_id)
            .ok_or_else(|| Self::not_found(account_id))?;
        preference.enabled = enabled;
        Ok(preference.clone())
    }

    async fn send(&self, request: NotificationRequest) -> Result<(), NotifierError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;

        let status = if self.deliverable(request.user_id) {
            SUCCEEDED
        } else {
            FAILED
        };
        info!(account_id = %request.user_id, subject = %request.subject, status, "Notification recorded");

        self.history
            .entry(request.user_id)
            .or_default()
            .push(Notification {
                subject: request.subject,
                body: request.body,
                status: status.to_string(),
                created_on: Some(Utc::now().to_rfc3339()),
            });
        Ok(())
    }

    async fn list_history(&self, account_id: AccountId) -> Result<Vec<Notification>, NotifierError> {
        self.ensure_online()?;
        Ok(self.sent_to(account_id))
    }

    async fn clear_history(&self, account_id: AccountId) -> Result<(), NotifierError> {
        self.ensure_online()?;
        self.history.remove(&account_id);
        Ok(())
    }

    async fn retry_failed(&self, account_id: AccountId) -> Result<(), NotifierError> {
        self.ensure_online()?;
        if !self.deliverable(account_id) {
            return Ok(());
        }
        if let Some(mut history) = self.history.get_mut(&account_id) {
            for notification in history.iter_mut().filter(|n| n.status == FAILED) {
                notification.status = SUCCEEDED.to_string();
            }
        }
        Ok(())
    }
}
