//! The only path from the workflow to the notifier.
//!
//! `dispatch` is called strictly after a local commit. Whatever goes wrong
//! inside it is logged here and handed back as `DispatchFailed`; it is
//! never retried and never unwinds the committed state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::{AccountId, DispatchFailed};
use crate::notifier::client::{
    Notification, NotificationPreference, NotificationRequest, NotifierClient, NotifierError,
    UpsertPreference,
};

pub const EMAIL_CHANNEL: &str = "EMAIL";

/// Failure of a pass-through call to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    /// Transport failure, timeout or server-side error.
    #[error("Notification service unavailable: {0}")]
    Unavailable(String),

    /// The notifier understood the request and refused it.
    #[error("Notification service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Contact info is required to enable notifications")]
    ContactInfoRequired,
}

impl From<NotifierError> for NotificationError {
    fn from(e: NotifierError) -> Self {
        match e {
            NotifierError::Status { status, message } if (400..500).contains(&status) => {
                NotificationError::Rejected { status, message }
            }
            other => NotificationError::Unavailable(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct DispatchAdapter {
    client: Arc<dyn NotifierClient>,
    timeout: Duration,
}

impl DispatchAdapter {
    pub fn new(client: Arc<dyn NotifierClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn dispatch(
        &self,
        account_id: AccountId,
        subject: &str,
        body: &str,
    ) -> Result<(), DispatchFailed> {
        let request = NotificationRequest {
            user_id: account_id,
            subject: subject.to_string(),
            body: body.to_string(),
        };

        let reason = match tokio::time::timeout(self.timeout, self.client.send(request)).await {
            Ok(Ok(())) => {
                debug!(account_id = %account_id, subject, "Notification dispatched");
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("no response within {}ms", self.timeout.as_millis()),
        };

        warn!(account_id = %account_id, subject, reason = %reason, "Notification dispatch failed");
        Err(DispatchFailed { account_id, reason })
    }

    async fn call<T, F>(
        &self,
        operation: &'static str,
        account_id: AccountId,
        request: F,
    ) -> Result<T, NotificationError>
    where
        F: Future<Output = Result<T, NotifierError>>,
    {
        let result = match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result.map_err(NotificationError::from),
            Err(_) => Err(NotificationError::Unavailable(NotifierError::Timeout.to_string())),
        };

        if let Err(e) = &result {
            warn!(account_id = %account_id, operation, error = %e, "Notifier call failed");
        }
        result
    }

    /// Enabling requires contact info; it is checked before any remote call.
    pub async fn upsert_preference(
        &self,
        account_id: AccountId,
        enabled: bool,
        contact_info: Option<String>,
    ) -> Result<(), NotificationError> {
        let contact_info = contact_info.filter(|c| !c.trim().is_empty());
        if enabled && contact_info.is_none() {
            return Err(NotificationError::ContactInfoRequired);
        }

        let request = UpsertPreference {
            user_id: account_id,
            notification_enabled: enabled,
            channel: EMAIL_CHANNEL.to_string(),
            contact_info,
        };
        self.call("upsert_preference", account_id, self.client.upsert_preference(request))
            .await
    }

    pub async fn get_preference(
        &self,
        account_id: AccountId,
    ) -> Result<NotificationPreference, NotificationError> {
        self.call("get_preference", account_id, self.client.get_preference(account_id))
            .await
    }

    /// Toggles delivery. The stored preference must already carry contact
    /// info; it is fetched first and nothing is changed when it is blank.
    pub async fn change_preference(
        &self,
        account_id: AccountId,
        enabled: bool,
    ) -> Result<NotificationPreference, NotificationError> {
        let stored = self.get_preference(account_id).await?;
        if stored
            .contact_info
            .as_deref()
            .is_none_or(|c| c.trim().is_empty())
        {
            return Err(NotificationError::ContactInfoRequired);
        }
        self.call(
            "change_preference",
            account_id,
            self.client.change_preference(account_id, enabled),
        )
        .await
    }

    pub async fn history(&self, account_id: AccountId) -> Result<Vec<Notification>, NotificationError> {
        self.call("list_history", account_id, self.client.list_history(account_id))
            .await
    }

    pub async fn clear_history(&self, account_id: AccountId) -> Result<(), NotificationError> {
        self.call("clear_history", account_id, self.client.clear_history(account_id))
            .await
    }

    pub async fn retry_failed(&self, account_id: AccountId) -> Result<(), NotificationError> {
        self.call("retry_failed", account_id, self.client.retry_failed(account_id))
            .await
    }
}
