use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::AccountId;

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Notifier timed out")]
    Timeout,

    #[error("Notifier returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Response parsing failed: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertPreference {
    pub user_id: AccountId,
    pub notification_enabled: bool,
    #[serde(rename = "type")]
    pub channel: String,
    pub contact_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreference {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub channel: String,
    pub enabled: bool,
    #[serde(default)]
    pub contact_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub user_id: AccountId,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub subject: String,
    #[serde(default)]
    pub body: String,
    pub status: String,
    #[serde(default)]
    pub created_on: Option<String>,
}

/// Operations exposed by the remote notification service.
#[async_trait]
pub trait NotifierClient: Send + Sync {
    async fn upsert_preference(&self, request: UpsertPreference) -> Result<(), NotifierError>;

    async fn get_preference(
        &self,
        account_id: AccountId,
    ) -> Result<NotificationPreference, NotifierError>;

    async fn change_preference(
        &self,
        account_id: AccountId,
        enabled: bool,
    ) -> Result<NotificationPreference, NotifierError>;

    async fn send(&self, request: NotificationRequest) -> Result<(), NotifierError>;

    async fn list_history(&self, account_id: AccountId) -> Result<Vec<Notification>, NotifierError>;

    async fn clear_history(&self, account_id: AccountId) -> Result<(), NotifierError>;

    async fn retry_failed(&self, account_id: AccountId) -> Result<(), NotifierError>;
}
