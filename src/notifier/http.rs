//! HTTP client for the notification service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};

use crate::domain::AccountId;
use crate::notifier::client::{
    Notification, NotificationPreference, NotificationRequest, NotifierClient, NotifierError,
    UpsertPreference,
};

#[derive(Debug, Clone)]
pub struct HttpNotifierClient {
    client: Client,
    api_url: String,
}

impl HttpNotifierClient {
    /// `base_url` is the service root, e.g. `http://localhost:8081`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, NotifierError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: format!("{}/api/v1/notifications", base_url.trim_end_matches('/')),
        })
    }

    async fn success(result: Result<Response, reqwest::Error>) -> Result<Response, NotifierError> {
        let response = result.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(NotifierError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

fn transport_error(e: reqwest::Error) -> NotifierError {
    if e.is_timeout() {
        NotifierError::Timeout
    } else {
        NotifierError::Transport(e.to_string())
    }
}

#[async_trait]
impl NotifierClient for HttpNotifierClient {
    async fn upsert_preference(&self, request: UpsertPreference) -> Result<(), NotifierError> {
        let sent = self
            .client
            .post(format!("{}/preferences", self.api_url))
            .json(&request)
            .send()
            .await;
        Self::success(sent).await?;
        Ok(())
    }

    async fn get_preference(
        &self,
        account_id: AccountId,
    ) -> Result<NotificationPreference, NotifierError> {
        let sent = self
            .client
            .get(format!("{}/preferences", self.api_url))
            .query(&[("userId", account_id.to_string())])
            .send()
            .await;
        Self::success(sent)
            .await?
            .json::<NotificationPreference>()
            .await
            .map_err(|e| NotifierError::Decode(e.to_string()))
    }

    async fn change_preference(
        &self,
        account_id: AccountId,
        enabled: bool,
    ) -> Result<NotificationPreference, NotifierError> {
        let sent = self
            .client
            .put(format!("{}/preferences", self.api_url))
            .query(&[
                ("userId", account_id.to_string()),
                ("enabled", enabled.to_string()),
            ])
            .send()
            .await;
        Self::success(sent)
            .await?
            .json::<NotificationPreference>()
            .await
            .map_err(|e| NotifierError::Decode(e.to_string()))
    }

    async fn send(&self, request: NotificationRequest) -> Result<(), NotifierError> {
        let sent = self.client.post(&self.api_url).json(&request).send().await;
        Self::success(sent).await?;
        Ok(())
    }

    async fn list_history(&self, account_id: AccountId) -> Result<Vec<Notification>, NotifierError> {
        let sent = self
            .client
            .get(&self.api_url)
            .query(&[("userId", account_id.to_string())])
            .send()
            .await;
        Self::success(sent)
            .await?
            .json::<Vec<Notification>>()
            .await
            .map_err(|e| NotifierError::Decode(e.to_string()))
    }

    async fn clear_history(&self, account_id: AccountId) -> Result<(), NotifierError> {
        let sent = self
            .client
            .delete(&self.api_url)
            .query(&[("userId", account_id.to_string())])
            .send()
            .await;
        Self::success(sent).await?;
        Ok(())
    }

    async fn retry_failed(&self, account_id: AccountId) -> Result<(), NotifierError> {
        let sent = self
            .client
            .put(&self.api_url)
            .query(&[("userId", account_id.to_string())])
            .send()
            .await;
        Self::success(sent).await?;
        Ok(())
    }
}
