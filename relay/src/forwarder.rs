use crate::message::ChatMessage;
use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum ForwardError {
    #[error("webhook delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Delivers chat messages somewhere. Failures are reported, never retried.
#[async_trait]
pub trait Forward: Send + Sync {
    /// False when there is nowhere to deliver to and `forward` does nothing.
    fn is_enabled(&self) -> bool {
        true
    }

    async fn forward(&self, message: ChatMessage) -> Result<(), ForwardError>;
}

/// Posts messages to a chat webhook. Without a webhook URL every call is a
/// successful no-op.
#[derive(Clone)]
pub struct WebhookForwarder {
    client: reqwest::Client,
    webhook_url: Option<Url>,
}

impl WebhookForwarder {
    pub fn new(webhook_url: Option<Url>) -> Self {
        WebhookForwarder {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }
}

#[async_trait]
impl Forward for WebhookForwarder {
    fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    async fn forward(&self, message: ChatMessage) -> Result<(), ForwardError> {
        let Some(url) = &self.webhook_url else {
            return Ok(());
        };

        let response = self
            .client
            .post(url.clone())
            .json(&message)
            .send()
            .await
            .map_err(|e| ForwardError::DeliveryFailed(e.to_string()))?;

        // The webhook answers exactly 200 on success; anything else is a rejection.
        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ForwardError::DeliveryFailed(format!(
                "webhook responded {status}: {body}"
            )));
        }

        Ok(())
    }
}
