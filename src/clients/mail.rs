//! HTTP mail relay transport

use crate::clients::{Credentials, DeliveryReceipt, MailMessage, Mailer};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Sends HTML mail through a JSON relay endpoint using basic auth
pub struct HttpMailer {
    client: Client,
    endpoint: Url,
    from: String,
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    charset: &'static str,
}

impl HttpMailer {
    pub fn new(endpoint: &str, from: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| AppError::Config(format!("Invalid mail endpoint {}: {}", endpoint, e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, credentials: &Credentials, message: &MailMessage) -> Result<DeliveryReceipt> {
        if message.recipients.is_empty() {
            return Err(AppError::MailTransportFailed("No recipients configured".to_string()));
        }

        let request = RelayRequest {
            from: &self.from,
            to: &message.recipients,
            subject: &message.subject,
            html: &message.html_body,
            charset: "UTF-8",
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .basic_auth(&credentials.username, Some(&credentials.password))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::MailTransportFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::MailTransportFailed(format!("HTTP {}: {}", status, body)));
        }

        // Relays that answer with an empty body still count as delivered
        let receipt = response.json::<DeliveryReceipt>().await.unwrap_or_default();

        tracing::info!(
            "Mail '{}' accepted for {} recipients",
            message.subject,
            message.recipients.len()
        );
        Ok(receipt)
    }
}
