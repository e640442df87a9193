//! External collaborators
//!
//! The sync pipeline talks to four outside systems, each behind a trait so a
//! run can be wired to production clients or to in-memory fakes:
//! - `ConfigSource` - parameter store holding the API key and series documents
//! - `SecretSource` - credentials for the mail relay
//! - `SeriesFetcher` - the statistics API (FRED)
//! - `Mailer` - outbound mail transport

pub mod fred;
pub mod keychain;
pub mod mail;
pub mod parameters;

use crate::error::Result;
use crate::services::series_config::ChannelConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use fred::FredClient;
pub use keychain::{KeychainSecretSource, StaticSecretSource};
pub use mail::HttpMailer;
pub use parameters::FileParameterStore;

/// Username/password pair returned by a secret source
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// One observation as returned by the statistics API, value still unparsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObservation {
    pub date: String,
    pub value: String,
}

/// A formatted message ready for the mail transport
#[derive(Debug, Clone, Serialize)]
pub struct MailMessage {
    pub subject: String,
    pub html_body: String,
    pub recipients: Vec<String>,
}

/// Transport acknowledgement
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryReceipt {
    #[serde(default)]
    pub message_id: Option<String>,
}

/// Parameter store returning opaque string values by path
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn get(&self, path: &str) -> Result<String>;
}

/// Secret store returning credentials by secret id
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn get(&self, secret_id: &str) -> Result<Credentials>;
}

/// Statistics API client
#[async_trait]
pub trait SeriesFetcher: Send + Sync {
    /// Fetch the most recent observations of a series for one channel
    ///
    /// `channel_name` only labels errors; the query is driven by `channel`.
    async fn fetch(
        &self,
        series_id: &str,
        channel_name: &str,
        channel: &ChannelConfig,
        api_key: &str,
    ) -> Result<Vec<RawObservation>>;
}

/// Outbound mail transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, credentials: &Credentials, message: &MailMessage) -> Result<DeliveryReceipt>;
}
