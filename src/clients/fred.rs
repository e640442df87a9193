//! FRED observations client

use crate::clients::{RawObservation, SeriesFetcher};
use crate::error::{AppError, Result};
use crate::services::series_config::ChannelConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// Client for the FRED `series/observations` endpoint
pub struct FredClient {
    client: Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct ObservationsResponse {
    observations: Vec<RawObservation>,
}

impl FredClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("Invalid FRED base URL {}: {}", base_url, e)))?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    fn query_params(
        series_id: &str,
        channel: &ChannelConfig,
        api_key: &str,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("series_id", series_id.to_string()),
            ("api_key", api_key.to_string()),
            ("file_type", "json".to_string()),
            ("sort_order", "desc".to_string()),
            ("frequency", channel.frequency.clone()),
        ];

        if let Some(limit) = channel.limit {
            params.push(("limit", limit.to_string()));
        }

        params
    }
}

#[async_trait]
impl SeriesFetcher for FredClient {
    async fn fetch(
        &self,
        series_id: &str,
        channel_name: &str,
        channel: &ChannelConfig,
        api_key: &str,
    ) -> Result<Vec<RawObservation>> {
        let failed = |reason: String| AppError::FetchFailed {
            series_id: series_id.to_string(),
            channel: channel_name.to_string(),
            reason: format!("{} (frequency {})", reason, channel.frequency),
        };

        let response = self
            .client
            .get(self.base_url.clone())
            .query(&Self::query_params(series_id, channel, api_key))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failed(format!("HTTP {}: {}", status, body)));
        }

        let result: ObservationsResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("Undecodable response: {}", e)))?;

        tracing::debug!(
            "Fetched {} observations for {} ({})",
            result.observations.len(),
            series_id,
            channel.frequency
        );

        Ok(result.observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channel(limit: Option<u32>) -> ChannelConfig {
        ChannelConfig {
            frequency: "q".to_string(),
            limit,
        }
    }

    #[tokio::test]
    async fn test_fetch_observations() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/fred/series/observations"))
            .and(query_param("series_id", "GDP"))
            .and(query_param("api_key", "key"))
            .and(query_param("file_type", "json"))
            .and(query_param("sort_order", "desc"))
            .and(query_param("frequency", "q"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 2,
                "observations": [
                    {"realtime_start": "2024-05-01", "realtime_end": "2024-05-01", "date": "2024-01-01", "value": "100"},
                    {"realtime_start": "2024-05-01", "realtime_end": "2024-05-01", "date": "2023-10-01", "value": "."}
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = FredClient::new(
            &format!("{}/fred/series/observations", mock_server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();

        let observations = client.fetch("GDP", "mail", &channel(Some(2)), "key").await.unwrap();
        assert_eq!(
            observations,
            vec![
                RawObservation {
                    date: "2024-01-01".to_string(),
                    value: "100".to_string()
                },
                RawObservation {
                    date: "2023-10-01".to_string(),
                    value: ".".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_limit_omitted_when_unbounded() {
        let params = FredClient::query_params("GDP", &channel(None), "key");
        assert!(params.iter().all(|(k, _)| *k != "limit"));
        assert!(params.contains(&("frequency", "q".to_string())));
    }

    #[tokio::test]
    async fn test_http_error_is_fetch_failed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Bad Request. The series does not exist."))
            .mount(&mock_server)
            .await;

        let client = FredClient::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.fetch("NOPE", "web", &channel(Some(2)), "key").await.unwrap_err();

        match err {
            AppError::FetchFailed { series_id, channel, reason } => {
                assert_eq!(series_id, "NOPE");
                assert_eq!(channel, "web");
                assert!(reason.contains("400"));
                assert!(reason.contains("frequency q"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = FredClient::new("not a url", Duration::from_secs(5)).err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }
}
