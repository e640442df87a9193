//! API response types

use crate::db::sqlite::models::DigestRow;
use serde::{Deserialize, Serialize};

/// Envelope of every JSON response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success_with_message(message: &str) -> Self {
        Self {
            status: "success".to_string(),
            message: Some(message.to_string()),
            data: None,
            code: None,
        }
    }

    pub fn success_with_data(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            data: Some(data),
            code: None,
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.to_string()),
            data: None,
            code: Some(code.to_string()),
        }
    }
}

/// Placeholder payload for responses without data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Empty {}

/// Current digest of the reporting channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestDigest {
    pub channel: String,
    pub rows: Vec<DigestRow>,
    /// Rendered body, absent when the channel has no rows
    pub html: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_skips_empty_fields() {
        let ok = serde_json::to_value(ApiResponse::success_with_data(vec![1, 2])).unwrap();
        assert_eq!(ok, serde_json::json!({"status": "success", "data": [1, 2]}));

        let err = serde_json::to_value(ApiResponse::<Empty>::error("NOT_FOUND", "missing")).unwrap();
        assert_eq!(
            err,
            serde_json::json!({"status": "error", "message": "missing", "code": "NOT_FOUND"})
        );
    }
}
