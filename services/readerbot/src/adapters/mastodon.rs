//! services/readerbot/src/adapters/mastodon.rs
//!
//! This module contains the adapter for posting statuses to a Mastodon
//! instance. It implements the `Publisher` port from the `core` crate and
//! expects an access token issued ahead of time.

use async_trait::async_trait;
use readerbot_core::{PortError, PortResult, PublishAck, Publisher};
use serde::{Deserialize, Serialize};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct MastodonPublisher {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MastodonPublisher {
    /// Creates a new `MastodonPublisher` for the instance at `base_url`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    fn statuses_url(&self) -> String {
        format!("{}/api/v1/statuses", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct StatusRequest<'a> {
    status: &'a str,
    visibility: &'a str,
}

#[derive(Deserialize)]
struct StatusResponse {
    id: String,
    url: Option<String>,
}

//=========================================================================================
// `Publisher` Trait Implementation
//=========================================================================================

#[async_trait]
impl Publisher for MastodonPublisher {
    fn name(&self) -> &str {
        "mastodon"
    }

    async fn publish(&self, text: &str) -> PortResult<PublishAck> {
        let request = StatusRequest {
            status: text,
            visibility: "public",
        };

        let response = self
            .client
            .post(self.statuses_url())
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| PortError::PublishFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::PublishFailed(format!("{}: {}", status, body)));
        }

        let created: StatusResponse = response
            .json()
            .await
            .map_err(|e| PortError::PublishFailed(e.to_string()))?;

        Ok(PublishAck {
            id: Some(created.id),
            url: created.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses_url() {
        let publisher = MastodonPublisher::new(reqwest::Client::new(), "https://example.social/", "t");
        assert_eq!(publisher.statuses_url(), "https://example.social/api/v1/statuses");
    }

    #[test]
    fn test_status_request_body() {
        let body = serde_json::to_value(StatusRequest {
            status: "#ReaderBot: hi",
            visibility: "public",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"status": "#ReaderBot: hi", "visibility": "public"}));
    }

    #[test]
    fn test_status_response_parses() {
        let created: StatusResponse =
            serde_json::from_str(r#"{"id":"110","url":"https://example.social/@bot/110","content":"x"}"#).unwrap();
        assert_eq!(created.id, "110");
        assert_eq!(created.url.as_deref(), Some("https://example.social/@bot/110"));
    }
}
