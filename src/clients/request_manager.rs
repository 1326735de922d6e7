use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::clients::retry::{reqwest_is_retryable, with_backoff};
use crate::error::ClientError;

/// Outbound calls against the request manager (spec §6 "Outbound API
/// calls"). Inbound events from this service arrive over
/// `/hooks/request-manager` and are handled in `services::ingest`, not here.
#[async_trait]
pub trait RequestManagerClient: Send + Sync {
    async fn delete_request(&self, request_manager_id: &str) -> Result<(), ClientError>;
}

#[derive(Clone)]
pub struct HttpRequestManagerClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpRequestManagerClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build request-manager http client"),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl RequestManagerClient for HttpRequestManagerClient {
    async fn delete_request(&self, request_manager_id: &str) -> Result<(), ClientError> {
        let url = format!(
            "{}/api/v1/request/{}",
            self.base_url.trim_end_matches('/'),
            request_manager_id
        );
        with_backoff(
            "request_manager.delete_request",
            3,
            || async {
                let response = self
                    .client
                    .delete(&url)
                    .header("X-Api-Key", &self.api_key)
                    .send()
                    .await?;
                let status = response.status();
                if status.is_success() {
                    debug!(request_manager_id, "request deleted upstream");
                    Ok(())
                } else {
                    let body = response.text().await.unwrap_or_default();
                    Err(ClientError::UnexpectedStatus {
                        service: "request-manager",
                        status: status.as_u16(),
                        body,
                    })
                }
            },
            |err| matches!(err, ClientError::Transport(e) if reqwest_is_retryable(e)),
        )
        .await
    }
}
