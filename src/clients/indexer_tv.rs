use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::clients::retry::{reqwest_is_retryable, with_backoff};
use crate::error::ClientError;

/// Outbound calls against indexer-B (the TV indexer/downloader). Inbound
/// `Grab`/`Download`/`SeriesDelete`/`EpisodeFileDelete` events are handled
/// in `services::ingest`.
#[async_trait]
pub trait IndexerTvClient: Send + Sync {
    async fn delete_series(&self, series_service_id: &str, delete_files: bool) -> Result<(), ClientError>;
}

#[derive(Clone)]
pub struct HttpIndexerTvClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpIndexerTvClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build indexer-tv http client"),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl IndexerTvClient for HttpIndexerTvClient {
    async fn delete_series(
        &self,
        series_service_id: &str,
        delete_files: bool,
    ) -> Result<(), ClientError> {
        let url = format!(
            "{}/api/v3/series/{}?deleteFiles={}",
            self.base_url.trim_end_matches('/'),
            series_service_id,
            delete_files
        );
        with_backoff(
            "indexer_tv.delete_series",
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
                    debug!(series_service_id, delete_files, "series deleted upstream");
                    Ok(())
                } else {
                    let body = response.text().await.unwrap_or_default();
                    Err(ClientError::UnexpectedStatus {
                        service: "indexer-tv",
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
