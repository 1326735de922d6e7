use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::clients::retry::{reqwest_is_retryable, with_backoff};
use crate::error::ClientError;

/// Outbound calls against indexer-A (the movie indexer/downloader). Inbound
/// `Grab`/`Download`/`MovieDelete` events are handled in `services::ingest`.
#[async_trait]
pub trait IndexerMoviesClient: Send + Sync {
    async fn delete_movie(&self, movie_service_id: &str, delete_files: bool) -> Result<(), ClientError>;
}

#[derive(Clone)]
pub struct HttpIndexerMoviesClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpIndexerMoviesClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build indexer-movies http client"),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl IndexerMoviesClient for HttpIndexerMoviesClient {
    async fn delete_movie(
        &self,
        movie_service_id: &str,
        delete_files: bool,
    ) -> Result<(), ClientError> {
        let url = format!(
            "{}/api/v3/movie/{}?deleteFiles={}",
            self.base_url.trim_end_matches('/'),
            movie_service_id,
            delete_files
        );
        with_backoff(
            "indexer_movies.delete_movie",
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
                    debug!(movie_service_id, delete_files, "movie deleted upstream");
                    Ok(())
                } else {
                    let body = response.text().await.unwrap_or_default();
                    Err(ClientError::UnexpectedStatus {
                        service: "indexer-movies",
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
