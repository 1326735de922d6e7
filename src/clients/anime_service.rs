use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::clients::retry::{reqwest_is_retryable, with_backoff};
use crate::error::ClientError;

#[derive(Debug, Clone, Deserialize)]
pub struct ImportFolder {
    pub id: i64,
    pub root_path: String,
}

/// A single message from the anime-service streaming hub (spec §6
/// "Outbound (streaming)"). Feeds subscribed: `shoko,file,movie,episode`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum AnimeHubEvent {
    FileDetected { file_id: i64, relative_path: String },
    FileHashed { file_id: i64, hash: String },
    FileMatched {
        file_id: i64,
        relative_path: String,
        cross_references: Vec<AnimeCrossReference>,
    },
    FileDeleted { file_id: i64 },
    SeriesUpdated { series_id: i64, reason: String },
    EpisodeUpdated { episode_id: i64, reason: String },
    MovieUpdated { movie_id: i64, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnimeCrossReference {
    pub provider: String,
    pub provider_id: String,
}

/// Outbound calls against the anime-metadata service. The streaming hub
/// connection itself lives in `services::anime_hub`, since it is a
/// long-lived task rather than a request/response call.
#[async_trait]
pub trait AnimeServiceClient: Send + Sync {
    async fn list_import_folders(&self) -> Result<Vec<ImportFolder>, ClientError>;
}

#[derive(Clone)]
pub struct HttpAnimeServiceClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpAnimeServiceClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build anime-service http client"),
            base_url,
            api_key,
        }
    }

    pub fn hub_url(&self, feeds: &str) -> String {
        format!(
            "{}/hub?feeds={}",
            self.base_url.trim_end_matches('/'),
            feeds
        )
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

#[async_trait]
impl AnimeServiceClient for HttpAnimeServiceClient {
    async fn list_import_folders(&self) -> Result<Vec<ImportFolder>, ClientError> {
        let url = format!(
            "{}/api/v3/folder",
            self.base_url.trim_end_matches('/')
        );
        with_backoff(
            "anime_service.list_import_folders",
            3,
            || async {
                let response = self
                    .client
                    .get(&url)
                    .header("apikey", &self.api_key)
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ClientError::UnexpectedStatus {
                        service: "anime-service",
                        status: status.as_u16(),
                        body,
                    });
                }
                response
                    .json::<Vec<ImportFolder>>()
                    .await
                    .map_err(|e| ClientError::Decode(e.to_string()))
            },
            |err| matches!(err, ClientError::Transport(e) if reqwest_is_retryable(e)),
        )
        .await
    }
}
