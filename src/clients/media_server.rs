use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::clients::retry::{reqwest_is_retryable, with_backoff};
use crate::error::ClientError;

#[derive(Debug, Clone, Deserialize)]
pub struct MediaServerItem {
    pub id: String,
    #[serde(default)]
    pub provider_ids: std::collections::HashMap<String, String>,
    pub path: Option<String>,
    #[serde(default, rename = "MediaSources")]
    pub media_sources: Vec<serde_json::Value>,
}

impl MediaServerItem {
    /// A hit is only trustworthy if the item is actually playable (spec
    /// §4.G step 3): metadata-only stubs with neither a path nor a
    /// media-source are a known false-positive source and must be rejected.
    #[must_use]
    pub fn is_playable(&self) -> bool {
        !self.media_sources.is_empty() || self.path.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaServerUser {
    pub id: String,
    pub name: String,
}

/// Outbound calls against the media server (spec §6). A direct item delete
/// is deliberately not exposed here: §4.H requires deletion to go through a
/// library rescan trigger instead, since direct item delete is unreliable.
#[async_trait]
pub trait MediaServerClient: Send + Sync {
    async fn search_by_provider_id(
        &self,
        provider: &str,
        provider_id: &str,
        is_series: bool,
    ) -> Result<Option<MediaServerItem>, ClientError>;

    /// Provider-id search with no item-type filter (verifier priority 4,
    /// spec §4.G).
    async fn search_by_provider_id_any_type(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<MediaServerItem>, ClientError>;

    /// Title + year search, the verifier's last-resort lookup (spec §4.G
    /// priority 5).
    async fn search_by_title_year(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Option<MediaServerItem>, ClientError>;

    /// Bulk enumeration of every library item carrying provider-id metadata
    /// (spec §4.K phase 1); one call regardless of library size.
    async fn list_items_with_provider_ids(&self) -> Result<Vec<MediaServerItem>, ClientError>;

    async fn trigger_library_rescan(&self) -> Result<(), ClientError>;

    /// Validates an admin bearer token against the media server's own auth
    /// API (spec §4.J); returns the authenticated user on success.
    async fn validate_user_token(&self, token: &str) -> Result<Option<MediaServerUser>, ClientError>;
}

#[derive(Clone)]
pub struct HttpMediaServerClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpMediaServerClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build media-server http client"),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl MediaServerClient for HttpMediaServerClient {
    async fn list_items_with_provider_ids(&self) -> Result<Vec<MediaServerItem>, ClientError> {
        let url = format!(
            "{}/Items?HasAnyProviderId=true&Recursive=true&IncludeItemTypes=Movie,Series",
            self.base_url.trim_end_matches('/')
        );
        with_backoff(
            "media_server.list_items_with_provider_ids",
            3,
            || async {
                let response = self
                    .client
                    .get(&url)
                    .header("X-Emby-Token", &self.api_key)
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ClientError::UnexpectedStatus {
                        service: "media-server",
                        status: status.as_u16(),
                        body,
                    });
                }
                #[derive(Deserialize)]
                struct ItemsResponse {
                    #[serde(rename = "Items")]
                    items: Vec<MediaServerItem>,
                }
                let parsed: ItemsResponse = response
                    .json()
                    .await
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                Ok(parsed.items)
            },
            |err| matches!(err, ClientError::Transport(e) if reqwest_is_retryable(e)),
        )
        .await
    }

    async fn search_by_provider_id(
        &self,
        provider: &str,
        provider_id: &str,
        is_series: bool,
    ) -> Result<Option<MediaServerItem>, ClientError> {
        let include_item_types = if is_series { "Series" } else { "Movie" };
        let url = format!(
            "{}/Items?AnyProviderIdEquals={}.{}&IncludeItemTypes={}&Recursive=true",
            self.base_url.trim_end_matches('/'),
            provider,
            provider_id,
            include_item_types
        );
        with_backoff(
            "media_server.search_by_provider_id",
            3,
            || async {
                let response = self
                    .client
                    .get(&url)
                    .header("X-Emby-Token", &self.api_key)
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ClientError::UnexpectedStatus {
                        service: "media-server",
                        status: status.as_u16(),
                        body,
                    });
                }
                #[derive(Deserialize)]
                struct ItemsResponse {
                    #[serde(rename = "Items")]
                    items: Vec<MediaServerItem>,
                }
                let parsed: ItemsResponse = response
                    .json()
                    .await
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                Ok(parsed.items.into_iter().next())
            },
            |err| matches!(err, ClientError::Transport(e) if reqwest_is_retryable(e)),
        )
        .await
    }

    async fn search_by_provider_id_any_type(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<MediaServerItem>, ClientError> {
        let url = format!(
            "{}/Items?AnyProviderIdEquals={}.{}&Recursive=true",
            self.base_url.trim_end_matches('/'),
            provider,
            provider_id
        );
        with_backoff(
            "media_server.search_by_provider_id_any_type",
            3,
            || async {
                let response = self
                    .client
                    .get(&url)
                    .header("X-Emby-Token", &self.api_key)
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ClientError::UnexpectedStatus {
                        service: "media-server",
                        status: status.as_u16(),
                        body,
                    });
                }
                #[derive(Deserialize)]
                struct ItemsResponse {
                    #[serde(rename = "Items")]
                    items: Vec<MediaServerItem>,
                }
                let parsed: ItemsResponse = response
                    .json()
                    .await
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                Ok(parsed.items.into_iter().next())
            },
            |err| matches!(err, ClientError::Transport(e) if reqwest_is_retryable(e)),
        )
        .await
    }

    async fn search_by_title_year(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Option<MediaServerItem>, ClientError> {
        let mut url = format!(
            "{}/Items?SearchTerm={}&Recursive=true",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(title)
        );
        if let Some(year) = year {
            url.push_str(&format!("&Years={year}"));
        }
        with_backoff(
            "media_server.search_by_title_year",
            3,
            || async {
                let response = self
                    .client
                    .get(&url)
                    .header("X-Emby-Token", &self.api_key)
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ClientError::UnexpectedStatus {
                        service: "media-server",
                        status: status.as_u16(),
                        body,
                    });
                }
                #[derive(Deserialize)]
                struct ItemsResponse {
                    #[serde(rename = "Items")]
                    items: Vec<MediaServerItem>,
                }
                let parsed: ItemsResponse = response
                    .json()
                    .await
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                Ok(parsed.items.into_iter().next())
            },
            |err| matches!(err, ClientError::Transport(e) if reqwest_is_retryable(e)),
        )
        .await
    }

    async fn trigger_library_rescan(&self) -> Result<(), ClientError> {
        let url = format!(
            "{}/Library/Refresh",
            self.base_url.trim_end_matches('/')
        );
        with_backoff(
            "media_server.trigger_library_rescan",
            3,
            || async {
                let response = self
                    .client
                    .post(&url)
                    .header("X-Emby-Token", &self.api_key)
                    .send()
                    .await?;
                let status = response.status();
                if status.is_success() {
                    Ok(())
                } else {
                    let body = response.text().await.unwrap_or_default();
                    Err(ClientError::UnexpectedStatus {
                        service: "media-server",
                        status: status.as_u16(),
                        body,
                    })
                }
            },
            |err| matches!(err, ClientError::Transport(e) if reqwest_is_retryable(e)),
        )
        .await
    }

    async fn validate_user_token(
        &self,
        token: &str,
    ) -> Result<Option<MediaServerUser>, ClientError> {
        let url = format!(
            "{}/Users/Me",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .get(&url)
            .header("X-Emby-Token", token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus {
                service: "media-server",
                status: status.as_u16(),
                body,
            });
        }
        Ok(Some(
            response
                .json::<MediaServerUser>()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()))?,
        ))
    }
}
