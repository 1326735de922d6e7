use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::clients::retry::{reqwest_is_retryable, with_backoff};
use crate::error::ClientError;

#[derive(Debug, Clone, Deserialize)]
pub struct TorrentProgress {
    pub hash: String,
    /// 0.0..=1.0
    pub progress: f32,
}

/// The progress-provider interface named in spec §1: the core only needs
/// per-hash download progress and a delete-by-hash call, never the torrent
/// client's full polling protocol.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    async fn progress_for_hashes(
        &self,
        hashes: &[String],
    ) -> Result<Vec<TorrentProgress>, ClientError>;

    async fn delete_by_hash(&self, hash: &str, delete_files: bool) -> Result<(), ClientError>;
}

/// The torrent-client session cookie is process-wide (spec §5 "Shared-
/// resource policy"); `auth` single-flights the login so concurrent 401s
/// don't thunder-herd the login endpoint.
#[derive(Clone)]
pub struct HttpTorrentClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    auth_lock: Arc<Mutex<()>>,
}

impl HttpTorrentClient {
    pub fn new(base_url: String, username: String, password: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .cookie_store(true)
                .timeout(timeout)
                .build()
                .expect("failed to build torrent-client http client"),
            base_url,
            username,
            password,
            auth_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn login(&self) -> Result<(), ClientError> {
        let _guard = self.auth_lock.lock().await;
        let url = format!(
            "{}/api/v2/auth/login",
            self.base_url.trim_end_matches('/')
        );
        let params = [
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];
        let response = self
            .client
            .post(&url)
            .header("Referer", &self.base_url)
            .form(&params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_success() && body.contains("Ok") {
            info!("authenticated with torrent client");
            Ok(())
        } else {
            warn!(%status, "torrent client login rejected");
            Err(ClientError::Unauthorized("torrent-client"))
        }
    }

    async fn ensure_auth(&self) -> Result<(), ClientError> {
        let url = format!(
            "{}/api/v2/app/version",
            self.base_url.trim_end_matches('/')
        );
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::FORBIDDEN {
            self.login().await
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TorrentClient for HttpTorrentClient {
    async fn progress_for_hashes(
        &self,
        hashes: &[String],
    ) -> Result<Vec<TorrentProgress>, ClientError> {
        self.ensure_auth().await?;
        let joined = hashes.join("|");
        let url = format!(
            "{}/api/v2/torrents/info?hashes={}",
            self.base_url.trim_end_matches('/'),
            joined
        );
        with_backoff(
            "torrent_client.progress_for_hashes",
            3,
            || async {
                let response = self.client.get(&url).send().await?;
                let status = response.status();
                if status == reqwest::StatusCode::FORBIDDEN {
                    self.login().await?;
                    return Err(ClientError::Unauthorized("torrent-client"));
                }
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ClientError::UnexpectedStatus {
                        service: "torrent-client",
                        status: status.as_u16(),
                        body,
                    });
                }
                response
                    .json::<Vec<TorrentProgress>>()
                    .await
                    .map_err(|e| ClientError::Decode(e.to_string()))
            },
            |err| {
                matches!(err, ClientError::Unauthorized(_))
                    || matches!(err, ClientError::Transport(e) if reqwest_is_retryable(e))
            },
        )
        .await
    }

    async fn delete_by_hash(&self, hash: &str, delete_files: bool) -> Result<(), ClientError> {
        self.ensure_auth().await?;
        let url = format!(
            "{}/api/v2/torrents/delete?hashes={}&deleteFiles={}",
            self.base_url.trim_end_matches('/'),
            hash,
            delete_files
        );
        let response = self.client.post(&url).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ClientError::UnexpectedStatus {
                service: "torrent-client",
                status: status.as_u16(),
                body,
            })
        }
    }
}
