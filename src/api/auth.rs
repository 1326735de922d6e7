//! Admin/auth gate (spec §4.J). Applied only to the deletion, bulk-delete,
//! and library-sync routes — never to the read-only dashboard GETs or the
//! inbound webhooks.
//!
//! Unlike a static API-key check, this validates the bearer token against
//! the media server's own user-auth endpoint (so there's one source of
//! truth for "who is this"), then checks the resolved user id against the
//! configured admin allowlist. The per-token result is cached briefly so a
//! burst of admin clicks doesn't hammer the media server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use tokio::sync::Mutex;

use crate::clients::media_server::MediaServerUser;

use super::{ApiError, AppState};

const TOKEN_CACHE_TTL: Duration = Duration::from_secs(30);

#[derive(Default)]
pub struct AuthCache {
    inner: Mutex<std::collections::HashMap<String, (Instant, Option<MediaServerUser>)>>,
}

impl AuthCache {
    async fn resolved_user(&self, token: &str, state: &AppState) -> Option<MediaServerUser> {
        {
            let guard = self.inner.lock().await;
            if let Some((fetched_at, user)) = guard.get(token) {
                if fetched_at.elapsed() < TOKEN_CACHE_TTL {
                    return user.clone();
                }
            }
        }

        let user = state
            .shared
            .media_server
            .validate_user_token(token)
            .await
            .ok()
            .flatten();

        let mut guard = self.inner.lock().await;
        guard.insert(token.to_string(), (Instant::now(), user.clone()));
        user
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// The user resolved by the gate, threaded through to the handler via
/// request extensions so it doesn't have to re-validate the token itself.
/// Carries the media-server display name alongside the id so deletion
/// logging doesn't have to re-fetch it (spec §3 DeletionLog actor fields).
#[derive(Clone)]
pub struct AdminUserId {
    pub id: String,
    pub display_name: String,
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let Some(token) = bearer_token(&headers) else {
        return Ok((StatusCode::UNAUTHORIZED, "missing bearer token").into_response());
    };

    let user = state.auth_cache.resolved_user(token, &state).await;
    let config = state.shared.config.read().await;
    let admin_ids = &config.auth.admin_user_ids;

    match &user {
        Some(user) if admin_ids.iter().any(|a| a == &user.id) => {
            request.extensions_mut().insert(AdminUserId {
                id: user.id.clone(),
                display_name: user.name.clone(),
            });
            Ok(next.run(request).await.into_response())
        }
        Some(user) => {
            tracing::info!(user_id = %user.id, "admin gate denied: not in allowlist");
            Ok((StatusCode::FORBIDDEN, "not an admin").into_response())
        }
        None => {
            tracing::info!("admin gate denied: token did not resolve to a user");
            Ok((StatusCode::UNAUTHORIZED, "invalid bearer token").into_response())
        }
    }
}
