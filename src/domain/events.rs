//! Live-update bus payloads (spec §4.I).
//!
//! Messages are opaque JSON with an `event_type` tag and a `request_id` where
//! applicable, broadcast to every subscribed dashboard client. Ordering is
//! preserved per-subscriber via the underlying `tokio::sync::broadcast`
//! channel; cross-subscriber ordering is not guaranteed, matching spec §4.I.

use serde::Serialize;

use crate::domain::model::{DeletionStatus, RequestState};

/// Snapshot of a request sent alongside state-changing events, so dashboard
/// clients can render without a round-trip refetch.
#[derive(Clone, Debug, Serialize)]
pub struct RequestSnapshot {
    pub request_id: i64,
    pub title: String,
    pub state: RequestState,
    pub download_percentage: Option<f32>,
    pub poster_url: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event_type", content = "payload")]
pub enum NotificationEvent {
    RequestCreated(RequestSnapshot),
    RequestUpdated(RequestSnapshot),
    RequestTransitioned {
        request_id: i64,
        from: RequestState,
        to: RequestState,
    },
    RequestProgress {
        request_id: i64,
        percentage: f32,
    },
    DeletionStarted {
        deletion_log_id: i64,
        request_id: i64,
    },
    DeletionCompleted {
        deletion_log_id: i64,
        request_id: i64,
        status: DeletionStatus,
    },
    CorrelationAmbiguous {
        detail: String,
    },
    LibrarySyncCompleted {
        created: i32,
        skipped: i32,
    },
}

impl NotificationEvent {
    /// The `request_id` carried by this event, if any — used by dashboard
    /// clients to scope per-request subscriptions client-side.
    #[must_use]
    pub fn request_id(&self) -> Option<i64> {
        match self {
            Self::RequestCreated(s) | Self::RequestUpdated(s) => Some(s.request_id),
            Self::RequestTransitioned { request_id, .. }
            | Self::RequestProgress { request_id, .. }
            | Self::DeletionStarted { request_id, .. }
            | Self::DeletionCompleted { request_id, .. } => Some(*request_id),
            Self::CorrelationAmbiguous { .. } | Self::LibrarySyncCompleted { .. } => None,
        }
    }
}
