use thiserror::Error;

/// Errors surfaced by the `Store` facade. Infrastructure-level; callers
/// generally fold these into `anyhow::Error` at the service boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("request {0} not found")]
    RequestNotFound(i64),
    #[error("episode {0} not found")]
    EpisodeNotFound(i64),
    #[error("deletion log {0} not found")]
    DeletionLogNotFound(i64),
}

/// Errors from the correlator (spec §4.B). A failed correlation is routed
/// back into the ingest handler as "create new", not propagated as a hard
/// error, except where noted.
#[derive(Debug, Error)]
pub enum CorrelatorError {
    #[error("ambiguous correlation: {0}")]
    Ambiguous(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from an external-service client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status} from {service}: {body}")]
    UnexpectedStatus {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("auth failed against {0}")]
    Unauthorized(&'static str),
    #[error("response decode error: {0}")]
    Decode(String),
}

/// Errors from the deletion orchestrator (spec §4.H).
#[derive(Debug, Error)]
pub enum DeletionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("deletion log {0} has no applicable services")]
    NoApplicableServices(i64),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from the library-sync backfill job (spec §4.K).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
