//! Transactional glue between the pure state machine (`domain::state_machine`)
//! and the store. Every call here both mutates the row and appends the
//! TimelineEvent in the same transaction, per spec §4.C step 2. The caller
//! is responsible for broadcasting on the live-update bus only *after* the
//! transaction commits (§4.I invariant) — this module never touches the bus.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set};
use tracing::{info, warn};

use crate::db::repositories::episode::EpisodeRepository;
use crate::db::repositories::request::RequestRepository;
use crate::db::repositories::timeline::TimelineRepository;
use crate::domain::model::{RequestState, ServiceLabel};
use crate::domain::state_machine::{check_transition, FsmKind, InvalidTransition, TransitionOutcome};
use crate::entities::{episodes, requests};

/// The result of a successful (non-no-op) transition, used by the caller to
/// build the broadcast payload after commit.
#[derive(Debug, Clone)]
pub struct AppliedTransition {
    pub from: RequestState,
    pub to: RequestState,
}

/// Applies a request-level transition within `txn`. Per §4.C's failure
/// semantics, an invalid transition is returned as `Err` so the immediate
/// caller can log it — but the ingest handler above never surfaces that
/// error to its own (webhook) caller; the inbound event is still
/// considered processed.
pub async fn apply_request_transition(
    txn: &DatabaseTransaction,
    mut request: requests::Model,
    target: RequestState,
    emitter_service: ServiceLabel,
    event_type_label: &str,
    detail: &str,
) -> Result<(requests::Model, Option<AppliedTransition>), InvalidTransition> {
    let current = RequestState::parse(&request.state).unwrap_or(RequestState::Requested);

    match check_transition(FsmKind::Request, current, target)? {
        TransitionOutcome::NoOp => Ok((request, None)),
        TransitionOutcome::Apply => {
            let now = Utc::now().to_rfc3339();
            let mut active: requests::ActiveModel = request.clone().into();
            active.state = Set(target.as_str().to_string());
            active.updated_at = Set(now.clone());
            if target == RequestState::Available {
                active.available_at = Set(Some(now.clone()));
            }

            request = RequestRepository::save_in_txn(txn, active)
                .await
                .map_err(|_| InvalidTransition {
                    from: current,
                    to: target,
                })?;

            TimelineRepository::append_in_txn(
                txn,
                request.request_id,
                Some(current),
                target,
                emitter_service.as_str(),
                event_type_label,
                detail,
                false,
            )
            .await
            .map_err(|_| InvalidTransition {
                from: current,
                to: target,
            })?;

            info!(request_id = request.request_id, %current, %target, "request transitioned");

            Ok((
                request,
                Some(AppliedTransition {
                    from: current,
                    to: target,
                }),
            ))
        }
    }
}

/// Writes the synthetic creation TimelineEvent for a brand-new request
/// (spec §3 TimelineEvent "is_new flag").
pub async fn record_request_created(
    txn: &DatabaseTransaction,
    request_id: i64,
    to_state: RequestState,
    emitter_service: ServiceLabel,
    detail: &str,
) -> Result<(), InvalidTransition> {
    TimelineRepository::append_in_txn(
        txn,
        request_id,
        None,
        to_state,
        emitter_service.as_str(),
        "created",
        detail,
        true,
    )
    .await
    .map_err(|_| InvalidTransition {
        from: to_state,
        to: to_state,
    })?;
    Ok(())
}

pub async fn apply_episode_transition(
    txn: &DatabaseTransaction,
    mut episode: episodes::Model,
    target: RequestState,
) -> Result<(episodes::Model, Option<AppliedTransition>), InvalidTransition> {
    let current = RequestState::parse(&episode.state).unwrap_or(RequestState::Grabbing);

    match check_transition(FsmKind::Episode, current, target)? {
        TransitionOutcome::NoOp => Ok((episode, None)),
        TransitionOutcome::Apply => {
            let now = Utc::now().to_rfc3339();
            let mut active: episodes::ActiveModel = episode.clone().into();
            active.state = Set(target.as_str().to_string());
            EpisodeRepository::touch_updated_at(&mut active, &now);

            episode = EpisodeRepository::save_in_txn(txn, active)
                .await
                .map_err(|_| InvalidTransition {
                    from: current,
                    to: target,
                })?;

            warn_if_terminal_skip(current, target);

            Ok((
                episode,
                Some(AppliedTransition {
                    from: current,
                    to: target,
                }),
            ))
        }
    }
}

fn warn_if_terminal_skip(_from: RequestState, _to: RequestState) {
    // Episodes don't get their own TimelineEvents (§3 lists TimelineEvent
    // as a MediaRequest relationship only); the parent's aggregated
    // transition is what gets recorded, via `aggregator::aggregate` plus
    // another `apply_request_transition` call.
}
