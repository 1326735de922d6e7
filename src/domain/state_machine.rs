//! Pure state-machine logic for requests and episodes.
//!
//! Per the design note on breaking the store/state-machine/timeline cycle, this
//! module never touches the database: it is a pure function `(current, target,
//! kind) -> Result<(), InvalidTransition>`. The caller (a repository method
//! running inside a transaction) is responsible for loading the row, calling
//! [`check_transition`], applying the mutation, and appending a `TimelineEvent`
//! in the same transaction.

use crate::domain::model::RequestState;
use thiserror::Error;

/// Which finite-state machine a transition is being checked against. Episodes
/// have no `REQUESTED`/`APPROVED` states and no retry-from-`FAILED` edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FsmKind {
    Request,
    Episode,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: RequestState,
    pub to: RequestState,
}

/// Outcome of [`check_transition`] distinguishing a real change from the
/// idempotent no-op case (spec §4.C: "transitioning to the current state is a
/// no-op (no TimelineEvent)").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    NoOp,
    Apply,
}

/// Validate `from -> to` against the legal-transition table in spec §4.C.
///
/// Returns `Ok(TransitionOutcome::NoOp)` when `from == to` without consulting
/// the table at all, matching the "idempotent" contract. Otherwise looks the
/// edge up in [`allowed_targets`].
pub fn check_transition(
    kind: FsmKind,
    from: RequestState,
    to: RequestState,
) -> Result<TransitionOutcome, InvalidTransition> {
    if from == to {
        return Ok(TransitionOutcome::NoOp);
    }

    if allowed_targets(kind, from).contains(&to) {
        Ok(TransitionOutcome::Apply)
    } else {
        Err(InvalidTransition { from, to })
    }
}

/// The legal outgoing edges for `from` under `kind`.
#[must_use]
pub fn allowed_targets(kind: FsmKind, from: RequestState) -> &'static [RequestState] {
    use RequestState::{
        AnimeMatching, Approved, Available, Downloaded, Downloading, Failed, Grabbing, Importing,
        Requested,
    };

    match (kind, from) {
        (FsmKind::Request, Requested) => &[Approved, Failed],
        (FsmKind::Request, Approved) => &[Grabbing, Failed],
        (FsmKind::Request, Grabbing) => &[Downloading, Failed],
        (FsmKind::Request, Downloading) => &[Downloaded, Failed],
        (FsmKind::Request, Downloaded) => &[Importing, AnimeMatching, Failed],
        (FsmKind::Request, Importing) => &[AnimeMatching, Available, Failed],
        (FsmKind::Request, AnimeMatching) => &[Available, Failed],
        (FsmKind::Request, Available) => &[Failed],
        (FsmKind::Request, Failed) => &[Approved],

        // Episodes: no REQUESTED/APPROVED, no retry from FAILED.
        (FsmKind::Episode, Requested | Approved) => &[],
        (FsmKind::Episode, Grabbing) => &[Downloading, Failed],
        (FsmKind::Episode, Downloading) => &[Downloaded, Failed],
        (FsmKind::Episode, Downloaded) => &[Importing, AnimeMatching, Failed],
        (FsmKind::Episode, Importing) => &[AnimeMatching, Available, Failed],
        (FsmKind::Episode, AnimeMatching) => &[Available, Failed],
        (FsmKind::Episode, Available) => &[Failed],
        (FsmKind::Episode, Failed) => &[],
    }
}

/// Branching policy for the DOWNLOADED -> {IMPORTING, ANIME_MATCHING} fork on
/// import completion, per spec §4.C.
#[must_use]
pub fn post_import_target(is_anime: bool) -> RequestState {
    if is_anime {
        RequestState::AnimeMatching
    } else {
        RequestState::Importing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestState::{
        AnimeMatching, Approved, Available, Downloaded, Downloading, Failed, Grabbing, Importing,
        Requested,
    };

    #[test]
    fn same_state_is_noop_without_table_lookup() {
        assert_eq!(
            check_transition(FsmKind::Request, Available, Available),
            Ok(TransitionOutcome::NoOp)
        );
    }

    #[test]
    fn request_happy_path_is_legal() {
        let path = [
            Requested,
            Approved,
            Grabbing,
            Downloading,
            Downloaded,
            Importing,
            Available,
        ];
        for pair in path.windows(2) {
            assert_eq!(
                check_transition(FsmKind::Request, pair[0], pair[1]),
                Ok(TransitionOutcome::Apply),
                "{:?} -> {:?} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn failed_can_only_retry_to_approved() {
        assert_eq!(
            check_transition(FsmKind::Request, Failed, Approved),
            Ok(TransitionOutcome::Apply)
        );
        assert!(check_transition(FsmKind::Request, Failed, Grabbing).is_err());
    }

    #[test]
    fn available_allows_manual_failed_override_only() {
        assert_eq!(
            check_transition(FsmKind::Request, Available, Failed),
            Ok(TransitionOutcome::Apply)
        );
        assert!(check_transition(FsmKind::Request, Available, Approved).is_err());
    }

    #[test]
    fn episode_has_no_requested_or_approved_states() {
        assert!(check_transition(FsmKind::Episode, Requested, Approved).is_err());
        assert!(allowed_targets(FsmKind::Episode, Requested).is_empty());
    }

    #[test]
    fn episode_cannot_retry_from_failed() {
        assert!(allowed_targets(FsmKind::Episode, Failed).is_empty());
    }

    #[test]
    fn skipping_a_state_is_illegal() {
        assert!(check_transition(FsmKind::Request, Requested, Grabbing).is_err());
        assert!(check_transition(FsmKind::Request, Approved, Available).is_err());
    }

    #[test]
    fn downloaded_can_branch_to_either_import_path() {
        assert_eq!(
            check_transition(FsmKind::Request, Downloaded, Importing),
            Ok(TransitionOutcome::Apply)
        );
        assert_eq!(
            check_transition(FsmKind::Request, Downloaded, AnimeMatching),
            Ok(TransitionOutcome::Apply)
        );
    }

    #[test]
    fn post_import_target_follows_is_anime_flag() {
        assert_eq!(post_import_target(true), AnimeMatching);
        assert_eq!(post_import_target(false), Importing);
    }
}
