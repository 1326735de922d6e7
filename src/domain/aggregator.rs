//! Derives a `MediaRequest`'s state from the states of its owned `Episode`s.
//!
//! Called after every episode mutation (spec §4.D). The result is fed back
//! through [`crate::domain::state_machine::check_transition`] by the caller —
//! this module only computes the *target* state, it never applies anything.

use crate::domain::model::RequestState;

/// In-progress states in descending aggregation priority, per spec §4.D.
const PROGRESS_PRIORITY: [RequestState; 5] = [
    RequestState::AnimeMatching,
    RequestState::Importing,
    RequestState::Downloaded,
    RequestState::Downloading,
    RequestState::Grabbing,
];

/// Derive the aggregate request state from its episodes' states.
///
/// Returns `None` when `episodes` is empty — aggregation only applies to a
/// `MediaRequest` with at least one `Episode` (spec §4.D: "Given a parent
/// MediaRequest with ≥1 Episode").
#[must_use]
pub fn aggregate(episodes: &[RequestState]) -> Option<RequestState> {
    if episodes.is_empty() {
        return None;
    }

    if episodes.iter().all(|&s| s == RequestState::Available) {
        return Some(RequestState::Available);
    }

    if episodes.iter().any(|&s| s == RequestState::Failed) {
        return Some(RequestState::Failed);
    }

    for &candidate in &PROGRESS_PRIORITY {
        if episodes.iter().any(|&s| s == candidate) {
            return Some(candidate);
        }
    }

    // Every episode is REQUESTED/APPROVED-equivalent; episodes never actually
    // hold those states (FsmKind::Episode has no such edges), so this is
    // unreachable in practice but kept total rather than panicking.
    episodes.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestState::{AnimeMatching, Available, Downloaded, Downloading, Failed, Grabbing};

    #[test]
    fn empty_has_no_aggregate() {
        assert_eq!(aggregate(&[]), None);
    }

    #[test]
    fn all_available_aggregates_to_available() {
        assert_eq!(aggregate(&[Available, Available, Available]), Some(Available));
    }

    #[test]
    fn any_failed_aggregates_to_failed_even_if_others_available() {
        assert_eq!(aggregate(&[Available, Failed, Downloading]), Some(Failed));
    }

    #[test]
    fn highest_priority_in_progress_state_wins() {
        assert_eq!(
            aggregate(&[Grabbing, Downloading, Downloaded, AnimeMatching]),
            Some(AnimeMatching)
        );
        assert_eq!(aggregate(&[Grabbing, Downloading]), Some(Downloading));
    }

    #[test]
    fn season_pack_mixed_progress_picks_furthest_along() {
        // 13-episode season pack, most still downloading, one already imported.
        let mut states = vec![Downloading; 12];
        states.push(Downloaded);
        assert_eq!(aggregate(&states), Some(Downloaded));
    }
}
