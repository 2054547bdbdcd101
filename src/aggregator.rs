use crate::host::View;
use crate::outcome::Outcome;

/// Worst outcome that still takes part in a view rollup. `NOT_BUILT` and
/// `ABORTED` never influence a view's status.
const AGGREGATION_THRESHOLD: Outcome = Outcome::Failure;

pub fn is_aggregable(outcome: Outcome) -> bool {
    outcome.is_better_or_equal_to(AGGREGATION_THRESHOLD)
}

/// Folds the last completed outcome of every job reachable from `view`.
///
/// Membership is read fresh on every call. Jobs without a completed build
/// contribute nothing; an empty view aggregates to `SUCCESS`.
pub fn compute_aggregate(view: &View) -> Outcome {
    view.items()
        .iter()
        .flat_map(|item| item.all_jobs())
        .filter_map(|job| job.last_completed_build())
        .filter_map(|build| build.outcome())
        .filter(|outcome| is_aggregable(*outcome))
        .fold(Outcome::Success, Outcome::worse_of)
}
