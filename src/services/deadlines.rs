use sqlx::PgPool;
use time::{Duration, PrimitiveDateTime};

use crate::db::models::Assignment;
use crate::repositories;

/// Result of the first-save lateness check for a new submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LatenessOutcome {
    pub(crate) is_late: bool,
    /// Provisional score pre-assigned to a late submission before any
    /// teacher grading. None for on-time submissions and for assignments
    /// that do not allow late submissions.
    pub(crate) provisional_points: Option<i32>,
}

/// floor(max_points * (1 - penalty/100)), in integer arithmetic.
pub(crate) fn penalized_points(max_points: i32, late_penalty_percentage: i32) -> i32 {
    let penalty = late_penalty_percentage.clamp(0, 100);
    max_points * (100 - penalty) / 100
}

pub(crate) fn is_deadline_expired(deadline: PrimitiveDateTime, now: PrimitiveDateTime) -> bool {
    now > deadline
}

pub(crate) fn time_remaining(
    deadline: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Option<Duration> {
    if is_deadline_expired(deadline, now) {
        return None;
    }
    Some(deadline - now)
}

pub(crate) fn format_time_remaining(remaining: Duration) -> String {
    let days = remaining.whole_days();
    let hours = remaining.whole_hours() % 24;
    let minutes = remaining.whole_minutes() % 60;
    let seconds = remaining.whole_seconds() % 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m {seconds}s")
    }
}

/// Lateness check performed once, when a submission is first persisted.
///
/// The deadline that applies is the one of the first (assignment, group)
/// link whose group holds an active membership for the student; without
/// such a link the submission counts as on time. The provisional penalty
/// score is only assigned when the assignment allows late submissions.
pub(crate) async fn evaluate_new_submission(
    pool: &PgPool,
    assignment: &Assignment,
    student_id: &str,
    now: PrimitiveDateTime,
) -> Result<LatenessOutcome, sqlx::Error> {
    let effective_deadline = repositories::assignment_groups::effective_deadline_for_student(
        pool,
        &assignment.id,
        student_id,
    )
    .await?;

    let is_late = effective_deadline
        .map(|deadline| is_deadline_expired(deadline, now))
        .unwrap_or(false);

    let provisional_points = (is_late && assignment.allow_late_submissions)
        .then(|| penalized_points(assignment.max_points, assignment.late_penalty_percentage));

    Ok(LatenessOutcome { is_late, provisional_points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn penalized_points_floors() {
        assert_eq!(penalized_points(100, 20), 80);
        assert_eq!(penalized_points(100, 0), 100);
        assert_eq!(penalized_points(100, 100), 0);
        assert_eq!(penalized_points(7, 50), 3);
        assert_eq!(penalized_points(99, 33), 66);
    }

    #[test]
    fn penalized_points_clamps_out_of_range_penalty() {
        assert_eq!(penalized_points(100, 150), 0);
        assert_eq!(penalized_points(100, -10), 100);
    }

    #[test]
    fn deadline_expiry_is_strict() {
        let deadline = datetime!(2025-05-01 12:00:00);
        assert!(!is_deadline_expired(deadline, datetime!(2025-05-01 12:00:00)));
        assert!(is_deadline_expired(deadline, datetime!(2025-05-01 12:00:01)));
        assert!(!is_deadline_expired(deadline, datetime!(2025-04-30 23:59:59)));
    }

    #[test]
    fn time_remaining_none_after_deadline() {
        let deadline = datetime!(2025-05-01 12:00:00);
        assert!(time_remaining(deadline, datetime!(2025-05-02 12:00:00)).is_none());
        let remaining =
            time_remaining(deadline, datetime!(2025-05-01 10:30:00)).expect("remaining");
        assert_eq!(remaining, Duration::minutes(90));
    }

    #[test]
    fn format_time_remaining_picks_coarsest_units() {
        assert_eq!(format_time_remaining(Duration::hours(50)), "2d 2h");
        assert_eq!(format_time_remaining(Duration::minutes(150)), "2h 30m");
        assert_eq!(format_time_remaining(Duration::seconds(95)), "1m 35s");
    }
}
