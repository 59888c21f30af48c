//! Status resolution for attempts and assignments.
//!
//! Status is always derived from the feedback an attempt carries, never read
//! from a cached value:
//!
//! - no feedback: awaiting AI feedback
//! - only AI feedback: awaiting teacher feedback
//! - latest human feedback not approved: resubmission requested
//! - latest human feedback approved: complete
//!
//! Students never see the AI-processing state; for them it reads as awaiting
//! teacher feedback.

use serde::Serialize;

use crate::model::{AssignmentAttemptStatus, Attempt, Feedback};

/// The most recent feedback of each authorship type on an attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatestFeedback<'a> {
    /// Last human-authored entry, by insertion order.
    pub human: Option<&'a Feedback>,
    /// Last AI-authored entry, by insertion order.
    pub ai: Option<&'a Feedback>,
}

impl LatestFeedback<'_> {
    /// Returns `true` if the latest human feedback asked for a resubmission.
    #[must_use]
    pub fn resubmission_requested(&self) -> bool {
        self.human.is_some_and(|fb| !fb.data.approved)
    }
}

/// Splits an attempt's feedback into its latest human and latest AI entries.
///
/// Within each authorship type the last entry in insertion order wins, no
/// matter how many entries of that type precede it.
#[must_use]
pub fn split_latest_feedback(attempt: &Attempt) -> LatestFeedback<'_> {
    let human = attempt.feedbacks.iter().rev().find(|fb| !fb.is_ai);
    let ai = attempt.feedbacks.iter().rev().find(|fb| fb.is_ai);
    LatestFeedback { human, ai }
}

/// Resolves an attempt's status as stored, independent of who is looking.
#[must_use]
pub fn resolve_raw_attempt_status(attempt: &Attempt) -> AssignmentAttemptStatus {
    if attempt.feedbacks.is_empty() {
        return AssignmentAttemptStatus::AwaitingAiFeedback;
    }

    match split_latest_feedback(attempt).human {
        Some(fb) if fb.data.approved => AssignmentAttemptStatus::Complete,
        Some(_) => AssignmentAttemptStatus::ResubmissionRequested,
        None => AssignmentAttemptStatus::AwaitingTeacherFeedback,
    }
}

/// Maps a raw status to what a viewer of the given role is shown.
///
/// # Examples
///
/// ```
/// use smartgoal_core::{to_public_status, AssignmentAttemptStatus as S};
///
/// assert_eq!(to_public_status(S::AwaitingAiFeedback, true), S::AwaitingAiFeedback);
/// assert_eq!(to_public_status(S::AwaitingAiFeedback, false), S::AwaitingTeacherFeedback);
/// assert_eq!(to_public_status(S::Complete, false), S::Complete);
/// ```
#[must_use]
pub const fn to_public_status(
    status: AssignmentAttemptStatus,
    viewer_is_teacher: bool,
) -> AssignmentAttemptStatus {
    match status {
        AssignmentAttemptStatus::AwaitingAiFeedback if !viewer_is_teacher => {
            AssignmentAttemptStatus::AwaitingTeacherFeedback
        }
        other => other,
    }
}

/// Resolves the status of a single attempt as seen by the viewer.
#[must_use]
pub fn resolve_attempt_status(
    attempt: &Attempt,
    viewer_is_teacher: bool,
) -> AssignmentAttemptStatus {
    to_public_status(resolve_raw_attempt_status(attempt), viewer_is_teacher)
}

/// Resolves the assignment-level status from a user's attempts.
///
/// `attempts` must be in chronological (ascending) order. Only the most
/// recent attempt counts; with no attempts the assignment is not started.
#[must_use]
pub fn resolve_assignment_status(attempts: &[Attempt]) -> AssignmentAttemptStatus {
    attempts
        .last()
        .map_or(AssignmentAttemptStatus::NotStarted, resolve_raw_attempt_status)
}

/// Whether a new submission may be made in the given (raw) status.
///
/// This is the single place resubmission eligibility is decided.
#[must_use]
pub const fn can_resubmit(status: AssignmentAttemptStatus) -> bool {
    matches!(
        status,
        AssignmentAttemptStatus::NotStarted | AssignmentAttemptStatus::ResubmissionRequested
    )
}

/// Everything a view needs to know about one user's progress on an assignment.
///
/// Built fresh from an attempt snapshot each time it is needed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssignmentSummary<'a> {
    /// Status derived from the latest attempt, before viewer adjustment.
    pub raw_status: AssignmentAttemptStatus,
    /// Status the viewer is shown.
    pub status: AssignmentAttemptStatus,
    /// Whether a new submission is currently allowed.
    pub can_resubmit: bool,
    /// Number of attempts submitted.
    pub attempt_count: usize,
    /// The most recent attempt, if any.
    pub latest_attempt: Option<&'a Attempt>,
    /// Latest human and AI feedback on the most recent attempt.
    pub latest_feedback: LatestFeedback<'a>,
}

impl<'a> AssignmentSummary<'a> {
    /// Summarizes `attempts` (chronological order) for a viewer.
    #[must_use]
    pub fn resolve(attempts: &'a [Attempt], viewer_is_teacher: bool) -> Self {
        let raw_status = resolve_assignment_status(attempts);
        let latest_attempt = attempts.last();
        Self {
            raw_status,
            status: to_public_status(raw_status, viewer_is_teacher),
            can_resubmit: can_resubmit(raw_status),
            attempt_count: attempts.len(),
            latest_attempt,
            latest_feedback: latest_attempt.map(split_latest_feedback).unwrap_or_default(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
