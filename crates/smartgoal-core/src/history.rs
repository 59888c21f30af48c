//! Newest-first attempt history with stable submission numbers.

use serde::Serialize;

use crate::model::{AssignmentAttemptStatus, Attempt};
use crate::status::{resolve_attempt_status, split_latest_feedback, LatestFeedback};

/// One attempt as shown in the history timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryEntry<'a> {
    /// 1-based submission number in chronological order ("Submission N").
    pub ordinal: usize,
    /// Whether this is the newest attempt.
    pub is_latest: bool,
    /// The attempt itself.
    pub attempt: &'a Attempt,
    /// Status of this attempt as seen by the viewer.
    pub status: AssignmentAttemptStatus,
    /// Latest human and AI feedback on this attempt.
    pub latest_feedback: LatestFeedback<'a>,
}

/// Orders attempts for display: newest first, numbered oldest first.
///
/// Attempts are put in chronological order by `created_at` (stably, so equal
/// timestamps keep their input order) to assign ordinals; the result is then
/// reversed. Submission numbers therefore never change as new attempts are
/// added, and exactly one entry is flagged as latest.
#[must_use]
pub fn order_history(attempts: &[Attempt], viewer_is_teacher: bool) -> Vec<HistoryEntry<'_>> {
    let mut chronological: Vec<&Attempt> = attempts.iter().collect();
    chronological.sort_by_key(|a| a.created_at);

    let newest = chronological.len();
    chronological
        .into_iter()
        .enumerate()
        .rev()
        .map(|(index, attempt)| HistoryEntry {
            ordinal: index + 1,
            is_latest: index + 1 == newest,
            attempt,
            status: resolve_attempt_status(attempt, viewer_is_teacher),
            latest_feedback: split_latest_feedback(attempt),
        })
        .collect()
}
