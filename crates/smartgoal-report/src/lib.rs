//! smartgoal Report Generation
//!
//! Renders what the assignment and roster views show, either as Markdown
//! for people or as JSON for scripts.
//!
//! # Types
//!
//! - [`AssignmentOverview`] - one user's status, resubmission eligibility and
//!   newest-first submission history on an assignment
//! - [`RosterReport`] - one page of the teacher roster
//!
//! # Generators
//!
//! - [`json::JsonGenerator`] - compact or pretty JSON for either report
//! - [`MarkdownGenerator`] - human-readable Markdown
//!
//! # Example
//!
//! ```rust
//! use smartgoal_core::{AssignmentPublic, CoursePublic, CourseRole};
//! use smartgoal_report::{AssignmentOverview, MarkdownGenerator};
//!
//! let course = CoursePublic {
//!     id: "c1".to_string(),
//!     name: "Goals 101".to_string(),
//!     about: String::new(),
//!     your_role: Some(CourseRole::Student),
//!     your_group: Some(3),
//! };
//! let assignment = AssignmentPublic {
//!     id: "a1".to_string(),
//!     course_id: "c1".to_string(),
//!     name: "Week 1".to_string(),
//!     about: String::new(),
//!     scorable: false,
//! };
//!
//! let overview = AssignmentOverview::build(&course, &assignment, &[], None);
//! let markdown = MarkdownGenerator::overview(&overview);
//! assert!(markdown.contains("| Status | not started |"));
//! ```

pub mod json;
mod markdown;

pub use markdown::MarkdownGenerator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use smartgoal_core::{
    initials, model::timestamp, order_history, star_label, string_to_color,
    AssignmentAttemptStatus, AssignmentPublic, AssignmentStudentStatus, AssignmentSummary, Attempt,
    CoursePublic, CourseRole, Feedback, FilePublic, GroupFilter, RosterPage, RosterQuery,
};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to serialize the report to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to write the report file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

// ============================================================================
// Assignment Overview
// ============================================================================

/// A user's standing on one assignment, as shown to the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentOverview {
    /// Course name.
    pub course_name: String,
    /// Assignment name.
    pub assignment_name: String,
    /// The viewer's role in the course.
    pub viewer_role: CourseRole,
    /// Whose attempts are shown, when a teacher is reviewing a student.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<String>,
    /// Status as the viewer sees it.
    pub status: AssignmentAttemptStatus,
    /// Whether a new submission is allowed.
    pub can_resubmit: bool,
    /// Number of submissions.
    pub attempt_count: usize,
    /// Submissions, newest first.
    pub history: Vec<AttemptReport>,
}

/// One submission in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptReport {
    /// 1-based submission number, oldest first.
    pub ordinal: usize,
    /// Whether this is the newest submission.
    pub is_latest: bool,
    /// Attempt identifier.
    pub attempt_id: String,
    /// Submission time.
    #[serde(with = "timestamp")]
    pub submitted_at: DateTime<Utc>,
    /// Status of this submission as the viewer sees it.
    pub status: AssignmentAttemptStatus,
    /// SMART goal.
    pub goal: String,
    /// Action plan.
    pub plan: String,
    /// Attached files.
    #[serde(default)]
    pub files: Vec<FilePublic>,
    /// Latest teacher feedback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_feedback: Option<FeedbackReport>,
    /// Latest AI feedback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_feedback: Option<FeedbackReport>,
}

/// A feedback entry as rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReport {
    /// Feedback text.
    pub feedback: String,
    /// Additional comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_comments: Option<String>,
    /// Whether the attempt was approved.
    pub approved: bool,
    /// Score, for scorable assignments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    /// Teacher's evaluation of AI feedback; present only for teacher viewers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationReport>,
    /// Creation time.
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Star rating and problem tags left on AI feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Star rating 1-5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    /// Likert label for the rating.
    pub rating_label: String,
    /// Selected problem tags, sorted.
    #[serde(default)]
    pub problems: Vec<String>,
}

impl FeedbackReport {
    /// Builds the rendered form of a feedback entry.
    ///
    /// The evaluation is dropped unless the viewer is a teacher.
    #[must_use]
    pub fn from_feedback(feedback: &Feedback, viewer_is_teacher: bool) -> Self {
        let evaluation = feedback
            .data
            .eval
            .as_ref()
            .filter(|eval| viewer_is_teacher && !eval.is_empty())
            .map(|eval| EvaluationReport {
                rating: eval.rating,
                rating_label: star_label(eval.rating).to_string(),
                problems: eval.problems.iter().cloned().collect(),
            });

        Self {
            feedback: feedback.data.feedback.clone(),
            other_comments: feedback
                .data
                .other_comments
                .clone()
                .filter(|c| !c.trim().is_empty()),
            approved: feedback.data.approved,
            score: feedback.data.score,
            evaluation,
            created_at: feedback.created_at,
        }
    }
}

impl AssignmentOverview {
    /// Summarizes `attempts` for the viewer of `course`.
    ///
    /// Attempts may arrive in any order; they are put in chronological order
    /// before status is resolved.
    #[must_use]
    pub fn build(
        course: &CoursePublic,
        assignment: &AssignmentPublic,
        attempts: &[Attempt],
        student: Option<&str>,
    ) -> Self {
        let viewer_is_teacher = course.viewer_is_teacher();
        let mut ordered = attempts.to_vec();
        ordered.sort_by_key(|a| a.created_at);

        let summary = AssignmentSummary::resolve(&ordered, viewer_is_teacher);
        let history = order_history(&ordered, viewer_is_teacher)
            .into_iter()
            .map(|entry| AttemptReport {
                ordinal: entry.ordinal,
                is_latest: entry.is_latest,
                attempt_id: entry.attempt.id.clone(),
                submitted_at: entry.attempt.created_at,
                status: entry.status,
                goal: entry.attempt.data.goal.clone(),
                plan: entry.attempt.data.plan.clone(),
                files: entry.attempt.files.clone(),
                teacher_feedback: entry
                    .latest_feedback
                    .human
                    .map(|fb| FeedbackReport::from_feedback(fb, viewer_is_teacher)),
                ai_feedback: entry
                    .latest_feedback
                    .ai
                    .map(|fb| FeedbackReport::from_feedback(fb, viewer_is_teacher)),
            })
            .collect();

        Self {
            course_name: course.name.clone(),
            assignment_name: assignment.name.clone(),
            viewer_role: course.your_role.unwrap_or(CourseRole::Student),
            student: student.map(str::to_string),
            status: summary.status,
            can_resubmit: summary.can_resubmit,
            attempt_count: summary.attempt_count,
            history,
        }
    }
}

// ============================================================================
// Roster Report
// ============================================================================

/// One page of the roster, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterReport {
    /// Course name.
    pub course_name: String,
    /// Assignment name.
    pub assignment_name: String,
    /// Group parity filter in effect.
    pub group_filter: GroupFilter,
    /// Whether only rows needing review are shown.
    pub needs_review: bool,
    /// Zero-based page index shown.
    pub page: usize,
    /// Number of pages.
    pub page_count: usize,
    /// Rows matching the filters.
    pub total_matching: usize,
    /// Rows before filtering.
    pub total_rows: usize,
    /// Rows on this page.
    pub rows: Vec<RosterRow>,
}

/// One roster row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRow {
    /// Student id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Avatar initials.
    pub initials: String,
    /// Avatar colour (`#rrggbb`), keyed by email.
    pub avatar_color: String,
    /// Group number, if assigned.
    #[serde(default)]
    pub group: Option<i64>,
    /// Course role.
    pub role: CourseRole,
    /// Number of submissions.
    pub submissions: u32,
    /// Status of the latest submission.
    pub status: AssignmentAttemptStatus,
    /// Time of the latest submission, when known.
    #[serde(default)]
    pub last_attempt: Option<DateTime<Utc>>,
}

impl From<&AssignmentStudentStatus> for RosterRow {
    fn from(row: &AssignmentStudentStatus) -> Self {
        Self {
            id: row.student.id.clone(),
            name: row.student.name.clone(),
            email: row.student.email.clone(),
            initials: initials(&row.student.name),
            avatar_color: string_to_color(&row.student.email),
            group: row.group_num,
            role: row.role,
            submissions: row.attempt_count,
            status: row.status,
            last_attempt: row.last_attempt_at(),
        }
    }
}

impl RosterReport {
    /// Builds the report for a page produced by `query`.
    #[must_use]
    pub fn build(
        course: &CoursePublic,
        assignment: &AssignmentPublic,
        query: &RosterQuery,
        page: &RosterPage,
    ) -> Self {
        Self {
            course_name: course.name.clone(),
            assignment_name: assignment.name.clone(),
            group_filter: query.group,
            needs_review: query.needs_review,
            page: page.page,
            page_count: page.page_count,
            total_matching: page.total_matching,
            total_rows: page.total_rows,
            rows: page.rows.iter().map(RosterRow::from).collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
