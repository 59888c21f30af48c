//! Domain types exchanged with the smartgoal backend.
//!
//! These mirror the backend's public JSON shapes. Loosely-typed payloads
//! (the attempt's SMART data and the feedback data) are given explicit record
//! types here, with `validate` methods the client runs before sending drafts.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Group number used when a roster row has no group assigned.
pub const UNASSIGNED_GROUP: i64 = -1;

/// Lowest accepted star rating.
pub const MIN_RATING: u8 = 1;

/// Highest accepted star rating.
pub const MAX_RATING: u8 = 5;

// ============================================================================
// Timestamps
// ============================================================================

/// Serde helpers for backend timestamps.
///
/// The backend emits either RFC 3339 or naive ISO 8601 (no offset); naive
/// values are taken as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Parses a backend timestamp, returning `None` when it is unparseable.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartgoal_core::model::timestamp;
    ///
    /// assert!(timestamp::parse("2024-05-30T15:14:00Z").is_some());
    /// assert!(timestamp::parse("2024-05-30T15:14:00.123456").is_some());
    /// assert!(timestamp::parse("yesterday").is_none());
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Serializes as RFC 3339 with a `Z` suffix.
    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    /// Deserializes a timestamp; an unparseable value becomes the Unix epoch.
    ///
    /// Entities carrying a malformed date still load and simply sort as the
    /// earliest possible entry.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(parse(&raw).unwrap_or_else(|| {
            tracing::warn!(raw = %raw, "Unparseable timestamp, treating as earliest");
            DateTime::<Utc>::default()
        }))
    }
}

// ============================================================================
// Users and Courses
// ============================================================================

/// Public profile of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPublic {
    /// User identifier.
    pub id: String,
    /// Identity-provider subject.
    #[serde(default)]
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Avatar picture URL, if the identity provider supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Role a user holds within a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseRole {
    /// Submits attempts.
    Student,
    /// Reviews attempts and sees the roster.
    Teacher,
}

impl std::fmt::Display for CourseRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Teacher => write!(f, "teacher"),
        }
    }
}

/// A course as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoursePublic {
    /// Course identifier.
    pub id: String,
    /// Course name.
    pub name: String,
    /// Markdown description.
    #[serde(default)]
    pub about: String,
    /// The requesting user's role in this course, if enrolled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub your_role: Option<CourseRole>,
    /// The requesting user's group number in this course, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub your_group: Option<i64>,
}

impl CoursePublic {
    /// Returns `true` if the viewer is a teacher of this course.
    #[must_use]
    pub fn viewer_is_teacher(&self) -> bool {
        self.your_role == Some(CourseRole::Teacher)
    }
}

/// Enrollment details looked up by invite key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInvite {
    /// The course the key belongs to.
    pub course: CoursePublic,
    /// Role granted on acceptance.
    pub invite_role: CourseRole,
    /// Whether the requesting user is already enrolled.
    #[serde(default)]
    pub already_enrolled: bool,
}

/// Request body for updating a course member's group number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupUpdate {
    /// New group number, or `None` to unassign.
    pub group_num: Option<i64>,
}

// ============================================================================
// Assignments
// ============================================================================

/// Request body for creating an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentCreate {
    /// Assignment name.
    pub name: String,
    /// Markdown description.
    pub about: String,
    /// Whether feedback carries a numeric score.
    pub scorable: bool,
}

/// An assignment as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentPublic {
    /// Assignment identifier.
    pub id: String,
    /// Owning course.
    pub course_id: String,
    /// Assignment name.
    pub name: String,
    /// Markdown description.
    #[serde(default)]
    pub about: String,
    /// Whether feedback carries a numeric score.
    #[serde(default)]
    pub scorable: bool,
}

// ============================================================================
// Attempt Status
// ============================================================================

/// Status of a student's attempt(s) on an assignment.
///
/// Variants are declared in workflow order, which is also their sort order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentAttemptStatus {
    /// No attempt has been submitted.
    #[default]
    #[serde(alias = "not started")]
    NotStarted,
    /// Submitted; no feedback of any kind yet.
    AwaitingAiFeedback,
    /// AI feedback present; no teacher feedback yet.
    #[serde(alias = "awaiting feedback")]
    AwaitingTeacherFeedback,
    /// Latest teacher feedback did not approve the attempt.
    #[serde(alias = "awaiting resubmission")]
    ResubmissionRequested,
    /// Latest teacher feedback approved the attempt.
    #[serde(alias = "complete")]
    Complete,
}

impl AssignmentAttemptStatus {
    /// Returns `true` if an attempt in this status is waiting on a reviewer.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartgoal_core::AssignmentAttemptStatus;
    ///
    /// assert!(AssignmentAttemptStatus::AwaitingAiFeedback.needs_review());
    /// assert!(AssignmentAttemptStatus::AwaitingTeacherFeedback.needs_review());
    /// assert!(!AssignmentAttemptStatus::Complete.needs_review());
    /// ```
    #[must_use]
    pub const fn needs_review(&self) -> bool {
        matches!(self, Self::AwaitingAiFeedback | Self::AwaitingTeacherFeedback)
    }

    /// Returns a human-readable description of the status.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::AwaitingAiFeedback => "awaiting AI feedback",
            Self::AwaitingTeacherFeedback => "awaiting teacher feedback",
            Self::ResubmissionRequested => "resubmission requested",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for AssignmentAttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Serde helpers for status fields the display logic does not depend on.
///
/// Besides its own names the backend has sent lowercase phrases
/// (`"awaiting feedback"`); those are accepted as aliases. Anything else
/// is logged and dropped so one odd row never fails a whole list.
pub mod lenient_status {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::AssignmentAttemptStatus;

    fn parse(value: Value) -> Option<AssignmentAttemptStatus> {
        match AssignmentAttemptStatus::deserialize(&value) {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!(value = %value, error = %e, "Ignoring unknown attempt status");
                None
            }
        }
    }

    /// Deserializes an optional status; unknown values become `None`.
    pub fn deserialize_option<'de, D>(
        deserializer: D,
    ) -> Result<Option<AssignmentAttemptStatus>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Value>::deserialize(deserializer)?.and_then(parse))
    }

    /// Deserializes a status; unknown or null values become `NotStarted`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<AssignmentAttemptStatus, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(deserialize_option(deserializer)?.unwrap_or_default())
    }
}

// ============================================================================
// Attempts and Files
// ============================================================================

/// A SMART goal and the plan to reach it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartData {
    /// SMART goal formulation.
    pub goal: String,
    /// Action plan.
    pub plan: String,
}

impl SmartData {
    /// Creates a new SMART goal/plan payload.
    #[must_use]
    pub fn new(goal: impl Into<String>, plan: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            plan: plan.into(),
        }
    }

    /// Checks that both goal and plan contain text.
    pub fn validate(&self) -> Result<()> {
        if self.goal.trim().is_empty() {
            return Err(CoreError::invalid_submission("goal must not be empty"));
        }
        if self.plan.trim().is_empty() {
            return Err(CoreError::invalid_submission("plan must not be empty"));
        }
        Ok(())
    }
}

/// A file stored by the backend's file service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePublic {
    /// File identifier, referenced from [`AttemptCreate::file_ids`].
    pub id: String,
    /// Original file name.
    #[serde(alias = "name")]
    pub filename: String,
    /// Signed, directly fetchable URL.
    pub read_url: String,
}

/// Request body for creating an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCreate {
    /// Assignment being attempted.
    pub assignment_id: String,
    /// SMART goal and plan.
    pub data: SmartData,
    /// Previously uploaded files to attach.
    #[serde(default)]
    pub file_ids: Vec<String>,
}

/// A single submission against an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// Attempt identifier.
    pub id: String,
    /// Assignment the attempt belongs to.
    pub assignment_id: String,
    /// Submitting user.
    pub user_id: String,
    /// SMART goal and plan.
    pub data: SmartData,
    /// Attached files, in upload order.
    #[serde(default)]
    pub files: Vec<FilePublic>,
    /// Feedback entries in insertion (chronological) order.
    #[serde(default, alias = "feedback")]
    pub feedbacks: Vec<Feedback>,
    /// Submission time.
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Status as last stored by the backend, if it reports one.
    ///
    /// Display logic never trusts this; status is re-derived from `feedbacks`.
    #[serde(
        default,
        deserialize_with = "lenient_status::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<AssignmentAttemptStatus>,
}

// ============================================================================
// Feedback
// ============================================================================

/// Teacher meta-evaluation of an AI feedback entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalMetrics {
    /// Likert star rating from 1 to 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    /// Selected problem tags (e.g. "Grammar", "Assignment Relevance").
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub problems: BTreeSet<String>,
}

impl EvalMetrics {
    /// Returns `true` if no rating and no problems were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.problems.is_empty()
    }
}

/// The payload of a feedback entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackData {
    /// Feedback text.
    pub feedback: String,
    /// Additional free-text comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_comments: Option<String>,
    /// Whether the attempt is approved.
    #[serde(default)]
    pub approved: bool,
    /// Score, for scorable assignments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    /// Evaluation of the AI feedback, teacher-only.
    #[serde(
        default,
        rename = "eval_metrics",
        alias = "eval",
        skip_serializing_if = "Option::is_none"
    )]
    pub eval: Option<EvalMetrics>,
}

impl FeedbackData {
    /// Creates feedback with the given text and approval decision.
    #[must_use]
    pub fn new(feedback: impl Into<String>, approved: bool) -> Self {
        Self {
            feedback: feedback.into(),
            approved,
            ..Self::default()
        }
    }

    /// Checks the payload before it is sent to the backend.
    ///
    /// Rejects empty feedback text, a negative score, and a star rating
    /// outside 1–5.
    pub fn validate(&self) -> Result<()> {
        if self.feedback.trim().is_empty() {
            return Err(CoreError::invalid_feedback("feedback text must not be empty"));
        }
        if let Some(score) = self.score {
            if score < 0 {
                return Err(CoreError::invalid_feedback(format!(
                    "score must not be negative (got {score})"
                )));
            }
        }
        if let Some(rating) = self.eval.as_ref().and_then(|e| e.rating) {
            if !(MIN_RATING..=MAX_RATING).contains(&rating) {
                return Err(CoreError::invalid_feedback(format!(
                    "rating must be between {MIN_RATING} and {MAX_RATING} (got {rating})"
                )));
            }
        }
        Ok(())
    }
}

/// Request body for creating feedback on an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCreate {
    /// Attempt being reviewed.
    pub attempt_id: String,
    /// Feedback payload.
    pub data: FeedbackData,
}

/// A review record attached to an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    /// Feedback identifier.
    pub id: String,
    /// Attempt under review.
    pub attempt_id: String,
    /// Authoring user; absent for AI-authored feedback.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Whether the AI agent wrote this entry.
    #[serde(default)]
    pub is_ai: bool,
    /// Creation time.
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Feedback payload.
    pub data: FeedbackData,
}

// ============================================================================
// Roster
// ============================================================================

/// One student's standing on an assignment (a roster row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentStudentStatus {
    /// The course member.
    pub student: UserPublic,
    /// The member's course role.
    pub role: CourseRole,
    /// Group number, if assigned.
    #[serde(default)]
    pub group_num: Option<i64>,
    /// Number of attempts submitted.
    #[serde(default)]
    pub attempt_count: u32,
    /// Time of the latest attempt, kept raw so a malformed value still loads.
    #[serde(default)]
    pub last_attempt_date: Option<String>,
    /// Status of the latest attempt.
    #[serde(default, deserialize_with = "lenient_status::deserialize")]
    pub status: AssignmentAttemptStatus,
}

impl AssignmentStudentStatus {
    /// Group number with unassigned rows mapped to [`UNASSIGNED_GROUP`].
    #[must_use]
    pub fn group(&self) -> i64 {
        self.group_num.unwrap_or(UNASSIGNED_GROUP)
    }

    /// Parsed time of the latest attempt; `None` when missing or unparseable.
    #[must_use]
    pub fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
        self.last_attempt_date.as_deref().and_then(timestamp::parse)
    }
}

// ============================================================================
// Tests
// ============================================================================
