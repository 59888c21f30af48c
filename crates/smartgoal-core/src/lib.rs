//! smartgoal core
//!
//! Domain model, configuration, and the client-side status resolver for
//! SMART-goal assignment feedback.

pub mod config;
pub mod display;
pub mod error;
pub mod history;
pub mod model;
pub mod roster;
pub mod session;
pub mod status;

pub use config::{Config, OutputFormat, ENV_BASE_URL, ENV_SESSION_COOKIE};
pub use display::{friendly_date, initials, star_label, string_to_color};
pub use error::{CoreError, Result};
pub use history::{order_history, HistoryEntry};
pub use model::{
    AssignmentAttemptStatus, AssignmentCreate, AssignmentPublic, AssignmentStudentStatus,
    Attempt, AttemptCreate, CourseInvite, CoursePublic, CourseRole, EvalMetrics, Feedback,
    FeedbackCreate, FeedbackData, FilePublic, GroupUpdate, SmartData, UserPublic, MAX_RATING,
    MIN_RATING, UNASSIGNED_GROUP,
};
pub use roster::{
    filter_roster, sort_roster, GroupFilter, RosterPage, RosterQuery, SortDirection, SortKey,
};
pub use session::Session;
pub use status::{
    can_resubmit, resolve_assignment_status, resolve_attempt_status, resolve_raw_attempt_status,
    split_latest_feedback, to_public_status, AssignmentSummary, LatestFeedback,
};
