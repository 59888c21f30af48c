//! View state: the last good snapshot, plus a guard against stale responses.
//!
//! A refresh takes a [`Ticket`] before it fetches. Taking a newer ticket, or
//! cancelling, makes every older ticket stale, and a response arriving with
//! a stale ticket is dropped instead of overwriting newer state. A failed
//! refresh records the error message but keeps whatever data was already
//! loaded. Derived status is never stored; it is recomputed from the current
//! snapshot each time it is asked for.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use smartgoal_core::{
    order_history, AssignmentStudentStatus, AssignmentSummary, Attempt, HistoryEntry,
    RosterPage, RosterQuery, Session, UserPublic,
};

use crate::api::ApiClient;
use crate::envelope::ApiResponse;

// ============================================================================
// Stale-response guard
// ============================================================================

/// Monotonic refresh counter shared by a view and its in-flight tickets.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    current: Arc<AtomicU64>,
}

/// Proof that a refresh was started at a given generation.
#[derive(Debug, Clone)]
pub struct Ticket {
    id: u64,
    current: Arc<AtomicU64>,
}

impl Generation {
    /// Creates a counter at generation zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new refresh, making every earlier ticket stale.
    #[must_use]
    pub fn issue(&self) -> Ticket {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            id,
            current: Arc::clone(&self.current),
        }
    }

    /// Makes every outstanding ticket stale.
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns `true` if `ticket` came from this counter and is the newest.
    #[must_use]
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        Arc::ptr_eq(&self.current, &ticket.current) && ticket.is_current()
    }
}

impl Ticket {
    /// Generation number this ticket was issued at.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns `true` if no newer ticket has been issued since this one.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }
}

// ============================================================================
// Loadable
// ============================================================================

/// Data loaded from the backend, with loading and error state.
#[derive(Debug)]
pub struct Loadable<T> {
    data: Option<T>,
    error: Option<String>,
    loading: bool,
    generation: Generation,
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
            generation: Generation::new(),
        }
    }
}

impl<T> Loadable<T> {
    /// Creates an empty, idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a refresh as started and returns its ticket.
    pub fn begin(&mut self) -> Ticket {
        self.loading = true;
        self.generation.issue()
    }

    /// Applies a response if its ticket is still current.
    ///
    /// Returns `false` when the response was stale and discarded. On failure
    /// the previous data is kept and only the error message changes.
    pub fn apply(&mut self, ticket: &Ticket, response: ApiResponse<T>) -> bool {
        if !self.generation.is_current(ticket) {
            warn!(ticket = ticket.id(), "Discarding stale response");
            return false;
        }

        self.loading = false;
        match response.outcome {
            Ok(data) => {
                debug!(elapsed = ?response.elapsed, "Refresh applied");
                self.data = Some(data);
                self.error = None;
            }
            Err(e) => {
                warn!(error = %e, "Refresh failed, keeping previous data");
                self.error = Some(e.to_string());
            }
        }
        true
    }

    /// Abandons any in-flight refresh.
    pub fn cancel(&mut self) {
        self.generation.invalidate();
        self.loading = false;
    }

    /// The last successfully loaded data.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Message from the most recent failed refresh, cleared on success.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns `true` while a refresh is outstanding.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }
}

// ============================================================================
// Assignment view
// ============================================================================

/// One user's attempts on an assignment, and the status derived from them.
#[derive(Debug)]
pub struct AssignmentView {
    assignment_id: String,
    student_id: Option<String>,
    viewer_is_teacher: bool,
    attempts: Loadable<Vec<Attempt>>,
}

impl AssignmentView {
    /// Creates a view of the viewer's own attempts.
    #[must_use]
    pub fn new(assignment_id: impl Into<String>, viewer_is_teacher: bool) -> Self {
        Self {
            assignment_id: assignment_id.into(),
            student_id: None,
            viewer_is_teacher,
            attempts: Loadable::new(),
        }
    }

    /// Shows a specific student's attempts instead (teacher review).
    #[must_use]
    pub fn for_student(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    /// Starts a refresh.
    pub fn begin_refresh(&mut self) -> Ticket {
        self.attempts.begin()
    }

    /// Fetches attempts, sorted chronologically.
    pub async fn fetch(&self, client: &ApiClient) -> ApiResponse<Vec<Attempt>> {
        client
            .list_attempts(&self.assignment_id, self.student_id.as_deref())
            .await
            .map(|mut attempts| {
                attempts.sort_by_key(|a| a.created_at);
                attempts
            })
    }

    /// Applies a fetched response unless it is stale.
    pub fn apply(&mut self, ticket: &Ticket, response: ApiResponse<Vec<Attempt>>) -> bool {
        self.attempts.apply(ticket, response)
    }

    /// Fetches and applies in one step.
    pub async fn refresh(&mut self, client: &ApiClient) -> bool {
        let ticket = self.begin_refresh();
        let response = self.fetch(client).await;
        self.apply(&ticket, response)
    }

    /// Loaded attempts in chronological order; empty before the first load.
    #[must_use]
    pub fn attempts(&self) -> &[Attempt] {
        self.attempts.data().map(Vec::as_slice).unwrap_or_default()
    }

    /// Status, resubmission eligibility and latest feedback for the viewer.
    #[must_use]
    pub fn summary(&self) -> AssignmentSummary<'_> {
        AssignmentSummary::resolve(self.attempts(), self.viewer_is_teacher)
    }

    /// Newest-first history of the loaded attempts.
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry<'_>> {
        order_history(self.attempts(), self.viewer_is_teacher)
    }

    /// Message from the last failed refresh.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.attempts.error()
    }

    /// Returns `true` once any refresh has succeeded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.attempts.data().is_some()
    }
}

// ============================================================================
// Roster view
// ============================================================================

/// The teacher roster for one assignment, with its current query.
#[derive(Debug)]
pub struct RosterView {
    course_id: String,
    assignment_id: String,
    rows: Loadable<Vec<AssignmentStudentStatus>>,
    /// Filter, sort and page settings applied by [`RosterView::page`].
    pub query: RosterQuery,
}

impl RosterView {
    /// Creates a roster view with the given query.
    #[must_use]
    pub fn new(
        course_id: impl Into<String>,
        assignment_id: impl Into<String>,
        query: RosterQuery,
    ) -> Self {
        Self {
            course_id: course_id.into(),
            assignment_id: assignment_id.into(),
            rows: Loadable::new(),
            query,
        }
    }

    /// Starts a refresh.
    pub fn begin_refresh(&mut self) -> Ticket {
        self.rows.begin()
    }

    /// Fetches the roster rows.
    pub async fn fetch(&self, client: &ApiClient) -> ApiResponse<Vec<AssignmentStudentStatus>> {
        client
            .assignment_roster(&self.course_id, &self.assignment_id)
            .await
    }

    /// Applies a fetched response unless it is stale.
    pub fn apply(
        &mut self,
        ticket: &Ticket,
        response: ApiResponse<Vec<AssignmentStudentStatus>>,
    ) -> bool {
        self.rows.apply(ticket, response)
    }

    /// Fetches and applies in one step.
    pub async fn refresh(&mut self, client: &ApiClient) -> bool {
        let ticket = self.begin_refresh();
        let response = self.fetch(client).await;
        self.apply(&ticket, response)
    }

    /// All loaded rows in backend order.
    #[must_use]
    pub fn rows(&self) -> &[AssignmentStudentStatus] {
        self.rows.data().map(Vec::as_slice).unwrap_or_default()
    }

    /// The current page under [`RosterView::query`].
    #[must_use]
    pub fn page(&self) -> RosterPage {
        self.query.apply(self.rows())
    }

    /// Message from the last failed refresh.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.rows.error()
    }
}

// ============================================================================
// Session loading
// ============================================================================

/// Fetches the current user and updates `session` accordingly.
///
/// On success the session is established; on any failure it is cleared.
pub async fn load_session(client: &ApiClient, session: &mut Session) -> ApiResponse<UserPublic> {
    let response = client.current_user().await;
    match &response.outcome {
        Ok(user) => session.establish(user.clone()),
        Err(e) => {
            debug!(error = %e, "No logged-in user");
            session.clear();
        }
    }
    response
}
