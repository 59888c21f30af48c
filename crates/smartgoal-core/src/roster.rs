//! Filtering, sorting and pagination of the teacher roster.
//!
//! [`RosterQuery::apply`] runs the stages in a fixed order: filter, sort,
//! paginate. Filtering first means a page is only short when it is the last
//! page of matching rows.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::AssignmentStudentStatus;

/// Which rows to keep based on group number parity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupFilter {
    /// Keep every row.
    #[default]
    All,
    /// Keep rows whose group number is even.
    Even,
    /// Keep rows whose group number is odd (unassigned rows included).
    Odd,
}

impl GroupFilter {
    /// Returns `true` if a row with this group number passes the filter.
    ///
    /// Odd uses `|group % 2| == 1`, so the unassigned sentinel `-1` is odd.
    ///
    /// # Examples
    ///
    /// ```
    /// use smartgoal_core::GroupFilter;
    ///
    /// assert!(GroupFilter::Even.matches(0));
    /// assert!(GroupFilter::Odd.matches(-1));
    /// assert!(!GroupFilter::Even.matches(-1));
    /// ```
    #[must_use]
    pub const fn matches(self, group: i64) -> bool {
        match self {
            Self::All => true,
            Self::Even => group % 2 == 0,
            Self::Odd => (group % 2).abs() == 1,
        }
    }
}

/// Roster column to sort by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Student name (default).
    #[default]
    Name,
    /// Student email.
    Email,
    /// Group number; unassigned sorts as `-1`.
    Group,
    /// Course role.
    Role,
    /// Number of attempts.
    Submissions,
    /// Assignment status, in workflow order.
    Status,
    /// Time of the latest attempt; missing or unparseable counts as earliest.
    LastAttemptDate,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first (default).
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

/// Keeps rows passing the group and needs-review filters, in input order.
#[must_use]
pub fn filter_roster(
    rows: &[AssignmentStudentStatus],
    group_filter: GroupFilter,
    needs_review: bool,
) -> Vec<AssignmentStudentStatus> {
    rows.iter()
        .filter(|row| group_filter.matches(row.group()))
        .filter(|row| !needs_review || row.status.needs_review())
        .cloned()
        .collect()
}

/// Sorts rows in place by `key` in `direction`.
///
/// Ties on the key fall back to the student id, making the order total:
/// sorting ascending and reversing gives exactly the descending order.
pub fn sort_roster(rows: &mut [AssignmentStudentStatus], key: SortKey, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let ordering = compare_by_key(a, b, key).then_with(|| a.student.id.cmp(&b.student.id));
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

fn compare_by_key(
    a: &AssignmentStudentStatus,
    b: &AssignmentStudentStatus,
    key: SortKey,
) -> Ordering {
    match key {
        SortKey::Name => a.student.name.cmp(&b.student.name),
        SortKey::Email => a.student.email.cmp(&b.student.email),
        SortKey::Group => a.group().cmp(&b.group()),
        SortKey::Role => a.role.cmp(&b.role),
        SortKey::Submissions => a.attempt_count.cmp(&b.attempt_count),
        SortKey::Status => a.status.cmp(&b.status),
        SortKey::LastAttemptDate => sortable_date(a).cmp(&sortable_date(b)),
    }
}

fn sortable_date(row: &AssignmentStudentStatus) -> DateTime<Utc> {
    row.last_attempt_at().unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Sort, filter and page settings for the roster table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterQuery {
    /// Group parity filter.
    pub group: GroupFilter,
    /// Keep only rows awaiting AI or teacher feedback.
    pub needs_review: bool,
    /// Column to sort by.
    pub sort_key: SortKey,
    /// Sort direction.
    pub direction: SortDirection,
    /// Zero-based page index.
    pub page: usize,
    /// Rows per page; `0` disables pagination.
    pub per_page: usize,
}

impl Default for RosterQuery {
    fn default() -> Self {
        Self {
            group: GroupFilter::All,
            needs_review: false,
            sort_key: SortKey::Name,
            direction: SortDirection::Asc,
            page: 0,
            per_page: 25,
        }
    }
}

/// One page of roster rows plus the totals needed to render a pager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterPage {
    /// Rows on this page.
    pub rows: Vec<AssignmentStudentStatus>,
    /// Zero-based page index actually shown (clamped to the last page).
    pub page: usize,
    /// Number of pages of matching rows (at least 1).
    pub page_count: usize,
    /// Rows matching the filters, across all pages.
    pub total_matching: usize,
    /// Rows before filtering.
    pub total_rows: usize,
}

impl RosterQuery {
    /// Filters, sorts, then paginates `rows`.
    #[must_use]
    pub fn apply(&self, rows: &[AssignmentStudentStatus]) -> RosterPage {
        let mut matching = filter_roster(rows, self.group, self.needs_review);
        sort_roster(&mut matching, self.sort_key, self.direction);

        let total_matching = matching.len();
        if self.per_page == 0 {
            return RosterPage {
                rows: matching,
                page: 0,
                page_count: 1,
                total_matching,
                total_rows: rows.len(),
            };
        }

        let page_count = total_matching.div_ceil(self.per_page).max(1);
        let page = self.page.min(page_count - 1);
        let rows_on_page = matching
            .into_iter()
            .skip(page * self.per_page)
            .take(self.per_page)
            .collect();

        RosterPage {
            rows: rows_on_page,
            page,
            page_count,
            total_matching,
            total_rows: rows.len(),
        }
    }
}
