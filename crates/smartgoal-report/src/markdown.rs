//! Markdown rendering of assignment overviews and roster pages.
//!
//! The overview has a summary table followed by the submission history,
//! newest first, with the latest teacher and AI feedback under each
//! submission. The roster is a single table with a pager line.

use std::fmt::Write;

use smartgoal_core::{friendly_date, GroupFilter};

use crate::{AssignmentOverview, AttemptReport, FeedbackReport, RosterReport, RosterRow};

/// Placeholder for empty table cells.
const EMPTY_CELL: &str = "-";

/// Renders reports as Markdown.
pub struct MarkdownGenerator;

impl MarkdownGenerator {
    /// Renders an assignment overview.
    #[must_use]
    pub fn overview(overview: &AssignmentOverview) -> String {
        let mut output = String::new();

        write_overview_summary(&mut output, overview);

        let _ = writeln!(output, "## History\n");
        if overview.history.is_empty() {
            let _ = writeln!(output, "*No submissions yet.*");
            return output;
        }

        for attempt in &overview.history {
            write_attempt(&mut output, attempt);
        }

        output
    }

    /// Renders one page of the roster.
    #[must_use]
    pub fn roster(report: &RosterReport) -> String {
        let mut output = String::new();

        let _ = writeln!(
            output,
            "# Roster: {} ({})\n",
            escape_markdown(&report.assignment_name),
            escape_markdown(&report.course_name)
        );

        if let Some(filters) = describe_filters(report) {
            let _ = writeln!(output, "*Filters: {filters}*\n");
        }

        let _ = writeln!(
            output,
            "Page {} of {} ({} of {} students match)\n",
            report.page + 1,
            report.page_count,
            report.total_matching,
            report.total_rows
        );

        if report.rows.is_empty() {
            let _ = writeln!(output, "*No students match the current filters.*");
            return output;
        }

        let _ = writeln!(
            output,
            "| Name | Email | Group | Role | Submissions | Status | Last attempt |"
        );
        let _ = writeln!(
            output,
            "|------|-------|-------|------|-------------|--------|--------------|"
        );
        for row in &report.rows {
            write_roster_row(&mut output, row);
        }

        output
    }
}

// ============================================================================
// Overview sections
// ============================================================================

fn write_overview_summary(output: &mut String, overview: &AssignmentOverview) {
    let _ = writeln!(
        output,
        "# {} ({})\n",
        escape_markdown(&overview.assignment_name),
        escape_markdown(&overview.course_name)
    );

    let _ = writeln!(output, "| Field | Value |");
    let _ = writeln!(output, "|-------|-------|");
    if let Some(student) = &overview.student {
        let _ = writeln!(output, "| Student | {} |", escape_markdown(student));
    }
    let _ = writeln!(output, "| Viewing as | {} |", overview.viewer_role);
    let _ = writeln!(output, "| Status | {} |", overview.status);
    let _ = writeln!(output, "| Submissions | {} |", overview.attempt_count);
    let _ = writeln!(
        output,
        "| New submission allowed | {} |",
        if overview.can_resubmit { "yes" } else { "no" }
    );
    let _ = writeln!(output);
}

fn write_attempt(output: &mut String, attempt: &AttemptReport) {
    let latest = if attempt.is_latest { " (latest)" } else { "" };
    let _ = writeln!(output, "### Submission {}{latest}\n", attempt.ordinal);
    let _ = writeln!(
        output,
        "*{}*, {}\n",
        friendly_date(&attempt.submitted_at),
        attempt.status
    );

    let _ = writeln!(output, "**SMART goal**: {}\n", escape_markdown(&attempt.goal));
    let _ = writeln!(output, "**Action plan**: {}\n", escape_markdown(&attempt.plan));

    if !attempt.files.is_empty() {
        let links: Vec<String> = attempt
            .files
            .iter()
            .map(|f| format!("[{}]({})", escape_markdown(&f.filename), f.read_url))
            .collect();
        let _ = writeln!(output, "**Files**: {}\n", links.join(", "));
    }

    match &attempt.teacher_feedback {
        Some(feedback) => write_feedback(output, "Teacher feedback", feedback),
        None => {
            let _ = writeln!(output, "*No teacher feedback yet.*\n");
        }
    }
    if let Some(feedback) = &attempt.ai_feedback {
        write_feedback(output, "AI feedback", feedback);
    }
}

fn write_feedback(output: &mut String, heading: &str, feedback: &FeedbackReport) {
    let verdict = if feedback.approved { "approved" } else { "not approved" };
    let _ = writeln!(
        output,
        "#### {heading} ({verdict}, {})\n",
        friendly_date(&feedback.created_at)
    );
    let _ = writeln!(output, "{}\n", escape_markdown(&feedback.feedback));

    if let Some(comments) = &feedback.other_comments {
        let _ = writeln!(output, "**Other comments**: {}\n", escape_markdown(comments));
    }
    if let Some(score) = feedback.score {
        let _ = writeln!(output, "**Score**: {score}\n");
    }
    if let Some(evaluation) = &feedback.evaluation {
        let rating = evaluation
            .rating
            .map_or_else(|| evaluation.rating_label.clone(), |r| {
                format!("{r}/5 ({})", evaluation.rating_label)
            });
        let _ = writeln!(output, "**Rating**: {rating}\n");
        if !evaluation.problems.is_empty() {
            let _ = writeln!(
                output,
                "**Problems**: {}\n",
                escape_markdown(&evaluation.problems.join(", "))
            );
        }
    }
}

// ============================================================================
// Roster rows
// ============================================================================

fn write_roster_row(output: &mut String, row: &RosterRow) {
    let group = row
        .group
        .map_or_else(|| EMPTY_CELL.to_string(), |g| g.to_string());
    let last = row
        .last_attempt
        .as_ref()
        .map_or_else(|| EMPTY_CELL.to_string(), friendly_date);
    let _ = writeln!(
        output,
        "| {} | {} | {group} | {} | {} | {} | {last} |",
        escape_markdown(&row.name),
        escape_markdown(&row.email),
        row.role,
        row.submissions,
        row.status,
    );
}

fn describe_filters(report: &RosterReport) -> Option<String> {
    let mut parts = Vec::new();
    match report.group_filter {
        GroupFilter::All => {}
        GroupFilter::Even => parts.push("even groups"),
        GroupFilter::Odd => parts.push("odd groups"),
    }
    if report.needs_review {
        parts.push("needs review");
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Escapes characters that would otherwise be read as Markdown.
///
/// Newlines become `<br>` so multi-line text stays inside its table cell.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            '\n' => result.push_str("<br>"),
            '\r' => {}
            _ => result.push(ch),
        }
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
