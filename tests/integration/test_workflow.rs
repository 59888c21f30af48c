//! End-to-end submission and review workflow against the mock backend.
//!
//! Status is never read from the backend: after every mutation the view
//! re-fetches attempts and derives status from the feedback they carry.

mod mock_backend;

use smartgoal_client::{AssignmentView, RosterView};
use smartgoal_core::{
    AssignmentAttemptStatus as Status, AttemptCreate, CourseRole, EvalMetrics, FeedbackCreate,
    FeedbackData, GroupFilter, RosterQuery, SmartData, SortDirection, SortKey,
};
use smartgoal_report::{AssignmentOverview, MarkdownGenerator, RosterReport};

use mock_backend::{assignment, course, MockBackend, ASSIGNMENT_ID, COURSE_ID, STUDENT_ID};

fn draft(goal: &str, file_ids: Vec<String>) -> AttemptCreate {
    AttemptCreate {
        assignment_id: ASSIGNMENT_ID.to_string(),
        data: SmartData::new(goal, "Train three times a week, log every run."),
        file_ids,
    }
}

fn teacher_feedback(attempt_id: &str, approved: bool) -> FeedbackCreate {
    FeedbackCreate {
        attempt_id: attempt_id.to_string(),
        data: FeedbackData::new(
            if approved {
                "Well scoped."
            } else {
                "Say by when."
            },
            approved,
        ),
    }
}

#[tokio::test]
async fn test_submit_review_resubmit_cycle() {
    let backend = MockBackend::start(CourseRole::Student).await;
    let client = backend.client();
    let mut view = AssignmentView::new(ASSIGNMENT_ID, false);

    // Nothing submitted yet.
    assert!(view.refresh(&client).await);
    let summary = view.summary();
    assert_eq!(summary.status, Status::NotStarted);
    assert!(summary.can_resubmit);

    // First submission with an attachment.
    let file = client
        .upload_file("plan.txt", b"week 1: 2k, week 2: 3k".to_vec())
        .await
        .into_result()
        .expect("upload");
    let first = client
        .create_attempt(&draft("Run 5k", vec![file.id.clone()]))
        .await
        .into_result()
        .expect("first attempt");
    assert_eq!(first.files, vec![file]);

    view.refresh(&client).await;
    let summary = view.summary();
    assert_eq!(summary.raw_status, Status::AwaitingAiFeedback);
    assert_eq!(summary.status, Status::AwaitingTeacherFeedback);
    assert!(!summary.can_resubmit);

    // AI agent responds; still waiting on the teacher.
    backend.add_ai_feedback(&first.id, false);
    view.refresh(&client).await;
    let summary = view.summary();
    assert_eq!(summary.raw_status, Status::AwaitingTeacherFeedback);
    assert!(summary.latest_feedback.ai.is_some());
    assert!(summary.latest_feedback.human.is_none());
    assert!(!summary.can_resubmit);

    // Teacher asks for a resubmission.
    backend.store().role = CourseRole::Teacher;
    client
        .create_feedback(&teacher_feedback(&first.id, false))
        .await
        .into_result()
        .expect("teacher feedback");
    backend.store().role = CourseRole::Student;

    view.refresh(&client).await;
    let summary = view.summary();
    assert_eq!(summary.status, Status::ResubmissionRequested);
    assert!(summary.can_resubmit);
    assert_eq!(
        summary.latest_feedback.human.map(|f| f.data.feedback.as_str()),
        Some("Say by when.")
    );

    // Resubmit.
    let second = client
        .create_attempt(&draft("Run 5k by June 30", Vec::new()))
        .await
        .into_result()
        .expect("second attempt");
    view.refresh(&client).await;

    let summary = view.summary();
    assert_eq!(summary.attempt_count, 2);
    assert_eq!(summary.status, Status::AwaitingTeacherFeedback);
    assert_eq!(summary.latest_attempt.map(|a| a.id.as_str()), Some(second.id.as_str()));

    let history = view.history();
    assert_eq!(history[0].attempt.id, second.id);
    assert_eq!(history[0].ordinal, 2);
    assert!(history[0].is_latest);
    assert_eq!(history[1].status, Status::ResubmissionRequested);
    assert!(!history[1].is_latest);

    // Teacher approves the resubmission.
    backend.store().role = CourseRole::Teacher;
    client
        .create_feedback(&teacher_feedback(&second.id, true))
        .await
        .into_result()
        .expect("approval");
    backend.store().role = CourseRole::Student;

    view.refresh(&client).await;
    let summary = view.summary();
    assert_eq!(summary.status, Status::Complete);
    assert!(!summary.can_resubmit);

    let overview = AssignmentOverview::build(
        &course(CourseRole::Student),
        &assignment(),
        view.attempts(),
        None,
    );
    let markdown = MarkdownGenerator::overview(&overview);
    assert!(markdown.contains("| Status | complete |"));
    assert!(markdown.contains("### Submission 2 (latest)"));
    assert!(markdown.contains("**Files**: [plan.txt](http://files.test/file-1)"));
}

#[tokio::test]
async fn test_teacher_reviews_student_attempts() {
    let backend = MockBackend::start(CourseRole::Student).await;
    let client = backend.client();
    let attempt = client
        .create_attempt(&draft("Read 12 books this year", Vec::new()))
        .await
        .into_result()
        .expect("attempt");
    backend.add_ai_feedback(&attempt.id, false);

    backend.store().role = CourseRole::Teacher;
    let mut view = AssignmentView::new(ASSIGNMENT_ID, true).for_student(STUDENT_ID);
    view.refresh(&client).await;
    assert_eq!(view.summary().status, Status::AwaitingTeacherFeedback);

    let mut ai = view.attempts()[0].feedbacks[0].clone();
    ai.data.eval = Some(EvalMetrics {
        rating: Some(2),
        problems: ["Too Vague".to_string()].into_iter().collect(),
    });
    let overview = AssignmentOverview::build(
        &course(CourseRole::Teacher),
        &assignment(),
        &[smartgoal_core::Attempt {
            feedbacks: vec![ai],
            ..view.attempts()[0].clone()
        }],
        Some("Ada Lovelace"),
    );
    let evaluation = overview.history[0]
        .ai_feedback
        .as_ref()
        .and_then(|f| f.evaluation.as_ref())
        .expect("teacher sees evaluation");
    assert_eq!(evaluation.rating_label, "Dissatisfied");
}

#[tokio::test]
async fn test_stale_refresh_is_discarded() {
    let backend = MockBackend::start(CourseRole::Student).await;
    let client = backend.client();
    let mut view = AssignmentView::new(ASSIGNMENT_ID, false);

    let stale_ticket = view.begin_refresh();
    let stale = view.fetch(&client).await;

    client
        .create_attempt(&draft("Run 5k", Vec::new()))
        .await
        .into_result()
        .expect("attempt");

    let ticket = view.begin_refresh();
    let fresh = view.fetch(&client).await;

    assert!(view.apply(&ticket, fresh));
    assert!(!view.apply(&stale_ticket, stale));
    assert_eq!(view.attempts().len(), 1);
    assert_eq!(view.summary().status, Status::AwaitingTeacherFeedback);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_attempts() {
    let backend = MockBackend::start(CourseRole::Student).await;
    let client = backend.client();
    client
        .create_attempt(&draft("Run 5k", Vec::new()))
        .await
        .into_result()
        .expect("attempt");

    let mut view = AssignmentView::new(ASSIGNMENT_ID, false);
    view.refresh(&client).await;
    assert_eq!(view.attempts().len(), 1);

    let dead = smartgoal_client::ApiClient::new(&smartgoal_core::Config {
        base_url: "http://127.0.0.1:9".to_string(),
        request_timeout_secs: 2,
        ..smartgoal_core::Config::default()
    })
    .expect("client builds");
    view.refresh(&dead).await;

    assert!(view.error().is_some_and(|e| e.starts_with("API error: ")));
    assert_eq!(view.attempts().len(), 1);
    assert_eq!(view.summary().status, Status::AwaitingTeacherFeedback);
}

#[tokio::test]
async fn test_roster_filters_and_group_update() {
    let backend = MockBackend::start(CourseRole::Student).await;
    let client = backend.client();
    client
        .create_attempt(&draft("Run 5k", Vec::new()))
        .await
        .into_result()
        .expect("attempt");
    backend.store().role = CourseRole::Teacher;

    let query = RosterQuery {
        sort_key: SortKey::Name,
        ..RosterQuery::default()
    };
    let mut roster = RosterView::new(COURSE_ID, ASSIGNMENT_ID, query);
    assert!(roster.refresh(&client).await);
    assert_eq!(roster.rows().len(), 3);

    let names: Vec<String> = roster
        .page()
        .rows
        .iter()
        .map(|r| r.student.name.clone())
        .collect();
    assert_eq!(names, ["Ada Lovelace", "Alan Turing", "Grace Hopper"]);

    // Unassigned counts as odd.
    roster.query.group = GroupFilter::Odd;
    let page = roster.page();
    assert_eq!(page.total_matching, 2);
    assert_eq!(page.total_rows, 3);

    roster.query.group = GroupFilter::All;
    roster.query.needs_review = true;
    let page = roster.page();
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].student.id, STUDENT_ID);
    assert_eq!(page.rows[0].status, Status::AwaitingAiFeedback);

    // Move Ada to an even group and re-fetch.
    let update = client
        .update_group(COURSE_ID, STUDENT_ID, Some(4))
        .await
        .into_result()
        .expect("group update");
    assert_eq!(update.group_num, Some(4));

    roster.query = RosterQuery {
        group: GroupFilter::Even,
        sort_key: SortKey::Group,
        direction: SortDirection::Desc,
        ..RosterQuery::default()
    };
    roster.refresh(&client).await;
    let page = roster.page();
    let groups: Vec<Option<i64>> = page.rows.iter().map(|r| r.group_num).collect();
    assert_eq!(groups, [Some(4), Some(2)]);

    let report = RosterReport::build(
        &course(CourseRole::Teacher),
        &assignment(),
        &roster.query,
        &page,
    );
    let markdown = MarkdownGenerator::roster(&report);
    assert!(markdown.contains("*Filters: even groups*"));
    assert!(markdown.contains("| Ada Lovelace | student-1@example.org | 4 | student | 1 |"));
}
