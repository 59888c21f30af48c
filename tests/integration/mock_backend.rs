//! In-process smartgoal backend for integration tests.
//!
//! Serves the same routes as the real backend from an in-memory store, on an
//! ephemeral local port. AI feedback is injected directly into the store,
//! standing in for the backend's feedback agent.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use smartgoal_client::ApiClient;
use smartgoal_core::{
    AssignmentAttemptStatus, AssignmentCreate, AssignmentPublic, AssignmentStudentStatus, Attempt,
    AttemptCreate, Config, CourseInvite, CoursePublic, CourseRole, Feedback, FeedbackCreate,
    FeedbackData, FilePublic, GroupUpdate, UserPublic,
};
use tokio::net::TcpListener;

pub const SESSION_COOKIE: &str = "session=student-1";
pub const COURSE_ID: &str = "course-1";
pub const ASSIGNMENT_ID: &str = "assignment-1";
pub const STUDENT_ID: &str = "student-1";
pub const TEACHER_ID: &str = "teacher-1";
pub const INVITE_KEY: &str = "join-goals-101";

/// Goals longer than this are rejected with a plain-text 413.
pub const MAX_GOAL_LEN: usize = 4096;

/// Backend state shared by all handlers.
#[derive(Debug)]
pub struct Store {
    pub role: CourseRole,
    pub attempts: Vec<Attempt>,
    pub files: Vec<FilePublic>,
    pub roster: Vec<AssignmentStudentStatus>,
    pub assignments: Vec<AssignmentPublic>,
    next_id: u64,
    clock: DateTime<Utc>,
}

impl Store {
    fn new(role: CourseRole) -> Self {
        Self {
            role,
            attempts: Vec::new(),
            files: Vec::new(),
            assignments: vec![assignment()],
            roster: vec![
                roster_row(STUDENT_ID, "Ada Lovelace", Some(1)),
                roster_row("student-2", "Grace Hopper", Some(2)),
                roster_row("student-3", "Alan Turing", None),
            ],
            next_id: 0,
            clock: Utc
                .with_ymd_and_hms(2024, 5, 30, 9, 0, 0)
                .single()
                .expect("valid start time"),
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    /// Advances the synthetic clock so every entity gets a distinct time.
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += Duration::minutes(1);
        self.clock
    }

    fn push_feedback(
        &mut self,
        attempt_id: &str,
        is_ai: bool,
        data: FeedbackData,
    ) -> Option<Feedback> {
        let id = self.next_id("feedback");
        let created_at = self.tick();
        let attempt = self.attempts.iter_mut().find(|a| a.id == attempt_id)?;
        let feedback = Feedback {
            id,
            attempt_id: attempt_id.to_string(),
            user_id: (!is_ai).then(|| TEACHER_ID.to_string()),
            is_ai,
            created_at,
            data,
        };
        attempt.feedbacks.push(feedback.clone());
        Some(feedback)
    }
}

fn roster_row(id: &str, name: &str, group: Option<i64>) -> AssignmentStudentStatus {
    AssignmentStudentStatus {
        student: UserPublic {
            id: id.to_string(),
            sub: format!("oauth|{id}"),
            name: name.to_string(),
            email: format!("{id}@example.org"),
            picture: None,
        },
        role: CourseRole::Student,
        group_num: group,
        attempt_count: 0,
        last_attempt_date: None,
        status: AssignmentAttemptStatus::NotStarted,
    }
}

type Shared = Arc<Mutex<Store>>;

/// A running mock backend.
pub struct MockBackend {
    pub addr: SocketAddr,
    store: Shared,
}

impl MockBackend {
    /// Starts a backend where the logged-in user has `role` in the course.
    pub async fn start(role: CourseRole) -> Self {
        let store = Arc::new(Mutex::new(Store::new(role)));
        let addr = serve(router(Arc::clone(&store))).await;
        Self { addr, store }
    }

    /// Client configuration pointing at this backend with a valid session.
    pub fn config(&self) -> Config {
        Config {
            base_url: format!("http://{}", self.addr),
            session_cookie: Some(SESSION_COOKIE.to_string()),
            request_timeout_secs: 5,
            ..Config::default()
        }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.config()).expect("client builds")
    }

    pub fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().expect("store lock")
    }

    /// Records feedback from the AI agent on an attempt.
    pub fn add_ai_feedback(&self, attempt_id: &str, approved: bool) -> Feedback {
        self.store()
            .push_feedback(
                attempt_id,
                true,
                FeedbackData::new("Consider making the goal time-bound.", approved),
            )
            .expect("attempt exists")
    }
}

/// Serves `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock backend");
    });
    addr
}

fn router(store: Shared) -> Router {
    Router::new()
        .route("/api/v1/auth/me", get(current_user))
        .route("/api/v1/course/", get(list_courses))
        .route("/api/v1/course/:course_id", get(get_course))
        .route("/api/v1/course/enroll/:invite_key", get(lookup_invite))
        .route(
            "/api/v1/course/:course_id/assignment",
            get(list_assignments).put(create_assignment),
        )
        .route(
            "/api/v1/course/:course_id/assignment/:assignment_id/status",
            get(assignment_roster),
        )
        .route("/api/v1/course/:course_id/user/:user_id/group", put(update_group))
        .route("/api/v1/attempt/", get(list_attempts).put(create_attempt))
        .route("/api/v1/attempt/:attempt_id", get(get_attempt))
        .route("/api/v1/attempt/:attempt_id/feedback", put(create_feedback))
        .route("/api/v1/file/", put(upload_file))
        .with_state(store)
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn student() -> UserPublic {
    UserPublic {
        id: STUDENT_ID.to_string(),
        sub: format!("oauth|{STUDENT_ID}"),
        name: "Ada Lovelace".to_string(),
        email: "student-1@example.org".to_string(),
        picture: None,
    }
}

pub fn course(role: CourseRole) -> CoursePublic {
    CoursePublic {
        id: COURSE_ID.to_string(),
        name: "Goals 101".to_string(),
        about: "Setting goals that stick.".to_string(),
        your_role: Some(role),
        your_group: (role == CourseRole::Student).then_some(1),
    }
}

pub fn assignment() -> AssignmentPublic {
    AssignmentPublic {
        id: ASSIGNMENT_ID.to_string(),
        course_id: COURSE_ID.to_string(),
        name: "Week 1".to_string(),
        about: "Write one SMART goal.".to_string(),
        scorable: false,
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

async fn current_user(headers: HeaderMap) -> Response {
    let authenticated = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(SESSION_COOKIE));
    if authenticated {
        Json(student()).into_response()
    } else {
        detail(StatusCode::UNAUTHORIZED, "Not authenticated")
    }
}

async fn list_courses(State(store): State<Shared>) -> Json<Vec<CoursePublic>> {
    let role = store.lock().expect("store lock").role;
    Json(vec![course(role)])
}

async fn get_course(State(store): State<Shared>, Path(course_id): Path<String>) -> Response {
    if course_id != COURSE_ID {
        return detail(StatusCode::NOT_FOUND, "Course not found");
    }
    let role = store.lock().expect("store lock").role;
    Json(course(role)).into_response()
}

async fn list_assignments(State(store): State<Shared>, Path(course_id): Path<String>) -> Response {
    if course_id != COURSE_ID {
        return detail(StatusCode::NOT_FOUND, "Course not found");
    }
    Json(store.lock().expect("store lock").assignments.clone()).into_response()
}

async fn create_assignment(
    State(store): State<Shared>,
    Path(course_id): Path<String>,
    Json(body): Json<AssignmentCreate>,
) -> Response {
    if course_id != COURSE_ID {
        return detail(StatusCode::NOT_FOUND, "Course not found");
    }
    let mut store = store.lock().expect("store lock");
    if store.role != CourseRole::Teacher {
        return detail(StatusCode::FORBIDDEN, "Only teachers can create assignments");
    }
    if body.name.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"loc": ["body", "name"], "msg": "name must not be empty"}]})),
        )
            .into_response();
    }

    let assignment = AssignmentPublic {
        id: store.next_id("assignment"),
        course_id,
        name: body.name,
        about: body.about,
        scorable: body.scorable,
    };
    store.assignments.push(assignment.clone());
    Json(assignment).into_response()
}

async fn lookup_invite(Path(invite_key): Path<String>) -> Response {
    if invite_key != INVITE_KEY {
        return detail(StatusCode::NOT_FOUND, "Invite not found");
    }
    Json(CourseInvite {
        course: course(CourseRole::Student),
        invite_role: CourseRole::Student,
        already_enrolled: false,
    })
    .into_response()
}

async fn assignment_roster(
    State(store): State<Shared>,
    Path((_course_id, _assignment_id)): Path<(String, String)>,
) -> Response {
    let store = store.lock().expect("store lock");
    if store.role != CourseRole::Teacher {
        return detail(StatusCode::FORBIDDEN, "Only teachers can view the roster");
    }
    Json(store.roster.clone()).into_response()
}

async fn update_group(
    State(store): State<Shared>,
    Path((_course_id, user_id)): Path<(String, String)>,
    Json(update): Json<GroupUpdate>,
) -> Response {
    let mut store = store.lock().expect("store lock");
    if store.role != CourseRole::Teacher {
        return detail(StatusCode::FORBIDDEN, "Only teachers can change groups");
    }
    match store.roster.iter_mut().find(|row| row.student.id == user_id) {
        Some(row) => {
            row.group_num = update.group_num;
            Json(update).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "User not enrolled"),
    }
}

#[derive(Deserialize)]
struct AttemptQuery {
    assignment_id: String,
    user_id: Option<String>,
}

async fn list_attempts(
    State(store): State<Shared>,
    Query(query): Query<AttemptQuery>,
) -> Json<Vec<Attempt>> {
    let store = store.lock().expect("store lock");
    let user_id = query.user_id.as_deref().unwrap_or(STUDENT_ID);
    Json(
        store
            .attempts
            .iter()
            .filter(|a| a.assignment_id == query.assignment_id && a.user_id == user_id)
            .cloned()
            .collect(),
    )
}

#[derive(Deserialize)]
struct CreateAttemptQuery {
    assignment_id: String,
}

async fn create_attempt(
    State(store): State<Shared>,
    Query(query): Query<CreateAttemptQuery>,
    Json(body): Json<AttemptCreate>,
) -> Response {
    if body.data.goal.len() > MAX_GOAL_LEN {
        return (StatusCode::PAYLOAD_TOO_LARGE, "payload too large").into_response();
    }

    let mut store = store.lock().expect("store lock");
    let mut files = Vec::with_capacity(body.file_ids.len());
    let mut unknown = Vec::new();
    for id in &body.file_ids {
        match store.files.iter().find(|f| &f.id == id) {
            Some(file) => files.push(file.clone()),
            None => unknown.push(json!({
                "loc": ["body", "file_ids"],
                "msg": format!("unknown file id {id}"),
                "type": "value_error",
            })),
        }
    }
    if !unknown.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": unknown })),
        )
            .into_response();
    }

    let id = store.next_id("attempt");
    let created_at = store.tick();
    let attempt = Attempt {
        id,
        assignment_id: query.assignment_id,
        user_id: STUDENT_ID.to_string(),
        data: body.data,
        files,
        feedbacks: Vec::new(),
        created_at,
        status: Some(AssignmentAttemptStatus::AwaitingAiFeedback),
    };
    store.attempts.push(attempt.clone());

    if let Some(row) = store.roster.iter_mut().find(|r| r.student.id == STUDENT_ID) {
        row.attempt_count += 1;
        row.last_attempt_date = Some(created_at.naive_utc().to_string().replace(' ', "T"));
        row.status = AssignmentAttemptStatus::AwaitingAiFeedback;
    }

    Json(attempt).into_response()
}

async fn get_attempt(State(store): State<Shared>, Path(attempt_id): Path<String>) -> Response {
    let store = store.lock().expect("store lock");
    match store.attempts.iter().find(|a| a.id == attempt_id) {
        Some(attempt) => Json(attempt.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Attempt not found"),
    }
}

async fn create_feedback(
    State(store): State<Shared>,
    Path(attempt_id): Path<String>,
    Json(body): Json<FeedbackCreate>,
) -> Response {
    let mut store = store.lock().expect("store lock");
    if store.role != CourseRole::Teacher {
        return detail(StatusCode::FORBIDDEN, "Only teachers can leave feedback");
    }
    match store.push_feedback(&attempt_id, false, body.data) {
        Some(feedback) => Json(feedback).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Attempt not found"),
    }
}

async fn upload_file(State(store): State<Shared>, mut multipart: Multipart) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        if field.bytes().await.is_err() {
            return detail(StatusCode::BAD_REQUEST, "Could not read upload");
        }

        let mut store = store.lock().expect("store lock");
        let id = store.next_id("file");
        let file = FilePublic {
            read_url: format!("http://files.test/{id}"),
            id,
            filename,
        };
        store.files.push(file.clone());
        return Json(file).into_response();
    }
    detail(StatusCode::BAD_REQUEST, "No file field in upload")
}
