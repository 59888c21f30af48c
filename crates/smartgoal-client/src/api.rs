//! Typed client for the smartgoal backend REST API.
//!
//! [`ApiClient`] wraps a [`reqwest::Client`] and exposes one method per
//! endpoint. Each method returns an [`ApiResponse`]; nothing here returns
//! `Err` or panics on a failed call.

use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use smartgoal_core::{
    AssignmentCreate, AssignmentPublic, AssignmentStudentStatus, Attempt, AttemptCreate, Config,
    CourseInvite, CoursePublic, Feedback, FeedbackCreate, FilePublic, GroupUpdate, UserPublic,
};

use crate::envelope::{decode_body, ApiResponse};
use crate::error::ApiError;

/// Multipart field name the file service reads uploads from.
pub const UPLOAD_FIELD: &str = "file";

/// Async client for the backend API.
///
/// Cheap to clone; clones share the underlying connection pool.
///
/// # Example
///
/// ```no_run
/// use smartgoal_client::ApiClient;
/// use smartgoal_core::Config;
///
/// # async fn example() -> Result<(), smartgoal_client::ApiError> {
/// let client = ApiClient::new(&Config::default())?;
/// let response = client.list_courses().await;
/// for course in response.into_result()? {
///     println!("{}", course.name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_root: String,
}

impl ApiClient {
    /// Builds a client from configuration.
    ///
    /// Applies the request timeout and forwards the configured session
    /// cookie on every request. Cookies set by the backend are kept for the
    /// lifetime of the client.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the API root is not a valid URL, the
    /// cookie is not a valid header value, or the HTTP client cannot be
    /// built.
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let api_root = config.api_root();
        Url::parse(&api_root)
            .map_err(|e| ApiError::Client(format!("invalid API root '{api_root}': {e}")))?;

        let mut headers = HeaderMap::new();
        if let Some(cookie) = config
            .session_cookie
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ApiError::Client(format!("invalid session cookie: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        debug!(api_root = %api_root, "API client ready");
        Ok(Self { http, api_root })
    }

    /// Root every endpoint path is joined onto, e.g. `http://host/api/v1`.
    #[must_use]
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path)
    }

    /// URL that logs the user out (meant to be opened in a browser).
    #[must_use]
    pub fn logout_url(&self) -> String {
        self.url("auth/logout")
    }

    /// URL that starts the login flow, optionally redeeming an invite key.
    #[must_use]
    pub fn login_url(&self, invite_key: Option<&str>) -> String {
        let base = self.url("auth/login");
        match invite_key {
            Some(key) => Url::parse_with_params(&base, &[("invite_key", key)])
                .map_or(base, |url| url.to_string()),
            None => base,
        }
    }

    // ========================================================================
    // Auth
    // ========================================================================

    /// Fetches the logged-in user.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> ApiResponse<UserPublic> {
        self.call(Method::GET, "auth/me".to_string(), |req| req).await
    }

    // ========================================================================
    // Courses
    // ========================================================================

    /// Lists the courses the user is enrolled in.
    #[instrument(skip(self))]
    pub async fn list_courses(&self) -> ApiResponse<Vec<CoursePublic>> {
        self.call(Method::GET, "course/".to_string(), |req| req).await
    }

    /// Fetches one course, including the viewer's role in it.
    #[instrument(skip(self))]
    pub async fn get_course(&self, course_id: &str) -> ApiResponse<CoursePublic> {
        self.call(Method::GET, format!("course/{course_id}"), |req| req)
            .await
    }

    /// Looks up the course and role an invite key grants.
    #[instrument(skip(self))]
    pub async fn lookup_invite(&self, invite_key: &str) -> ApiResponse<CourseInvite> {
        self.call(Method::GET, format!("course/enroll/{invite_key}"), |req| req)
            .await
    }

    /// Sets (or clears) a course member's group number.
    #[instrument(skip(self))]
    pub async fn update_group(
        &self,
        course_id: &str,
        user_id: &str,
        group_num: Option<i64>,
    ) -> ApiResponse<GroupUpdate> {
        let body = GroupUpdate { group_num };
        self.call(
            Method::PUT,
            format!("course/{course_id}/user/{user_id}/group"),
            |req| req.json(&body),
        )
        .await
    }

    // ========================================================================
    // Assignments
    // ========================================================================

    /// Lists a course's assignments.
    #[instrument(skip(self))]
    pub async fn list_assignments(&self, course_id: &str) -> ApiResponse<Vec<AssignmentPublic>> {
        self.call(Method::GET, format!("course/{course_id}/assignment"), |req| req)
            .await
    }

    /// Creates an assignment in a course.
    #[instrument(skip(self, assignment), fields(name = %assignment.name))]
    pub async fn create_assignment(
        &self,
        course_id: &str,
        assignment: &AssignmentCreate,
    ) -> ApiResponse<AssignmentPublic> {
        self.call(
            Method::PUT,
            format!("course/{course_id}/assignment"),
            |req| req.json(assignment),
        )
        .await
    }

    /// Fetches the per-student status table for an assignment (teachers only).
    #[instrument(skip(self))]
    pub async fn assignment_roster(
        &self,
        course_id: &str,
        assignment_id: &str,
    ) -> ApiResponse<Vec<AssignmentStudentStatus>> {
        self.call(
            Method::GET,
            format!("course/{course_id}/assignment/{assignment_id}/status"),
            |req| req,
        )
        .await
    }

    // ========================================================================
    // Attempts and Feedback
    // ========================================================================

    /// Lists attempts on an assignment.
    ///
    /// Without `user_id` the backend returns the viewer's own attempts;
    /// teachers may pass a student's id.
    #[instrument(skip(self))]
    pub async fn list_attempts(
        &self,
        assignment_id: &str,
        user_id: Option<&str>,
    ) -> ApiResponse<Vec<Attempt>> {
        let mut params = vec![("assignment_id", assignment_id)];
        if let Some(user_id) = user_id {
            params.push(("user_id", user_id));
        }
        self.call(Method::GET, "attempt/".to_string(), |req| req.query(&params))
            .await
    }

    /// Fetches one attempt with its files and feedback.
    #[instrument(skip(self))]
    pub async fn get_attempt(&self, attempt_id: &str) -> ApiResponse<Attempt> {
        self.call(Method::GET, format!("attempt/{attempt_id}"), |req| req)
            .await
    }

    /// Submits a new attempt.
    ///
    /// The SMART data is validated first; an invalid draft is returned as
    /// [`ApiError::Validation`] without contacting the backend.
    #[instrument(skip(self, attempt), fields(assignment_id = %attempt.assignment_id))]
    pub async fn create_attempt(&self, attempt: &AttemptCreate) -> ApiResponse<Attempt> {
        if let Err(e) = attempt.data.validate() {
            warn!(error = %e, "Rejected attempt draft");
            return ApiResponse::failed(e.into(), Duration::ZERO);
        }

        let params = [("assignment_id", attempt.assignment_id.as_str())];
        self.call(Method::PUT, "attempt/".to_string(), |req| {
            req.query(&params).json(attempt)
        })
        .await
    }

    /// Leaves feedback on an attempt.
    ///
    /// The payload is validated first; an invalid draft is returned as
    /// [`ApiError::Validation`] without contacting the backend.
    #[instrument(skip(self, feedback), fields(attempt_id = %feedback.attempt_id))]
    pub async fn create_feedback(&self, feedback: &FeedbackCreate) -> ApiResponse<Feedback> {
        if let Err(e) = feedback.data.validate() {
            warn!(error = %e, "Rejected feedback draft");
            return ApiResponse::failed(e.into(), Duration::ZERO);
        }

        self.call(
            Method::PUT,
            format!("attempt/{}/feedback", feedback.attempt_id),
            |req| req.json(feedback),
        )
        .await
    }

    // ========================================================================
    // Files
    // ========================================================================

    /// Uploads file contents under the given name.
    #[instrument(skip(self, contents), fields(size = contents.len()))]
    pub async fn upload_file(&self, filename: &str, contents: Vec<u8>) -> ApiResponse<FilePublic> {
        let part = Part::bytes(contents).file_name(filename.to_string());
        let form = Form::new().part(UPLOAD_FIELD, part);
        self.call(Method::PUT, "file/".to_string(), |req| req.multipart(form))
            .await
    }

    /// Reads a local file and uploads it under its own file name.
    #[instrument(skip(self))]
    pub async fn upload_path(&self, path: &Path) -> ApiResponse<FilePublic> {
        let started = Instant::now();
        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            Err(source) => {
                let error = ApiError::ReadFile {
                    path: path.to_path_buf(),
                    source,
                };
                warn!(error = %error, "Upload aborted");
                return ApiResponse::failed(error, started.elapsed());
            }
        };

        let filename = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
        self.upload_file(&filename, contents).await
    }

    // ========================================================================
    // Request plumbing
    // ========================================================================

    /// Sends one request and folds the outcome into an envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: String,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> ApiResponse<T> {
        let request = build(self.http.request(method.clone(), self.url(&path)));
        let started = Instant::now();

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let elapsed = started.elapsed();
                warn!(
                    method = %method,
                    path = %path,
                    elapsed_ms = millis(elapsed),
                    error = %e,
                    "Request failed before a response"
                );
                return ApiResponse::failed(ApiError::transport(e), elapsed);
            }
        };

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or_default();
        let outcome = match response.bytes().await {
            Ok(body) => decode_body(status.as_u16(), reason, &body),
            Err(e) => {
                debug!(error = %e, "Failed to read response body");
                decode_body(status.as_u16(), reason, &[])
            }
        };
        let elapsed = started.elapsed();

        debug!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms = millis(elapsed),
            "API call complete"
        );
        if let Err(e) = &outcome {
            warn!(method = %method, path = %path, error = %e, "API call failed");
        }

        ApiResponse {
            outcome,
            elapsed,
            status: Some(status.as_u16()),
        }
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
