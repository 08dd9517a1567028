//! In-memory stand-in for the Stepik REST API.
//!
//! Serves a small seeded catalog behind OAuth2 bearer tokens so the client
//! can be driven end to end over real HTTP.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";

/// Courses per page on `GET /api/courses`.
pub const PAGE_SIZE: usize = 2;

const TOKEN_LIFETIME_SECS: u64 = 36_000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    pub title: String,
    pub summary: String,
    pub sections: Vec<u64>,
    pub is_public: bool,
    pub enrollment: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Section {
    pub id: u64,
    pub course: u64,
    pub title: String,
    pub position: u32,
    pub units: Vec<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    pub id: u64,
    pub lesson: u64,
    pub position: u32,
    pub status: String,
    pub block: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attempt {
    pub id: u64,
    pub step: u64,
    pub user: u64,
    pub status: String,
    pub dataset: Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Submission {
    pub id: u64,
    pub attempt: u64,
    pub status: String,
    pub score: f64,
    pub hint: String,
    pub reply: Value,
}

/// Everything the server knows.
#[derive(Debug, Default)]
pub struct Platform {
    courses: BTreeMap<u64, Course>,
    sections: BTreeMap<u64, Section>,
    steps: BTreeMap<u64, Step>,
    attempts: BTreeMap<u64, Attempt>,
    submissions: BTreeMap<u64, Submission>,
    metrics: Vec<Value>,
    enrollments: BTreeSet<u64>,
    access_tokens: HashSet<String>,
    refresh_tokens: HashSet<String>,
    issued: u64,
    next_id: u64,
}

impl Platform {
    pub fn seeded() -> Self {
        let mut platform = Platform {
            next_id: 1000,
            ..Platform::default()
        };
        for (id, title, is_public) in [(42, "Rust basics", true), (43, "Private mentoring", false), (44, "Async Rust", true)] {
            platform.courses.insert(
                id,
                Course {
                    id,
                    title: title.to_string(),
                    summary: String::new(),
                    sections: if id == 42 { vec![7] } else { Vec::new() },
                    is_public,
                    enrollment: None,
                },
            );
        }
        platform.sections.insert(
            7,
            Section {
                id: 7,
                course: 42,
                title: "Getting started".to_string(),
                position: 1,
                units: vec![1],
            },
        );

        let blocks = [
            (100, json!({"name": "text", "text": "<p>Welcome</p>"})),
            (
                101,
                json!({
                    "name": "code",
                    "text": "Print hello",
                    "options": {
                        "execution_time_limit": 5,
                        "execution_memory_limit": 256,
                        "limits": {"python3": {"time": 5, "memory": 256}},
                        "code_templates": {"python3": "# your code"},
                        "samples": [["", "hello"]]
                    }
                }),
            ),
            (102, json!({"name": "choice", "text": "Pick the odd one", "options": {"is_multiple_choice": false}})),
            (103, json!({"name": "puzzle", "text": "Assemble it", "pieces": 4})),
        ];
        for (position, (id, block)) in blocks.into_iter().enumerate() {
            platform.steps.insert(
                id,
                Step {
                    id,
                    lesson: 3,
                    position: position as u32 + 1,
                    status: "ready".to_string(),
                    block,
                },
            );
        }
        platform
    }

    fn issue_tokens(&mut self) -> (String, String) {
        self.issued += 1;
        let access = format!("access-{}", self.issued);
        let refresh = format!("refresh-{}", self.issued);
        self.access_tokens.insert(access.clone());
        self.refresh_tokens.insert(refresh.clone());
        (access, refresh)
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared server state; clones see the same platform.
#[derive(Clone, Debug)]
pub struct AppState {
    db: Arc<RwLock<Platform>>,
}

impl AppState {
    pub fn new(platform: Platform) -> Self {
        Self {
            db: Arc::new(RwLock::new(platform)),
        }
    }

    /// Invalidate every issued access token, as if they all expired.
    /// Refresh tokens stay valid. Must be called outside the runtime.
    pub fn revoke_all_tokens(&self) {
        self.db.blocking_write().access_tokens.clear();
    }

    /// Metric names recorded so far, oldest first.
    pub fn metric_names(&self) -> Vec<String> {
        self.db
            .blocking_read()
            .metrics
            .iter()
            .filter_map(|metric| metric["name"].as_str().map(str::to_string))
            .collect()
    }

    /// Number of token grants served so far.
    pub fn tokens_issued(&self) -> u64 {
        self.db.blocking_read().issued
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Platform::seeded())
    }
}

pub fn app() -> Router {
    router(AppState::default())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/oauth2/token", post(token))
        .route("/api/courses", get(list_courses))
        .route("/api/sections", get(list_sections))
        .route("/api/steps", get(list_steps))
        .route("/api/enrollments", post(create_enrollment))
        .route("/api/enrollments/{id}", delete(delete_enrollment))
        .route("/api/attempts", post(create_attempt))
        .route("/api/submissions", get(list_submissions).post(create_submission))
        .route("/api/metrics", post(create_metric))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, AppState::default()).await
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, router(state)).await
}

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<T, ApiError>;
type Pairs = Vec<(String, String)>;

fn fail(status: StatusCode, detail: &str) -> ApiError {
    (status, Json(json!({ "detail": detail })))
}

fn authorize(platform: &Platform, headers: &HeaderMap) -> ApiResult<()> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match token {
        Some(token) if platform.access_tokens.contains(token) => Ok(()),
        _ => Err(fail(StatusCode::UNAUTHORIZED, "Authentication credentials were not provided.")),
    }
}

fn ids(pairs: &Pairs) -> HashSet<u64> {
    pairs
        .iter()
        .filter(|(key, _)| key == "ids[]")
        .filter_map(|(_, value)| value.parse().ok())
        .collect()
}

fn number(pairs: &Pairs, key: &str) -> Option<u64> {
    pairs.iter().find(|(k, _)| k == key).and_then(|(_, value)| value.parse().ok())
}

/// `{ "<name>": [...], "meta": {...} }`, the envelope every list endpoint uses.
fn collection<T: Serialize>(name: &str, items: &[T], page: u64, is_last: bool) -> Json<Value> {
    let mut body = serde_json::Map::new();
    body.insert(name.to_string(), json!(items));
    body.insert(
        "meta".to_string(),
        json!({ "page": page, "has_next": !is_last, "has_previous": page > 1, "is_last": is_last }),
    );
    Json(Value::Object(body))
}

#[derive(Deserialize)]
struct TokenForm {
    grant_type: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
}

async fn token(State(state): State<AppState>, Form(form): Form<TokenForm>) -> ApiResult<Json<Value>> {
    let mut platform = state.db.write().await;
    match form.grant_type.as_str() {
        "client_credentials" => {
            if form.client_id.as_deref() != Some(CLIENT_ID) || form.client_secret.as_deref() != Some(CLIENT_SECRET) {
                return Err(fail(StatusCode::UNAUTHORIZED, "invalid_client"));
            }
        }
        "refresh_token" => {
            let known = form
                .refresh_token
                .as_ref()
                .is_some_and(|token| platform.refresh_tokens.remove(token));
            if !known {
                return Err(fail(StatusCode::UNAUTHORIZED, "invalid_grant"));
            }
        }
        other => {
            tracing::warn!(grant_type = other, "unsupported grant");
            return Err(fail(StatusCode::BAD_REQUEST, "unsupported_grant_type"));
        }
    }

    let (access, refresh) = platform.issue_tokens();
    tracing::debug!(grant_type = %form.grant_type, %access, "issued token");
    Ok(Json(json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "Bearer",
        "expires_in": TOKEN_LIFETIME_SECS,
        "scope": "read write",
    })))
}

async fn list_courses(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Pairs>,
) -> ApiResult<Json<Value>> {
    let platform = state.db.read().await;
    authorize(&platform, &headers)?;

    let wanted = ids(&pairs);
    let matching: Vec<Course> = platform
        .courses
        .values()
        .filter(|course| wanted.is_empty() || wanted.contains(&course.id))
        .map(|course| Course {
            enrollment: platform.enrollments.contains(&course.id).then_some(course.id),
            ..course.clone()
        })
        .collect();

    let page = number(&pairs, "page").unwrap_or(1).max(1);
    let start = usize::try_from(page - 1)
        .unwrap_or(usize::MAX)
        .saturating_mul(PAGE_SIZE);
    let items: Vec<Course> = matching.iter().skip(start).take(PAGE_SIZE).cloned().collect();
    let is_last = start.saturating_add(PAGE_SIZE) >= matching.len();
    Ok(collection("courses", &items, page, is_last))
}

async fn list_sections(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Pairs>,
) -> ApiResult<Json<Value>> {
    let platform = state.db.read().await;
    authorize(&platform, &headers)?;

    let wanted = ids(&pairs);
    let items: Vec<&Section> = platform
        .sections
        .values()
        .filter(|section| wanted.is_empty() || wanted.contains(&section.id))
        .collect();
    Ok(collection("sections", &items, 1, true))
}

async fn list_steps(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Pairs>,
) -> ApiResult<Json<Value>> {
    let platform = state.db.read().await;
    authorize(&platform, &headers)?;

    let wanted = ids(&pairs);
    let lesson = number(&pairs, "lesson");
    let items: Vec<&Step> = platform
        .steps
        .values()
        .filter(|step| wanted.is_empty() || wanted.contains(&step.id))
        .filter(|step| lesson.is_none_or(|lesson| step.lesson == lesson))
        .collect();
    Ok(collection("steps", &items, 1, true))
}

#[derive(Deserialize)]
struct EnrollmentEnvelope {
    enrollment: NewEnrollment,
}

#[derive(Deserialize)]
struct NewEnrollment {
    course: u64,
}

async fn create_enrollment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<EnrollmentEnvelope>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut platform = state.db.write().await;
    authorize(&platform, &headers)?;

    let course_id = input.enrollment.course;
    let course = platform
        .courses
        .get(&course_id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Not found."))?;
    if !course.is_public {
        return Err(fail(StatusCode::FORBIDDEN, "You do not have permission to perform this action."));
    }

    platform.enrollments.insert(course_id);
    let enrollment = json!({ "id": course_id, "course": course_id });
    Ok((StatusCode::CREATED, collection("enrollments", &[enrollment], 1, true)))
}

async fn delete_enrollment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    let mut platform = state.db.write().await;
    authorize(&platform, &headers)?;

    if platform.enrollments.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(fail(StatusCode::NOT_FOUND, "Not found."))
    }
}

#[derive(Deserialize)]
struct AttemptEnvelope {
    attempt: NewAttempt,
}

#[derive(Deserialize)]
struct NewAttempt {
    step: u64,
}

async fn create_attempt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<AttemptEnvelope>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut platform = state.db.write().await;
    authorize(&platform, &headers)?;

    let step = platform
        .steps
        .get(&input.attempt.step)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Not found."))?;
    let dataset = match step.block.get("name").and_then(Value::as_str) {
        Some("choice") => json!({ "is_multiple_choice": false, "options": ["1", "2", "3"] }),
        _ => json!(""),
    };

    let attempt = Attempt {
        id: platform.next_id(),
        step: input.attempt.step,
        user: 1,
        status: "active".to_string(),
        dataset,
    };
    platform.attempts.insert(attempt.id, attempt.clone());
    Ok((StatusCode::CREATED, collection("attempts", &[attempt], 1, true)))
}

#[derive(Deserialize)]
struct SubmissionEnvelope {
    submission: NewSubmission,
}

#[derive(Deserialize)]
struct NewSubmission {
    attempt: u64,
    reply: Value,
}

/// The choice step's answer is the second option.
fn grade(reply: &Value) -> bool {
    reply.get("choices") == Some(&json!([false, true, false]))
}

async fn create_submission(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SubmissionEnvelope>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut platform = state.db.write().await;
    authorize(&platform, &headers)?;

    let attempt = input.submission.attempt;
    if !platform.attempts.contains_key(&attempt) {
        return Err(fail(StatusCode::NOT_FOUND, "Not found."));
    }
    let correct = grade(&input.submission.reply);
    let submission = Submission {
        id: platform.next_id(),
        attempt,
        status: if correct { "correct" } else { "wrong" }.to_string(),
        score: if correct { 1.0 } else { 0.0 },
        hint: String::new(),
        reply: input.submission.reply,
    };
    platform.submissions.insert(submission.id, submission.clone());
    Ok((StatusCode::CREATED, collection("submissions", &[submission], 1, true)))
}

async fn list_submissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Pairs>,
) -> ApiResult<Json<Value>> {
    let platform = state.db.read().await;
    authorize(&platform, &headers)?;

    let attempt = number(&pairs, "attempt");
    let step = number(&pairs, "step");
    let mut items: Vec<&Submission> = platform
        .submissions
        .values()
        .filter(|s| attempt.is_none_or(|a| s.attempt == a))
        .filter(|s| step.is_none_or(|st| platform.attempts.get(&s.attempt).is_some_and(|a| a.step == st)))
        .collect();
    if pairs.iter().any(|(key, value)| key == "order" && value == "desc") {
        items.reverse();
    }
    Ok(collection("submissions", &items, 1, true))
}

#[derive(Deserialize)]
struct MetricEnvelope {
    metric: NewMetric,
}

#[derive(Deserialize)]
struct NewMetric {
    name: String,
    #[serde(default)]
    tags: serde_json::Map<String, Value>,
    #[serde(default)]
    data: serde_json::Map<String, Value>,
}

async fn create_metric(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<MetricEnvelope>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut platform = state.db.write().await;
    authorize(&platform, &headers)?;

    let metric = json!({
        "id": platform.next_id(),
        "name": input.metric.name,
        "tags": input.metric.tags,
        "data": input.metric.data,
    });
    platform.metrics.push(metric.clone());
    Ok((StatusCode::CREATED, collection("metrics", &[metric], 1, true)))
}
