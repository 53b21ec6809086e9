//! Endpoint handlers and the route table.
//!
//! Search is public; everything that mutates the corpus (and the admin
//! listings) requires a verified credential. Metadata validation happens
//! here, before anything reaches the store.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use paperdex_core::{
    normalize_course_code, validate_year, Exam, ExamFilter, HardDeleteOutcome, NewPaper, Paper,
    PaperPatch, SearchHit, SearchQuery, Semester,
};

use crate::error::ApiError;
use crate::extract::RequireAuth;
use crate::state::AppState;

/// Per-file size cap for uploads: 10 MiB.
const FILE_SIZE_LIMIT: usize = 10 << 20;

/// The route table. Body limits: 2 MiB default, 50 MiB for uploads.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/oauth", post(oauth))
        .route("/profile", get(profile))
        .route("/unapproved", get(unapproved))
        .route("/trash", get(trash))
        .route("/similar", get(similar))
        .route("/edit", post(edit))
        .route("/approve", post(approve))
        .route("/delete", post(soft_delete))
        .route("/restore", post(restore))
        .route("/hard-delete", post(hard_delete))
        .layer(DefaultBodyLimit::max(2 << 20))
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(50 << 20))
        .with_state(state)
}

/// A paper as shown on the admin dashboard, with its derived file URL.
#[derive(Debug, Serialize)]
pub struct AdminPaper {
    #[serde(flatten)]
    pub paper: Paper,
    pub filelink: String,
}

fn admin_view(state: &AppState, paper: Paper) -> AdminPaper {
    let filelink = state.db.papers.url_for(&paper);
    AdminPaper { paper, filelink }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub course: Option<String>,
    pub exam: Option<String>,
    pub year: Option<i32>,
    pub semester: Option<String>,
}

/// Public ranked search. A blank `course` is an empty result, not an error;
/// an unrecognized `exam` filter is a caller error.
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let exam: ExamFilter = params
        .exam
        .as_deref()
        .unwrap_or("")
        .parse()
        .map_err(ApiError::BadRequest)?;

    // A semester filter of "unknown" (or junk) means no filter at all.
    let semester = params
        .semester
        .as_deref()
        .map(Semester::parse)
        .filter(|s| *s != Semester::Unknown);

    let query = SearchQuery {
        text: params.course.unwrap_or_default(),
        exam,
        year: params.year,
        semester,
    };

    let hits = state.db.papers.search(&query).await?;
    Ok(Json(hits))
}

#[derive(Debug, Deserialize)]
pub struct OAuthRequest {
    pub code: String,
}

/// Exchange a provider OAuth code for a session credential.
async fn oauth(
    State(state): State<AppState>,
    Json(body): Json<OAuthRequest>,
) -> Result<Json<paperdex_auth::SessionCredential>, ApiError> {
    let credential = state.auth.exchange_code(&body.code).await?;
    Ok(Json(credential))
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub username: String,
}

/// Echo the verified identity; used by the dashboard to check login state.
async fn profile(auth: RequireAuth) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        username: auth.identity.username,
    })
}

async fn unapproved(
    _auth: RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminPaper>>, ApiError> {
    let papers = state.db.papers.list_unapproved().await?;
    Ok(Json(
        papers.into_iter().map(|p| admin_view(&state, p)).collect(),
    ))
}

async fn trash(
    _auth: RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminPaper>>, ApiError> {
    let papers = state.db.papers.list_trash().await?;
    Ok(Json(
        papers.into_iter().map(|p| admin_view(&state, p)).collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    pub course_code: Option<String>,
    pub year: Option<i32>,
    pub semester: Option<String>,
    pub exam: Option<String>,
}

/// Exact-property duplicate lookup for the review dashboard.
async fn similar(
    _auth: RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<SimilarParams>,
) -> Result<Json<Vec<AdminPaper>>, ApiError> {
    let course_code = params
        .course_code
        .ok_or_else(|| ApiError::BadRequest("`course_code` is required".to_string()))?;
    let course_code = normalize_course_code(&course_code)?;

    let semester = params.semester.as_deref().map(Semester::parse);
    let exam = params.exam.as_deref().map(Exam::parse);

    let papers = state
        .db
        .papers
        .find_similar(&course_code, params.year, semester, exam)
        .await?;
    Ok(Json(
        papers.into_iter().map(|p| admin_view(&state, p)).collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UploadDetails {
    pub course_code: String,
    pub course_name: String,
    pub year: i32,
    pub semester: Semester,
    pub exam: Exam,
    pub filename: String,
    #[serde(default)]
    pub note: String,
}

/// Per-file result of an upload request.
#[derive(Debug, Serialize)]
pub struct UploadStatus {
    pub filename: String,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

/// Accept up to `max_upload_limit` PDF files, each paired with its metadata
/// through the `file_details` JSON array. Files are processed independently
/// and reported per-file.
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<UploadStatus>>, ApiError> {
    let mut files: Vec<(Option<String>, Bytes)> = Vec::new();
    let mut details_raw: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("files") => {
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                files.push((content_type, data));
            }
            Some("file_details") => {
                if details_raw.is_some() {
                    return Err(ApiError::BadRequest(
                        "Multiple `file_details` fields found".to_string(),
                    ));
                }
                details_raw = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let details: Vec<UploadDetails> =
        serde_json::from_str(details_raw.as_deref().unwrap_or("[]"))
            .map_err(|e| ApiError::BadRequest(format!("Invalid `file_details`: {}", e)))?;

    if files.len() > state.max_upload_limit {
        return Err(ApiError::BadRequest(format!(
            "Only up to {} files can be uploaded, found {}",
            state.max_upload_limit,
            files.len()
        )));
    }
    if files.len() != details.len() {
        return Err(ApiError::BadRequest(
            "Number of files and file details do not match".to_string(),
        ));
    }

    let mut statuses = Vec::with_capacity(files.len());
    for ((content_type, data), detail) in files.into_iter().zip(details) {
        statuses.push(process_upload(&state, content_type, data, detail).await);
    }
    Ok(Json(statuses))
}

async fn process_upload(
    state: &AppState,
    content_type: Option<String>,
    data: Bytes,
    detail: UploadDetails,
) -> UploadStatus {
    let filename = detail.filename.clone();
    let failure = |message: String| UploadStatus {
        filename: filename.clone(),
        success: false,
        message,
        id: None,
    };

    if data.len() > FILE_SIZE_LIMIT {
        return failure(format!(
            "File too large; only files up to {} MiB are allowed",
            FILE_SIZE_LIMIT >> 20
        ));
    }
    match content_type.as_deref() {
        Some("application/pdf") => {}
        Some(other) => return failure(format!("Only PDFs are supported, got {}", other)),
        None => return failure("File type could not be determined".to_string()),
    }

    let course_code = match normalize_course_code(&detail.course_code) {
        Ok(code) => code,
        Err(e) => return failure(e.to_string()),
    };
    if let Err(e) = validate_year(detail.year) {
        return failure(e.to_string());
    }

    let meta = NewPaper {
        course_code,
        course_name: detail.course_name,
        year: detail.year,
        semester: detail.semester,
        exam: detail.exam,
        note: detail.note,
    };

    match state.db.papers.insert_uploaded_paper(meta, &data).await {
        Ok(paper) => UploadStatus {
            filename,
            success: true,
            message: "Successfully uploaded file".to_string(),
            id: Some(paper.id),
        },
        Err(e) => {
            warn!(subsystem = "api", op = "upload", error = %e, "Upload failed");
            failure("Failed to store the uploaded file".to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub id: Uuid,
    pub course_code: Option<String>,
    pub course_name: Option<String>,
    pub year: Option<i32>,
    pub semester: Option<Semester>,
    pub exam: Option<Exam>,
    pub approved: Option<bool>,
    pub note: Option<String>,
}

/// Admin metadata correction; may approve/reject in the same request.
async fn edit(
    auth: RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<EditRequest>,
) -> Result<Json<AdminPaper>, ApiError> {
    let course_code = body
        .course_code
        .as_deref()
        .map(normalize_course_code)
        .transpose()?;
    if let Some(year) = body.year {
        validate_year(year)?;
    }

    let patch = PaperPatch {
        course_code,
        course_name: body.course_name,
        year: body.year,
        semester: body.semester,
        exam: body.exam,
        approved: body.approved,
        note: body.note,
    };

    let paper = state
        .db
        .papers
        .edit_paper(body.id, patch, &auth.identity.username)
        .await?;
    Ok(Json(admin_view(&state, paper)))
}

#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub approved: bool,
}

async fn approve(
    auth: RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<ApprovalRequest>,
) -> Result<Json<AdminPaper>, ApiError> {
    let paper = state
        .db
        .papers
        .set_approval(body.id, body.approved, &auth.identity.username)
        .await?;
    Ok(Json(admin_view(&state, paper)))
}

#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: Uuid,
}

async fn soft_delete(
    _auth: RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<IdRequest>,
) -> Result<Json<AdminPaper>, ApiError> {
    let paper = state.db.papers.soft_delete(body.id).await?;
    Ok(Json(admin_view(&state, paper)))
}

async fn restore(
    _auth: RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<IdRequest>,
) -> Result<Json<AdminPaper>, ApiError> {
    let paper = state.db.papers.restore(body.id).await?;
    Ok(Json(admin_view(&state, paper)))
}

#[derive(Debug, Deserialize)]
pub struct HardDeleteRequest {
    pub ids: Vec<Uuid>,
}

/// Irreversible batch removal with independent per-id outcomes.
async fn hard_delete(
    _auth: RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<HardDeleteRequest>,
) -> Result<Json<Vec<HardDeleteOutcome>>, ApiError> {
    let outcomes = state.db.papers.hard_delete(&body.ids).await;
    Ok(Json(outcomes))
}
