use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::prompt::Prompt;
use crate::report::GeneratedReport;
use crate::session::{Session, SessionStatus};
use crate::state::AppState;
use crate::uploads::models::{FileRole, FileSummary, IncomingFile};

/// `Path` whose rejection renders as an `AppError` body.
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub auto_generate: bool,
}

#[derive(Serialize)]
pub struct CreateSessionResponse {
    pub id: Uuid,
    pub auto_generate: bool,
}

#[derive(Serialize)]
pub struct FilesResponse {
    pub files: Vec<FileSummary>,
}

#[derive(Serialize)]
pub struct PromptResponse {
    pub system: String,
    pub user: String,
    pub rendered: String,
}

impl From<Prompt> for PromptResponse {
    fn from(prompt: Prompt) -> Self {
        Self {
            rendered: prompt.render(),
            system: prompt.system,
            user: prompt.user,
        }
    }
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

async fn session(state: &AppState, id: Uuid) -> Result<Arc<Session>, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let Json(req) = body.unwrap_or_default();
    let session = state.sessions.create(req.auto_generate).await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            id: session.id,
            auto_generate: req.auto_generate,
        }),
    )
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<SessionStatus>, AppError> {
    Ok(Json(session(&state, id).await?.status().await))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// POST /api/v1/sessions/:id/files/:role
///
/// Every multipart field carrying a file name is registered under `role`.
/// Extraction starts immediately; poll the session for per-file status.
pub async fn handle_upload(
    State(state): State<AppState>,
    ApiPath((id, role)): ApiPath<(Uuid, String)>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FilesResponse>), AppError> {
    let role: FileRole = role.parse().map_err(AppError::BadRequest)?;
    let session = session(&state, id).await?;

    let mut incoming = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            debug!("Skipping multipart field {:?} without a file name", field.name());
            continue;
        };
        let content = field.bytes().await?;
        incoming.push(IncomingFile::new(file_name, content));
    }
    if incoming.is_empty() {
        return Err(AppError::BadRequest("No files in upload".to_string()));
    }

    let files = session.add_files(role, incoming).await;
    Ok((StatusCode::ACCEPTED, Json(FilesResponse { files })))
}

/// DELETE /api/v1/sessions/:id/files
pub async fn handle_reset_files(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    session(&state, id).await?.reset().await;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/sessions/:id/files/:index
pub async fn handle_remove_file(
    State(state): State<AppState>,
    ApiPath((id, index)): ApiPath<(Uuid, usize)>,
) -> Result<Json<FileSummary>, AppError> {
    let removed = session(&state, id).await?.remove_file(index).await?;
    Ok(Json(removed))
}

/// GET /api/v1/sessions/:id/prompt
pub async fn handle_get_prompt(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<PromptResponse>, AppError> {
    let prompt = session(&state, id).await?.prompt_preview().await?;
    Ok(Json(prompt.into()))
}

/// POST /api/v1/sessions/:id/report
pub async fn handle_generate_report(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<GeneratedReport>, AppError> {
    let report = session(&state, id).await?.submit().await?;
    Ok(Json(report))
}

/// GET /api/v1/sessions/:id/report
pub async fn handle_get_report(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<GeneratedReport>, AppError> {
    session(&state, id)
        .await?
        .report()
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Session {id} has no report")))
}

/// POST /api/v1/sessions/:id/report/cancel
pub async fn handle_cancel_report(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let cancelled = session(&state, id).await?.cancel().await;
    Ok(Json(CancelResponse { cancelled }))
}
