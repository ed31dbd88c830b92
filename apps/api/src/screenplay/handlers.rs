//! Axum route handlers for the Screenplay API.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::document::{render_document, CoverImage, DOCX_CONTENT_TYPE};
use crate::errors::AppError;
use crate::screenplay::generator::{document_file_name, generate_covers, generate_screenplay};
use crate::screenplay::models::{Screenplay, ScreenplayRequest};
use crate::screenplay::session::SessionSummary;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateScreenplayRequest {
    #[serde(flatten)]
    pub request: ScreenplayRequest,
    #[serde(default)]
    pub generate_cover_image: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerateScreenplayResponse {
    pub screenplay: Screenplay,
    pub preview: String,
    pub has_cover_image: bool,
}

#[derive(Debug, Deserialize)]
pub struct RegenerateCoverRequest {
    #[serde(default = "default_keep_previous")]
    pub keep_previous: bool,
}

fn default_keep_previous() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct RegenerateCoverResponse {
    pub regeneration_count: u32,
    pub retained_images: usize,
}

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    pub file_name: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
            created_at: session.created_at,
        }),
    )
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = state.sessions.get(id).await?;
    Ok(Json(session.summary()))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/screenplay
///
/// Full pipeline: validate → prompt → text service → recover → (cover image).
/// The session changes only if every stage succeeds.
pub async fn handle_generate_screenplay(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<GenerateScreenplayRequest>,
) -> Result<Json<GenerateScreenplayResponse>, AppError> {
    // Fail fast on unknown sessions before paying for a generation call.
    state.sessions.get(id).await?;

    let outcome = generate_screenplay(
        state.llm.as_ref(),
        state.images.as_ref(),
        &state.config.prompt_bounds(),
        body.request,
        body.generate_cover_image,
    )
    .await?;

    let response = GenerateScreenplayResponse {
        screenplay: outcome.screenplay.clone(),
        preview: outcome.preview.clone(),
        has_cover_image: !outcome.covers.is_empty(),
    };

    state
        .sessions
        .update(id, |session| session.apply_generation(outcome))
        .await?;
    info!("Session {id}: screenplay '{}' stored", response.screenplay.title_or_default());

    Ok(Json(response))
}

/// POST /api/v1/sessions/:id/cover-image
///
/// Generates a new cover from the stored image prompt.
pub async fn handle_regenerate_cover(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RegenerateCoverRequest>,
) -> Result<Json<RegenerateCoverResponse>, AppError> {
    let session = state.sessions.get(id).await?;
    let image_prompt = session.image_prompt.ok_or_else(|| {
        AppError::Conflict("generate a screenplay before requesting a cover image".to_string())
    })?;

    let covers = generate_covers(state.images.as_ref(), &image_prompt).await?;

    let updated = state
        .sessions
        .update(id, |session| {
            session.apply_regenerated_covers(covers, body.keep_previous)
        })
        .await?;
    info!(
        "Session {id}: cover regenerated ({} so far)",
        updated.regeneration_count
    );

    Ok(Json(RegenerateCoverResponse {
        regeneration_count: updated.regeneration_count,
        retained_images: updated.retained_covers.len(),
    }))
}

/// GET /api/v1/sessions/:id/cover-image
pub async fn handle_get_cover(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = state.sessions.get(id).await?;
    let cover = session
        .cover
        .ok_or_else(|| AppError::NotFound(format!("session {id} has no cover image")))?;
    Ok(image_response(cover))
}

/// GET /api/v1/sessions/:id/cover-images/:index
pub async fn handle_get_retained_cover(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Response, AppError> {
    let session = state.sessions.get(id).await?;
    let cover = session
        .retained_covers
        .into_iter()
        .nth(index)
        .ok_or_else(|| AppError::NotFound(format!("session {id} has no retained image {index}")))?;
    Ok(image_response(cover))
}

/// GET /api/v1/sessions/:id/document?file_name=
///
/// Renders the current screenplay and cover as a `.docx` attachment.
pub async fn handle_download_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DocumentQuery>,
) -> Result<Response, AppError> {
    let session = state.sessions.get(id).await?;
    let screenplay = session.screenplay.ok_or_else(|| {
        AppError::Conflict("generate a screenplay before downloading the document".to_string())
    })?;
    let cover = session.cover;

    // CPU-bound; keep it off the async executor.
    let bytes = tokio::task::spawn_blocking(move || render_document(&screenplay, cover.as_ref()))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("render task failed: {e}")))??;

    let file_name = document_file_name(query.file_name.as_deref());
    info!("Session {id}: rendered {file_name} ({} bytes)", bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn image_response(cover: CoverImage) -> Response {
    (
        [(header::CONTENT_TYPE, cover.format.content_type())],
        cover.bytes,
    )
        .into_response()
}
