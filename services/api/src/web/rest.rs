//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI document.

use crate::web::protocol::{
    ClearUnsavedResponse, ErrorBody, FollowUpPayload, GenerateRequest, GenerateResponse,
    HistoryEntryView, HistoryQuery, PresetView, SessionResponse, SetPlanRequest,
    ToggleSavedResponse, UsageResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use promptsmith_core::{
    export, presets, GenerationError, GenerationRequest, PortError, SessionContext,
};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        generate_handler,
        session_handler,
        set_plan_handler,
        usage_handler,
        presets_handler,
        list_history_handler,
        toggle_saved_handler,
        delete_history_handler,
        clear_unsaved_handler,
        export_text_handler,
        export_json_handler,
    ),
    components(
        schemas(
            GenerateRequest,
            FollowUpPayload,
            GenerateResponse,
            HistoryEntryView,
            SessionResponse,
            SetPlanRequest,
            UsageResponse,
            PresetView,
            ToggleSavedResponse,
            ClearUnsavedResponse,
            ErrorBody,
        )
    ),
    tags(
        (name = "Promptsmith API", description = "Turn rough ideas into structured, reusable prompts.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

pub type ApiResult<T> = Result<T, (StatusCode, Json<ErrorBody>)>;

fn reject(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (status, Json(ErrorBody::new(message)))
}

/// The HTTP status for each way a generation attempt can end early.
pub fn generation_status(err: &GenerationError) -> StatusCode {
    match err {
        GenerationError::EmptyInput => StatusCode::BAD_REQUEST,
        GenerationError::PresetLocked { .. } => StatusCode::FORBIDDEN,
        GenerationError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        GenerationError::Busy => StatusCode::CONFLICT,
        GenerationError::Rejected { .. } | GenerationError::Failed => StatusCode::BAD_GATEWAY,
    }
}

fn port_rejection(e: PortError) -> (StatusCode, Json<ErrorBody>) {
    match e {
        PortError::NotFound(message) => reject(StatusCode::NOT_FOUND, message),
        other => {
            error!("History operation failed: {:?}", other);
            reject(StatusCode::INTERNAL_SERVER_ERROR, "History operation failed")
        }
    }
}

async fn usage_summary(app_state: &AppState, ctx: &SessionContext) -> UsageResponse {
    let usage = app_state.controller.usage().lock().await;
    UsageResponse::new(
        ctx.plan,
        usage.used_today(),
        usage.daily_limit(),
        usage.remaining(ctx.plan),
    )
}

//=========================================================================================
// Generation
//=========================================================================================

/// Turn a rough idea into a copy-ready prompt.
#[utoipa::path(
    post,
    path = "/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Prompt generated and added to history", body = GenerateResponse),
        (status = 400, description = "Input was empty", body = ErrorBody),
        (status = 403, description = "Preset requires the Pro plan", body = ErrorBody),
        (status = 409, description = "Another generation is in flight", body = ErrorBody),
        (status = 429, description = "Free daily limit reached", body = ErrorBody),
        (status = 502, description = "The generation service failed", body = ErrorBody)
    )
)]
pub async fn generate_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    let request = GenerationRequest {
        input: req.input,
        preset_id: req.preset_id,
        follow_up: req.follow_up.map(Into::into),
    };

    match app_state.generate(request).await {
        Ok(outcome) => Ok(Json(GenerateResponse::from(outcome))),
        Err(e) => {
            warn!("Generation ended without a result: {:?}", e);
            Err(reject(generation_status(&e), e.to_string()))
        }
    }
}

//=========================================================================================
// Session, Plan & Usage
//=========================================================================================

/// Current plan, generation phase, and usage.
#[utoipa::path(
    get,
    path = "/session",
    responses((status = 200, description = "Session state", body = SessionResponse))
)]
pub async fn session_handler(State(app_state): State<Arc<AppState>>) -> Json<SessionResponse> {
    let ctx = app_state.context().await;
    let phase = app_state.controller.phase();
    Json(SessionResponse {
        plan: ctx.plan,
        phase,
        busy: app_state.controller.is_busy(),
        usage: usage_summary(&app_state, &ctx).await,
    })
}

/// Switch between the free and pro plans.
#[utoipa::path(
    put,
    path = "/session/plan",
    request_body = SetPlanRequest,
    responses((status = 200, description = "Plan updated", body = SessionResponse))
)]
pub async fn set_plan_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<SetPlanRequest>,
) -> Json<SessionResponse> {
    let ctx = app_state.set_plan(req.plan).await;
    Json(SessionResponse {
        plan: ctx.plan,
        phase: app_state.controller.phase(),
        busy: app_state.controller.is_busy(),
        usage: usage_summary(&app_state, &ctx).await,
    })
}

/// Generations used and remaining today.
#[utoipa::path(
    get,
    path = "/usage",
    responses((status = 200, description = "Usage for the current plan", body = UsageResponse))
)]
pub async fn usage_handler(State(app_state): State<Arc<AppState>>) -> Json<UsageResponse> {
    let ctx = app_state.context().await;
    Json(usage_summary(&app_state, &ctx).await)
}

/// The preset catalog, with gated presets marked as locked for the current plan.
#[utoipa::path(
    get,
    path = "/presets",
    responses((status = 200, description = "All presets", body = [PresetView]))
)]
pub async fn presets_handler(State(app_state): State<Arc<AppState>>) -> Json<Vec<PresetView>> {
    let ctx = app_state.context().await;
    Json(
        presets::catalog()
            .iter()
            .map(|p| PresetView::new(p, ctx.plan))
            .collect(),
    )
}

//=========================================================================================
// History
//=========================================================================================

/// List history newest-first, optionally filtered by tab and search text.
#[utoipa::path(
    get,
    path = "/history",
    params(HistoryQuery),
    responses((status = 200, description = "Matching entries", body = [HistoryEntryView]))
)]
pub async fn list_history_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<HistoryEntryView>> {
    let history = app_state.controller.history().lock().await;
    let entries = history
        .list(query.tab.unwrap_or_default(), query.q.as_deref())
        .into_iter()
        .map(HistoryEntryView::from)
        .collect();
    Json(entries)
}

/// Flip an entry's saved flag.
#[utoipa::path(
    post,
    path = "/history/{id}/toggle-saved",
    params(("id" = Uuid, Path, description = "History entry id")),
    responses(
        (status = 200, description = "New saved state", body = ToggleSavedResponse),
        (status = 404, description = "No such entry", body = ErrorBody)
    )
)]
pub async fn toggle_saved_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ToggleSavedResponse>> {
    let ctx = app_state.context().await;
    let saved = app_state
        .controller
        .history()
        .lock()
        .await
        .toggle_saved(id, ctx.plan)
        .map_err(port_rejection)?;
    Ok(Json(ToggleSavedResponse { id, saved }))
}

/// Permanently delete an entry, saved or not.
#[utoipa::path(
    delete,
    path = "/history/{id}",
    params(("id" = Uuid, Path, description = "History entry id")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 404, description = "No such entry", body = ErrorBody)
    )
)]
pub async fn delete_history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    app_state
        .controller
        .history()
        .lock()
        .await
        .delete(id)
        .map_err(port_rejection)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove every entry that is not saved.
#[utoipa::path(
    delete,
    path = "/history/unsaved",
    responses((status = 200, description = "Number of entries removed", body = ClearUnsavedResponse))
)]
pub async fn clear_unsaved_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<ClearUnsavedResponse> {
    let ctx = app_state.context().await;
    let removed = app_state
        .controller
        .history()
        .lock()
        .await
        .clear_unsaved(ctx.plan);
    Json(ClearUnsavedResponse { removed })
}

/// All history as plain-text blocks, for bulk copy.
#[utoipa::path(
    get,
    path = "/history/export.txt",
    responses((status = 200, description = "History as text", body = String, content_type = "text/plain"))
)]
pub async fn export_text_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let history = app_state.controller.history().lock().await;
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        export::export_text(history.entries()),
    )
}

/// All history as a downloadable JSON document.
#[utoipa::path(
    get,
    path = "/history/export.json",
    responses(
        (status = 200, description = "History as a JSON attachment", content_type = "application/json"),
        (status = 500, description = "Serialization failed", body = ErrorBody)
    )
)]
pub async fn export_json_handler(
    State(app_state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let history = app_state.controller.history().lock().await;
    let body = export::export_json(history.entries()).map_err(|e| {
        error!("Failed to serialize history export: {:?}", e);
        reject(StatusCode::INTERNAL_SERVER_ERROR, "Failed to export history")
    })?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"prompt-history.json\"",
            ),
        ],
        body,
    ))
}
