//! HTTP handlers for presenters, followers, and lesson editing.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use lockstep_core::annotate::annotate;
use lockstep_core::protocol::{
    ImportLessonRequest, LessonSaved, LessonView, PlanResponse, ScoreResponse, ToleranceRequest,
    TouchRequest, TouchResponse, UpdateLessonRequest,
};
use lockstep_core::session::{Participant, SessionSummary};
use lockstep_library::store::validate_lesson_id;
use lockstep_library::{Audience, Lesson, LessonStore, PublishPatch, import_lesson};

use crate::error::{ApiError, ApiResult};
use crate::state::GatewayState;

type AppState = State<Arc<GatewayState>>;

// ============================================================
// Session
// ============================================================

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub lesson_id: Option<String>,
}

/// Rendered active lesson; `?lesson_id=` switches the active lesson first.
pub async fn view(State(state): AppState, Query(q): Query<ViewQuery>) -> ApiResult<Json<LessonView>> {
    let lesson_id = match q.lesson_id.filter(|id| !id.is_empty()) {
        Some(id) => {
            // Only switch to lessons that exist
            state.lessons.require(&id).await?;
            state.session.lock().await.set_active_document(id.clone());
            id
        }
        None => state.active_lesson_id().await,
    };

    let (lesson, extraction) = state.render_lesson(&lesson_id).await?;
    let tolerance_seconds = state.session.lock().await.tolerance_seconds();
    Ok(Json(LessonView {
        lesson_id,
        title: lesson.title,
        content_html: extraction.rendered,
        targets: extraction.targets,
        tolerance_seconds,
    }))
}

pub async fn plan(State(state): AppState, Path(lesson_id): Path<String>) -> ApiResult<Json<PlanResponse>> {
    let targets = state.targets(&lesson_id).await?;
    Ok(Json(PlanResponse { lesson_id, targets }))
}

/// Record a first touch for `presenter`/`follower` (or `teacher`/`student`).
pub async fn touch(
    State(state): AppState,
    Path(participant): Path<String>,
    Json(req): Json<TouchRequest>,
) -> ApiResult<Json<TouchResponse>> {
    let participant: Participant = participant.parse()?;
    let target_id = req.target_id.trim();
    if target_id.is_empty() {
        return Err(ApiError::invalid("target_id is required"));
    }

    let ts = state.touch(participant, target_id).await;
    #[cfg(feature = "metrics")]
    crate::metrics::record_touch(participant.as_str());

    Ok(Json(TouchResponse { ok: true, ts }))
}

pub async fn reset_session(State(state): AppState) -> Json<Value> {
    state.session.lock().await.reset();
    Json(json!({ "ok": true }))
}

pub async fn score(State(state): AppState) -> ApiResult<Json<ScoreResponse>> {
    let (lesson_id, score) = state.score_active().await?;
    debug!(lesson_id = %lesson_id, focus = score.focus_percent, "Computed score");
    #[cfg(feature = "metrics")]
    crate::metrics::record_focus(score.focus_percent);

    Ok(Json(ScoreResponse {
        ok: true,
        lesson_id,
        score,
    }))
}

pub async fn session_summary(State(state): AppState) -> Json<SessionSummary> {
    Json(state.session.lock().await.summary())
}

pub async fn set_tolerance(
    State(state): AppState,
    Json(req): Json<ToleranceRequest>,
) -> ApiResult<Json<SessionSummary>> {
    let mut session = state.session.lock().await;
    session.set_tolerance(req.tolerance_seconds)?;
    info!(tolerance = req.tolerance_seconds, "Tolerance updated");
    Ok(Json(session.summary()))
}

// ============================================================
// Lesson editing
// ============================================================

/// Unrendered markup, as the token editor needs it.
pub async fn lesson_source(State(state): AppState, Path(lesson_id): Path<String>) -> ApiResult<Json<Value>> {
    let lesson = state.lessons.require(&lesson_id).await?;
    Ok(Json(json!({
        "ok": true,
        "lesson_id": lesson_id,
        "title": lesson.title,
        "content_html": lesson.content_html,
    })))
}

/// Save a token-editor result; selected tokens become targets.
pub async fn update_lesson(
    State(state): AppState,
    Json(req): Json<UpdateLessonRequest>,
) -> ApiResult<Json<LessonSaved>> {
    let lesson_id = match req.lesson_id.filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => state.active_lesson_id().await,
    };
    let title = req.title.filter(|t| !t.is_empty()).unwrap_or_else(|| "Lesson".to_string());

    let content_html = annotate(&req.tokens, &req.structure)?;
    state
        .lessons
        .save(
            &lesson_id,
            &Lesson {
                title: title.clone(),
                content_html,
            },
        )
        .await?;
    info!(lesson_id = %lesson_id, "Lesson annotations saved");

    Ok(Json(LessonSaved {
        ok: true,
        lesson_id,
        title: Some(title),
    }))
}

pub async fn import(
    State(state): AppState,
    Json(req): Json<ImportLessonRequest>,
) -> ApiResult<Json<LessonSaved>> {
    let catalog = state.catalog.lock().await;
    let imported = import_lesson(
        state.lessons.as_ref(),
        &catalog,
        &req.filename,
        req.content.as_bytes(),
        req.lesson_id,
        req.title,
    )
    .await?;

    Ok(Json(LessonSaved {
        ok: true,
        lesson_id: imported.lesson_id,
        title: Some(imported.title),
    }))
}

// ============================================================
// Catalog
// ============================================================

#[derive(Debug, Deserialize)]
pub struct LessonsQuery {
    #[serde(default)]
    pub role: Audience,
    pub class: Option<String>,
    #[serde(default)]
    pub include_unpublished: bool,
}

pub async fn list_lessons(State(state): AppState, Query(q): Query<LessonsQuery>) -> ApiResult<Json<Value>> {
    let items = state.lessons.list().await?;
    let listed = state.catalog.lock().await.merge(items).await?;
    let visible: Vec<_> = listed
        .into_iter()
        .filter(|l| l.visible_to(q.role, q.class.as_deref(), q.include_unpublished))
        .collect();
    Ok(Json(json!({ "ok": true, "lessons": visible })))
}

pub async fn publish(
    State(state): AppState,
    Path(lesson_id): Path<String>,
    Json(patch): Json<PublishPatch>,
) -> ApiResult<Json<Value>> {
    validate_lesson_id(&lesson_id)?;
    let fallback_title = match state.lessons.load(&lesson_id).await {
        Ok(Some(lesson)) => lesson.title,
        _ => lesson_id.clone(),
    };
    let entry = state
        .catalog
        .lock()
        .await
        .publish(&lesson_id, &fallback_title, &patch)
        .await?;
    Ok(Json(json!({ "ok": true, "lesson": entry })))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

pub async fn register(State(state): AppState, Json(req): Json<RegisterRequest>) -> ApiResult<Json<Value>> {
    let Some(id) = req.id.filter(|id| !id.is_empty()) else {
        return Err(ApiError::invalid("missing id"));
    };
    validate_lesson_id(&id)?;
    let title = req.title.unwrap_or_default();
    let entry = state.catalog.lock().await.register(&id, &title).await?;
    Ok(Json(json!({ "ok": true, "lesson": entry })))
}
