//! Execution route handlers: start, inspect, answer, undo, finish.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use checkpath_core::AnswerValue;
use checkpath_engine::EngineError;
use checkpath_storage::{CheckpathStorage, ExecutionRecord, ExecutionState};

use super::handlers::storage_error_response;
use super::state::AppState;
use super::json_error;

/// Map an engine failure to an HTTP response. Missing references are 404,
/// state conflicts are 409, blocked finalizes are 422 with the full list
/// of missing answers.
fn engine_error_response(err: EngineError) -> Response {
    match err {
        EngineError::ExecutionNotFound { .. }
        | EngineError::TemplateNotFound { .. }
        | EngineError::VersionNotFound { .. } => {
            json_error(StatusCode::NOT_FOUND, &err.to_string()).into_response()
        }
        EngineError::InvalidState { .. } => {
            json_error(StatusCode::CONFLICT, &err.to_string()).into_response()
        }
        EngineError::ValidationFailed { missing } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "error": "required answers missing",
                "missing": missing,
            })),
        )
            .into_response(),
        EngineError::Storage(e) => storage_error_response(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateExecutionBody {
    template_id: String,
    version_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnswerBody {
    question_id: String,
    value: serde_json::Value,
}

/// POST /api/executions
pub(crate) async fn handle_create_execution(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateExecutionBody>,
) -> Response {
    if let Err(e) = state.storage.get_template(&body.template_id).await {
        return storage_error_response(e);
    }
    let version = match state.storage.get_version(&body.version_id).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(e),
    };
    if version.template_id != body.template_id {
        return json_error(
            StatusCode::BAD_REQUEST,
            "version does not belong to the given template",
        )
        .into_response();
    }

    let record = ExecutionRecord {
        id: Uuid::new_v4().to_string(),
        template_id: body.template_id,
        version_id: body.version_id,
        state: ExecutionState::InProgress,
        started_at: OffsetDateTime::now_utc(),
        finished_at: None,
    };
    if let Err(e) = state.storage.insert_execution(record.clone()).await {
        return storage_error_response(e);
    }

    let visible_path = match state.coordinator.resolve_visible_path(&record.id).await {
        Ok(p) => p,
        Err(e) => return engine_error_response(e),
    };

    let response = serde_json::json!({
        "execution": record,
        "visiblePath": visible_path,
    });
    (StatusCode::CREATED, Json(response)).into_response()
}

/// GET /api/executions/{id}
pub(crate) async fn handle_get_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let execution = match state.storage.get_execution(&id).await {
        Ok(e) => e,
        Err(e) => return storage_error_response(e),
    };
    let answers = match state.storage.list_answers(&id).await {
        Ok(rows) => rows,
        Err(e) => return storage_error_response(e),
    };
    let visible_path = match state.coordinator.resolve_visible_path(&id).await {
        Ok(p) => p,
        Err(e) => return engine_error_response(e),
    };

    let valid: Vec<_> = answers.iter().filter(|a| a.is_valid).collect();
    let response = serde_json::json!({
        "execution": execution,
        "visiblePath": visible_path,
        "answers": valid,
    });
    (StatusCode::OK, Json(response)).into_response()
}

/// POST /api/executions/{id}/answers
pub(crate) async fn handle_answer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AnswerBody>,
) -> Response {
    let value = match AnswerValue::from_json(&body.value) {
        Some(v) => v,
        None => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "value must be a scalar or an array of scalars",
            )
            .into_response();
        }
    };

    match state
        .coordinator
        .apply_answer(&id, &body.question_id, value)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => engine_error_response(e),
    }
}

/// POST /api/executions/{id}/undo
///
/// The engine reports an absent or expired snapshot as a plain false; at
/// the HTTP boundary that becomes a 400 so clients can distinguish "undone"
/// from "nothing happened".
pub(crate) async fn handle_undo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let undone = match state.coordinator.undo_last(&id).await {
        Ok(u) => u,
        Err(e) => return engine_error_response(e),
    };
    if !undone {
        return json_error(StatusCode::BAD_REQUEST, "nothing recent to undo").into_response();
    }

    let visible_path = match state.coordinator.resolve_visible_path(&id).await {
        Ok(p) => p,
        Err(e) => return engine_error_response(e),
    };

    let response = serde_json::json!({
        "undone": true,
        "visiblePath": visible_path,
    });
    (StatusCode::OK, Json(response)).into_response()
}

/// POST /api/executions/{id}/finish
pub(crate) async fn handle_finish(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.coordinator.finalize(&id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => engine_error_response(e),
    }
}
