//! Template authoring route handlers: health, CRUD, draft, validate, publish.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use checkpath_core::{configuration_checksum, Configuration};
use checkpath_storage::{
    CheckpathStorage, DraftRecord, StorageError, TemplateRecord, TemplateVersionRecord,
};

use super::state::AppState;
use super::json_error;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// Map a storage failure to an HTTP response.
pub(crate) fn storage_error_response(err: StorageError) -> Response {
    let status = match &err {
        StorageError::TemplateNotFound { .. }
        | StorageError::VersionNotFound { .. }
        | StorageError::ExecutionNotFound { .. } => StatusCode::NOT_FOUND,
        StorageError::DuplicateId { .. } => StatusCode::CONFLICT,
        StorageError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, &err.to_string()).into_response()
}

#[derive(Deserialize)]
pub(crate) struct CreateTemplateBody {
    name: String,
    description: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ConfigurationBody {
    configuration: serde_json::Value,
}

/// POST /api/templates
pub(crate) async fn handle_create_template(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTemplateBody>,
) -> Response {
    if body.name.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "template name must not be empty")
            .into_response();
    }

    let record = TemplateRecord {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        description: body.description,
        created_at: OffsetDateTime::now_utc(),
    };
    match state.storage.insert_template(record.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => storage_error_response(e),
    }
}

/// GET /api/templates
pub(crate) async fn handle_list_templates(State(state): State<Arc<AppState>>) -> Response {
    let templates = match state.storage.list_templates().await {
        Ok(t) => t,
        Err(e) => return storage_error_response(e),
    };

    let mut listing = Vec::with_capacity(templates.len());
    for template in templates {
        let latest = match state.storage.list_versions(&template.id).await {
            Ok(versions) => versions.first().map(|v| v.version),
            Err(e) => return storage_error_response(e),
        };
        listing.push(serde_json::json!({
            "id": template.id,
            "name": template.name,
            "description": template.description,
            "latestVersion": latest,
        }));
    }

    (StatusCode::OK, Json(serde_json::json!({ "templates": listing }))).into_response()
}

/// GET /api/templates/{id}
pub(crate) async fn handle_get_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let template = match state.storage.get_template(&id).await {
        Ok(t) => t,
        Err(e) => return storage_error_response(e),
    };
    let versions = match state.storage.list_versions(&id).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(e),
    };
    let draft = match state.storage.get_draft(&id).await {
        Ok(d) => d,
        Err(e) => return storage_error_response(e),
    };

    let response = serde_json::json!({
        "template": template,
        "versions": versions,
        "draft": draft,
    });
    (StatusCode::OK, Json(response)).into_response()
}

/// PUT /api/templates/{id}/draft
///
/// A draft must be a well-formed configuration document, but may still
/// carry semantic errors; those only block publishing.
pub(crate) async fn handle_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ConfigurationBody>,
) -> Response {
    if let Err(e) = state.storage.get_template(&id).await {
        return storage_error_response(e);
    }

    let config: Configuration = match serde_json::from_value(body.configuration) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!("configuration does not deserialize: {}", e);
            return json_error(StatusCode::UNPROCESSABLE_ENTITY, &msg).into_response();
        }
    };

    let record = DraftRecord {
        template_id: id,
        configuration: config,
        updated_at: OffsetDateTime::now_utc(),
    };
    match state.storage.upsert_draft(record.clone()).await {
        Ok(()) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => storage_error_response(e),
    }
}

/// POST /api/templates/{id}/validate
///
/// Always 200: the body carries the full report, valid or not.
pub(crate) async fn handle_validate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ConfigurationBody>,
) -> Response {
    if let Err(e) = state.storage.get_template(&id).await {
        return storage_error_response(e);
    }

    let report = crate::validation_report(&body.configuration);
    (StatusCode::OK, Json(report)).into_response()
}

/// POST /api/templates/{id}/publish
///
/// Publishes a configuration as an immutable version with a canonical-JSON
/// SHA-256 checksum and the next version number. The body may carry the
/// configuration inline; without one, the saved draft is published. Full
/// validation must pass either way.
pub(crate) async fn handle_publish(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Option<Json<ConfigurationBody>>,
) -> Response {
    if let Err(e) = state.storage.get_template(&id).await {
        return storage_error_response(e);
    }

    let doc = match body {
        Some(Json(body)) => body.configuration,
        None => match state.storage.get_draft(&id).await {
            Ok(Some(d)) => {
                serde_json::to_value(&d.configuration).expect("configuration serializes")
            }
            Ok(None) => {
                return json_error(StatusCode::BAD_REQUEST, "no draft to publish")
                    .into_response();
            }
            Err(e) => return storage_error_response(e),
        },
    };

    let report = crate::validation_report(&doc);
    if !report.valid {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(report)).into_response();
    }
    let configuration: Configuration =
        serde_json::from_value(doc).expect("validated configuration deserializes");

    let next_version = match state.storage.list_versions(&id).await {
        Ok(versions) => versions.first().map(|v| v.version).unwrap_or(0) + 1,
        Err(e) => return storage_error_response(e),
    };

    let record = TemplateVersionRecord {
        id: Uuid::new_v4().to_string(),
        template_id: id,
        version: next_version,
        checksum: configuration_checksum(&configuration),
        configuration,
        published_at: OffsetDateTime::now_utc(),
    };
    match state.storage.insert_version(record.clone()).await {
        Ok(()) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => storage_error_response(e),
    }
}

/// GET /api/templates/version/{vid}
pub(crate) async fn handle_get_version(
    State(state): State<Arc<AppState>>,
    Path(version_id): Path<String>,
) -> Response {
    match state.storage.get_version(&version_id).await {
        Ok(version) => (StatusCode::OK, Json(version)).into_response(),
        Err(e) => storage_error_response(e),
    }
}

/// GET /api/templates/{id}/versions
pub(crate) async fn handle_list_versions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    if let Err(e) = state.storage.get_template(&id).await {
        return storage_error_response(e);
    }
    match state.storage.list_versions(&id).await {
        Ok(versions) => {
            (StatusCode::OK, Json(serde_json::json!({ "versions": versions }))).into_response()
        }
        Err(e) => storage_error_response(e),
    }
}
