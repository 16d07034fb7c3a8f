//! `checkpath serve` -- HTTP JSON API server for the decision engine.
//!
//! Exposes template authoring and checklist execution as an async HTTP
//! service using `axum` + `tokio`. Supports concurrent request handling;
//! mutations against the same execution are serialized by the engine.
//!
//! Endpoints:
//! - GET  /health                            - Server status
//! - POST /api/templates                     - Create a template
//! - GET  /api/templates                     - List templates
//! - GET  /api/templates/{id}                - Template with versions and draft
//! - PUT  /api/templates/{id}/draft          - Save the working draft
//! - POST /api/templates/{id}/validate       - Validate a configuration
//! - POST /api/templates/{id}/publish        - Publish the draft as a version
//! - GET  /api/templates/{id}/versions       - List published versions
//! - GET  /api/templates/version/{vid}       - Fetch one published version
//! - POST /api/executions                    - Start an execution
//! - GET  /api/executions/{id}               - Execution with path and answers
//! - POST /api/executions/{id}/answers       - Apply an answer
//! - POST /api/executions/{id}/undo          - Undo the last answer
//! - POST /api/executions/{id}/finish        - Finalize and evaluate outcomes
//!
//! All responses use Content-Type: application/json.

mod executions;
mod handlers;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use checkpath_engine::ExecutionCoordinator;
use checkpath_storage::MemoryStorage;

use self::executions::{
    handle_answer, handle_create_execution, handle_finish, handle_get_execution, handle_undo,
};
use self::handlers::{
    handle_create_template, handle_draft, handle_get_template, handle_get_version,
    handle_health, handle_list_templates, handle_list_versions, handle_not_found,
    handle_publish, handle_validate,
};
use self::state::AppState;

/// Maximum request body size: 2 MB.
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Start the HTTP server on the given port.
///
/// State is held in the in-memory backend; the process owns the full
/// lifecycle from template authoring to execution finalize. CORS is
/// permissive (`Any` origin) for local dev.
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Arc::new(MemoryStorage::new());
    let state = Arc::new(AppState {
        storage: storage.clone(),
        coordinator: ExecutionCoordinator::new(storage),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route(
            "/api/templates",
            get(handle_list_templates).post(handle_create_template),
        )
        .route("/api/templates/version/{vid}", get(handle_get_version))
        .route("/api/templates/{id}", get(handle_get_template))
        .route("/api/templates/{id}/draft", put(handle_draft))
        .route("/api/templates/{id}/validate", post(handle_validate))
        .route("/api/templates/{id}/publish", post(handle_publish))
        .route("/api/templates/{id}/versions", get(handle_list_versions))
        .route("/api/executions", post(handle_create_execution))
        .route("/api/executions/{id}", get(handle_get_execution))
        .route("/api/executions/{id}/answers", post(handle_answer))
        .route("/api/executions/{id}/undo", post(handle_undo))
        .route("/api/executions/{id}/finish", post(handle_finish))
        .fallback(handle_not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("Checkpath server listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    eprintln!("\nReceived shutdown signal...");
}
