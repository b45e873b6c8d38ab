//! HTTP API server for integration with other systems.
//!
//! The chat endpoint relays the orchestrator's event stream as
//! line-delimited JSON; artifact endpoints expose the version store.

use crate::artifact::{open_store, ArtifactStore};
use crate::capability::standard_registry;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::orchestrator::{ChatMessage, Orchestrator, TurnOptions};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

/// Shared application state.
struct AppState {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn ArtifactStore>,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    preflight::check(Operation::Serve, &settings)?;

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let registry = Arc::new(standard_registry(&settings, &prompts)?);
    let store = open_store(&settings)?;
    let orchestrator = Arc::new(Orchestrator::new(
        &settings,
        prompts,
        registry,
        Some(store.clone()),
    ));

    let state = Arc::new(AppState {
        orchestrator,
        store,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/artifacts", get(list_artifacts))
        .route("/artifacts/{id}", get(get_artifact))
        .route("/artifacts/{id}/versions", get(get_versions))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Laer API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Chat (NDJSON stream)", "POST /chat");
    Output::kv("List Artifacts", "GET  /artifacts");
    Output::kv("Get Artifact", "GET  /artifacts/:id");
    Output::kv("Version History", "GET  /artifacts/:id/versions");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ChatRequest {
    /// Ordered conversation messages.
    messages: Vec<ChatMessage>,
    /// Capability names to disable for this turn.
    #[serde(default)]
    exclude: Vec<String>,
    /// Owner recorded on artifacts persisted during this turn.
    #[serde(default)]
    owner: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    if req.messages.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "messages must not be empty".to_string(),
        );
    }

    let options = TurnOptions {
        exclude: req.exclude.into_iter().collect(),
        owner: req.owner,
    };

    let stream = state
        .orchestrator
        .clone()
        .stream_turn(req.messages, options)
        .map(|event| {
            let mut line = serde_json::to_string(&event).unwrap_or_else(|e| {
                serde_json::json!({ "type": "error", "message": e.to_string() }).to_string()
            });
            line.push('\n');
            Ok::<_, std::convert::Infallible>(line)
        });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|e| {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
}

async fn list_artifacts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.list_latest().await {
        Ok(artifacts) => Json(serde_json::json!({
            "total": artifacts.len(),
            "artifacts": artifacts,
        }))
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn get_artifact(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(id): axum::extract::Path<String>,
) -> impl IntoResponse {
    let Ok(artifact_id) = Uuid::parse_str(&id) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("'{}' is not a valid artifact id", id),
        );
    };

    match state.store.get_latest(artifact_id).await {
        Ok(Some(version)) => Json(version).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Artifact not found: {}", artifact_id),
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn get_versions(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(id): axum::extract::Path<String>,
) -> impl IntoResponse {
    let Ok(artifact_id) = Uuid::parse_str(&id) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("'{}' is not a valid artifact id", id),
        );
    };

    match state.store.get_all_versions(artifact_id).await {
        Ok(versions) if versions.is_empty() => error_response(
            StatusCode::NOT_FOUND,
            format!("Artifact not found: {}", artifact_id),
        ),
        Ok(versions) => Json(serde_json::json!({
            "artifact_id": artifact_id,
            "total": versions.len(),
            "versions": versions,
        }))
        .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
