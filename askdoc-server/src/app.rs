//! The query endpoint.
//!
//! One route: `POST /query` with body `{"query": "<string>"}`. An absent
//! or empty question is a client error answered with the literal
//! `{"error": "No query provided"}` before the engine is touched. A
//! backend failure becomes a plain 500 with no internal detail leaked.

use askdoc_core::{EngineError, QueryEngine};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// State shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/query", post(handle_query))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: String,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Response {
    info!("Received request");

    match state.engine.answer(&request.query).await {
        Ok(answer) => (StatusCode::OK, Json(json!({ "response": answer }))).into_response(),
        Err(EngineError::EmptyQuestion) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No query provided" })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "query failed" })),
            )
                .into_response()
        }
    }
}
