//! HTTP Server - serves the dashboard page and its update API
//!
//! Endpoints:
//! - GET  /            → Dashboard page (initial outputs already rendered)
//! - POST /_update     → Run callbacks for changed controls
//! - GET  /api/clock   → SSE stream of clock ticks
//! - GET  /api/species → Species with row counts
//! - GET  /healthz     → Liveness
//! - GET  /assets/*    → Static files from the web directory

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use thiserror::Error;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::controller::{CallbackError, DispatchError, PropRef, PropertyMap, Update};
use crate::state::AppState;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Dispatch(DispatchError {
                source: source @ (CallbackError::MissingInput(_) | CallbackError::InvalidInput { .. }),
                ..
            }) => (StatusCode::BAD_REQUEST, source.to_string()),
            // Details stay in the log; the page keeps its previous output
            ApiError::Dispatch(_) => (StatusCode::INTERNAL_SERVER_ERROR, "update failed".to_string()),
        };
        tracing::warn!("{} -> {}", self, status);
        (
            status,
            Json(ErrorBody {
                status: "error",
                message,
            }),
        )
            .into_response()
    }
}

/// Build the router (separate from `serve` so tests can drive it in-process)
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let assets = ServeDir::new(&state.web_dir);
    tracing::debug!("Static file serving from {}", state.web_dir);

    Router::new()
        .route("/", get(index))
        .route("/_update", post(update))
        .route("/api/clock", get(clock_stream))
        .route("/api/species", get(list_species))
        .route("/healthz", get(healthz))
        .nest_service("/assets", assets)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    tracing::info!("Initializing HTTP server on port {}", port);

    let app = router(state.clone());

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("Starting {} on http://localhost:{}", state.app_name(), port);
    tracing::info!("  Health: http://localhost:{}/healthz", port);
    tracing::info!("  Records loaded: {}", state.dashboard.dataset().len());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server bound to {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET / - dashboard page
async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    tracing::debug!("GET /");
    Ok(Html(state.dashboard.page()?))
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    changed: Vec<PropRef>,
    inputs: PropertyMap,
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    updates: Vec<Update>,
}

/// POST /_update - recompute outputs bound to the changed inputs
async fn update(
    State(state): State<AppState>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    tracing::info!(
        "POST /_update changed=[{}]",
        request
            .changed
            .iter()
            .map(PropRef::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let updates = state.dashboard.update(&request.changed, &request.inputs)?;
    tracing::debug!("Returning {} updates", updates.len());
    Ok(Json(UpdateResponse { updates }))
}

/// GET /api/clock - clock ticks as server-sent events
async fn clock_stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("GET /api/clock - new subscriber");
    let stream = BroadcastStream::new(state.subscribe_clock()).filter_map(|result| {
        result.ok().and_then(|event| {
            serde_json::to_string(&event)
                .ok()
                .map(|data| Ok(Event::default().event("tick").data(data)))
        })
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}

#[derive(Serialize)]
struct SpeciesEntry {
    name: String,
    rows: usize,
}

/// GET /api/species - species with row counts
async fn list_species(State(state): State<AppState>) -> impl IntoResponse {
    let species: Vec<SpeciesEntry> = state
        .dashboard
        .dataset()
        .species_counts()
        .into_iter()
        .map(|(name, rows)| SpeciesEntry { name, rows })
        .collect();
    tracing::debug!("GET /api/species - {} species", species.len());
    Json(species)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub app: String,
    pub time: String,
}

/// GET /healthz - always ok while the process can answer
async fn healthz(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        app: state.app_name().to_string(),
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
