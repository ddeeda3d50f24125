use axum::{
    extract::{Path, State},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use anyhow::Context;
use models::PrescriptionData;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use storage::{PrescriptionStore, StorageError};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

pub mod config;
use crate::config::{CorsConfig, RestApiConfig};

// Define the REST API error enum
#[derive(Debug, Error)]
pub enum RestApiError {
    #[error("Prescription not found")]
    NotFound,
    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for RestApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => RestApiError::NotFound,
            other => RestApiError::Storage(other),
        }
    }
}

// Implement IntoResponse for RestApiError to convert it into an HTTP response
impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            RestApiError::NotFound => (StatusCode::NOT_FOUND, "Prescription not found".to_string()),
            RestApiError::Storage(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("Storage error: {}", e)),
        };

        let body = Json(json!({ "message": message }));

        (status, body).into_response()
    }
}

// Shared state for the Axum application
#[derive(Clone)]
struct AppState {
    store: Arc<PrescriptionStore>,
}

// Handler for GET /prescriptions/{id}
async fn get_prescription_handler(
    State(state): State<AppState>,
    Path(prescription_id): Path<i64>,
) -> Result<Json<PrescriptionData>, RestApiError> {
    let prescription = state.store.fetch(prescription_id).await?;
    Ok(Json(prescription))
}

// Handler for POST /prescriptions/{id}
async fn update_prescription_handler(
    State(state): State<AppState>,
    Path(prescription_id): Path<i64>,
    Json(payload): Json<PrescriptionData>,
) -> Result<Json<Value>, RestApiError> {
    state.store.replace(prescription_id, &payload).await?;
    Ok(Json(json!({ "message": "Prescription updated" })))
}

// Handler for POST /store
async fn create_prescription_handler(
    State(state): State<AppState>,
    Json(payload): Json<PrescriptionData>,
) -> Result<Json<Value>, RestApiError> {
    let prescription_id = state.store.create(&payload).await?;
    Ok(Json(json!({
        "message": format!("Prescription created with ID: {}", prescription_id)
    })))
}

// Handler for the /health endpoint
async fn health_check_handler() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok", "message": "REST API is healthy" })))
}

fn allowed_origins(cors: &CorsConfig) -> AllowOrigin {
    if cors.allow_origins.iter().any(|origin| origin == "*") {
        return AllowOrigin::any();
    }
    AllowOrigin::list(cors.allow_origins.iter().filter_map(|origin| {
        match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        }
    }))
}

fn allowed_methods(cors: &CorsConfig) -> AllowMethods {
    if cors.allow_methods.iter().any(|method| method == "*") {
        return AllowMethods::any();
    }
    AllowMethods::list(cors.allow_methods.iter().filter_map(|method| {
        match method.parse::<Method>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS method: {}", method);
                None
            }
        }
    }))
}

fn allowed_headers(cors: &CorsConfig) -> AllowHeaders {
    if cors.allow_headers.iter().any(|header_name| header_name == "*") {
        return AllowHeaders::any();
    }
    AllowHeaders::list(cors.allow_headers.iter().filter_map(|header_name| {
        match header_name.parse::<HeaderName>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS header: {}", header_name);
                None
            }
        }
    }))
}

fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_origin(allowed_origins(cors))
        .allow_methods(allowed_methods(cors))
        .allow_headers(allowed_headers(cors));

    // tower-http rejects credentials combined with any wildcard, so the
    // default allow-everything policy leaves them disabled.
    if cors.allow_credentials && !cors.has_wildcard() {
        layer.allow_credentials(true)
    } else {
        layer
    }
}

/// Builds the application router with all routes, state, and the CORS layer.
pub fn app_router(store: Arc<PrescriptionStore>, cors: &CorsConfig) -> Router {
    let app_state = AppState { store };

    Router::new()
        .route(
            "/prescriptions/:id",
            get(get_prescription_handler).post(update_prescription_handler),
        )
        .route("/store", post(create_prescription_handler))
        .route("/health", get(health_check_handler))
        .with_state(app_state)
        .layer(build_cors_layer(cors))
}

// Main function to start the REST API server
pub async fn start_server(
    config: RestApiConfig,
    store: Arc<PrescriptionStore>,
    shutdown_rx: oneshot::Receiver<()>,
) -> Result<(), anyhow::Error> {
    let app = app_router(store, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context(format!("Invalid listen address {}:{}", config.host, config.port))?;
    tracing::info!("REST API server listening on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to address: {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
            tracing::info!("Received shutdown signal.");
        })
        .await
        .context("REST API server failed to start or run")?;

    tracing::info!("REST API server stopped.");
    Ok(())
}
