//! HTTP surface
//!
//! `POST /` and `POST /analyze_food` run the pipeline; `OPTIONS` on both
//! answers CORS preflight. Every response carries permissive CORS headers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use kcal_types::{AnalyzeRequest, Error, ErrorResponse, Result};
use log::{error, info, warn};
use serde_json::json;

use crate::app::AnalysisService;
use crate::config::Config;

pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

pub fn router(service: Arc<AnalysisService>) -> Router {
    Router::new()
        .route("/", post(analyze_food).options(preflight))
        .route("/analyze_food", post(analyze_food).options(preflight))
        .route("/health", get(health))
        .layer(middleware::map_response(add_cors_headers))
        .with_state(service)
}

async fn add_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}

async fn preflight() -> &'static str {
    "ok"
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn analyze_food(State(service): State<Arc<AnalysisService>>, body: Bytes) -> Response {
    let request: AnalyzeRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return error_response(Error::from(e)),
    };

    match service.analyze(&request).await {
        Ok(response) => {
            info!(
                "Analyzed {} item(s) in {}ms via {}",
                response.items.len(),
                response.meta.latency_ms,
                response.meta.used.join(",")
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Error body with the message only; `meta` is left out
fn error_response(err: Error) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!("Analysis failed: {err}");
    } else {
        warn!("Rejected request: {err}");
    }

    let body = ErrorResponse {
        error: err.to_string(),
        meta: None,
    };
    (status, Json(body)).into_response()
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &Config) -> Result<()> {
    let service = Arc::new(AnalysisService::from_config(config)?);
    if !service.has_image_repository() {
        info!("Image storage not configured; inline images are sent as-is");
    }

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
