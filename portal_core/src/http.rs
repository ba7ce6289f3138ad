use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use portal_proto::encode_change_set_json;
use tokio::net::TcpListener;
use tracing::error;

use crate::shared::{SharedPortal, UpdateError, UpdateOutcome};

const JSON_UTF8: &str = "application/json; charset=utf-8";

pub fn router(portal: Arc<SharedPortal>) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/status", post(post_update))
        .route("/status/faction", get(status_faction))
        .route("/status/health", get(status_health))
        .route("/status/level", get(status_level))
        .route("/status/json", get(status_json))
        .route("/status/jsonLegacy", get(status_json_legacy))
        .route("/status/metrics", get(status_metrics))
        .with_state(portal)
}

/// Serve the status routes on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, portal: Arc<SharedPortal>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(portal))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn banner() -> &'static str {
    "portal status service"
}

async fn status_faction(State(portal): State<Arc<SharedPortal>>) -> String {
    portal.faction().to_string()
}

async fn status_health(State(portal): State<Arc<SharedPortal>>) -> String {
    portal.health().to_string()
}

async fn status_level(State(portal): State<Arc<SharedPortal>>) -> String {
    portal.level().to_string()
}

async fn status_json(State(portal): State<Arc<SharedPortal>>) -> Response {
    json_body(portal.render_current())
}

async fn status_json_legacy(State(portal): State<Arc<SharedPortal>>) -> Response {
    json_body(portal.render_legacy())
}

async fn status_metrics(State(portal): State<Arc<SharedPortal>>) -> Response {
    Json(portal.metrics()).into_response()
}

async fn post_update(State(portal): State<Arc<SharedPortal>>, body: String) -> Response {
    match portal.apply_update_json(&body) {
        Ok(UpdateOutcome::Changed(changes)) => json_body(encode_change_set_json(&changes)),
        Ok(UpdateOutcome::Unchanged) => StatusCode::NO_CONTENT.into_response(),
        Err(err @ UpdateError::Parse(_)) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        Err(err @ UpdateError::Validation(_)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()).into_response()
        }
    }
}

fn json_body(rendered: serde_json::Result<String>) -> Response {
    match rendered {
        Ok(body) => ([(header::CONTENT_TYPE, JSON_UTF8)], body).into_response(),
        Err(err) => {
            error!(target: "portal::server", error = %err, "render.failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "render failed").into_response()
        }
    }
}
