//! Axum-based HTTP server.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api;
use crate::state::GatewayState;

/// Build the application router.
pub fn router(state: Arc<GatewayState>) -> Router {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/view", get(api::view))
        .route("/api/plan/{lesson_id}", get(api::plan))
        .route("/api/{participant}/start", post(api::touch))
        .route("/api/reset_session", post(api::reset_session))
        .route("/api/score", get(api::score))
        .route("/api/session", get(api::session_summary))
        .route("/api/session/tolerance", post(api::set_tolerance))
        .route("/api/update_lesson", post(api::update_lesson))
        .route("/api/import_lesson", post(api::import))
        .route("/api/lessons", get(api::list_lessons))
        .route("/api/lessons/register", post(api::register))
        .route("/api/lessons/{lesson_id}/source", get(api::lesson_source))
        .route("/api/lessons/{lesson_id}/publish", post(api::publish))
        .with_state(state);

    #[cfg(feature = "metrics")]
    let app = with_metrics(app);

    app.layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive())
}

#[cfg(feature = "metrics")]
fn with_metrics(app: Router) -> Router {
    let app = app.layer(axum::middleware::from_fn(crate::metrics::track_requests));
    match crate::metrics::install_prometheus_recorder() {
        Some(handle) => app.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        ),
        None => app,
    }
}

/// Start the gateway HTTP server.
pub async fn start_gateway(state: Arc<GatewayState>, port: u16) -> anyhow::Result<()> {
    let bind_addr = state.config.gateway_bind();
    let app = router(state);

    let addr = format!("{bind_addr}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    let lesson_id = state.active_lesson_id().await;

    axum::Json(json!({
        "status": "ok",
        "version": version,
        "lesson_id": lesson_id,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(%e, "Failed to listen for CTRL+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
