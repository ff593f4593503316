use crate::app::error::ApiResult;
use crate::app::server::ROUTES;
use crate::app::state::SharedState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/test", get(api_test))
        .route("/api/debug/routes", get(routes))
        .route("/api/debug/kite", get(kite_check))
        .route("/api/debug/diagnostics", get(diagnostics))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
    }))
}

async fn api_test() -> Json<Value> {
    Json(json!({ "success": true, "message": "API is working" }))
}

async fn routes() -> Json<Value> {
    let routes: Vec<Value> = ROUTES
        .iter()
        .map(|(method, path)| json!({ "method": method, "path": path }))
        .collect();
    Json(json!({ "success": true, "count": routes.len(), "routes": routes }))
}

async fn kite_check(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let profile = state.service.broker()?.profile().await?;
    Ok(Json(json!({
        "success": true,
        "kite_connected": true,
        "user_id": profile.user_id,
        "user_name": profile.user_name,
    })))
}

async fn diagnostics(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let counts = state.service.store().counts().await?;
    state.monitor.log_stats("diagnostics");
    Ok(Json(json!({
        "success": true,
        "started_at": state.started_at,
        "uptime_secs": state.monitor.uptime().as_secs(),
        "broker_configured": state.service.has_broker(),
        "store": counts,
        "process": state.monitor.get_stats(),
    })))
}
