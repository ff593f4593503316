use crate::app::error::{ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::app::state::SharedState;
use crate::core::gtt_service::GttFilter;
use crate::domain::model::{default_exchange, GttDraft, GttEdit};
use crate::utils::error::GttError;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub orders: Vec<GttDraft>,
}

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub symbol: Option<String>,
    #[serde(default = "default_exchange")]
    pub exchange: String,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/gtt/orders", get(list_gtts))
        .route("/api/gtt/fetch", get(fetch_gtts))
        .route("/api/gtt/order", post(create_gtt))
        .route(
            "/api/gtt/order/:id",
            get(get_gtt).put(modify_gtt).delete(delete_gtt),
        )
        .route("/api/gtt/orders/bulk", post(bulk_create))
        .route("/api/quote", get(quote))
}

async fn list_gtts(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let gtts = state.service.broker()?.gtts().await?;
    Ok(Json(json!({ "success": true, "count": gtts.len(), "orders": gtts })))
}

async fn fetch_gtts(
    State(state): State<SharedState>,
    ApiQuery(filter): ApiQuery<GttFilter>,
) -> ApiResult<Json<Value>> {
    let page = state.service.filtered_gtts(&filter).await?;
    Ok(Json(json!({ "success": true, "data": page })))
}

async fn get_gtt(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Value>> {
    let gtt = state.service.broker()?.gtt(id).await?;
    Ok(Json(json!({ "success": true, "order": gtt })))
}

async fn create_gtt(
    State(state): State<SharedState>,
    ApiJson(draft): ApiJson<GttDraft>,
) -> ApiResult<Json<Value>> {
    let trigger_id = state.service.create_gtt(&draft).await?;
    Ok(Json(json!({
        "success": true,
        "trigger_id": trigger_id,
        "message": format!("GTT order placed with trigger ID {}", trigger_id),
    })))
}

async fn modify_gtt(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(edit): ApiJson<GttEdit>,
) -> ApiResult<Json<Value>> {
    let trigger_id = state.service.modify_gtt(id, &edit).await?;
    Ok(Json(json!({
        "success": true,
        "trigger_id": trigger_id,
        "message": format!("GTT order {} modified", trigger_id),
    })))
}

async fn delete_gtt(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Value>> {
    let reset = state.service.delete_broker_gtt(id).await?;
    Ok(Json(json!({
        "success": true,
        "trigger_id": id,
        "reset_orders": reset,
        "message": format!("GTT order {} deleted", id),
    })))
}

async fn bulk_create(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<BulkRequest>,
) -> ApiResult<Json<Value>> {
    let report = state.service.place_bulk(&request.orders).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Placed {} orders, {} failed",
            report.success.len(),
            report.failed.len()
        ),
        "results": report,
    })))
}

async fn quote(
    State(state): State<SharedState>,
    ApiQuery(params): ApiQuery<QuoteParams>,
) -> ApiResult<Json<Value>> {
    let symbol = params
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GttError::validation("Symbol is required"))?
        .to_ascii_uppercase();
    let last_price = state.service.latest_price(&params.exchange, &symbol).await?;
    Ok(Json(json!({
        "success": true,
        "symbol": symbol,
        "exchange": params.exchange.to_ascii_uppercase(),
        "last_price": last_price,
    })))
}
