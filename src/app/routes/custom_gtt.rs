use crate::app::error::{ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::app::state::SharedState;
use crate::core::gtt_service::SuggestRequest;
use crate::domain::model::{default_exchange, CustomOrderPatch, NewCustomOrder, OrderQuery};
use crate::utils::error::GttError;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct OrderIds {
    #[serde(default)]
    pub order_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeParam {
    #[serde(default = "default_exchange")]
    pub exchange: String,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/save-order", post(save_order))
        .route("/update-order/:id", post(update_order))
        .route("/delete-order/:id", post(delete_order))
        .route("/delete-orders", post(delete_orders))
        .route("/place-order/:id", post(place_order))
        .route("/place-orders", post(place_orders))
        .route("/reset-kite-status/:id", post(reset_kite_status))
        .route("/get-latest-price/:symbol", get(latest_price))
        .route("/get-symbol-info/:symbol", get(symbol_info))
        .route("/suggest-order", post(suggest_order))
        .route("/sync", post(sync))
}

async fn list_orders(
    State(state): State<SharedState>,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> ApiResult<Json<Value>> {
    let page = state.service.store().list_orders(&query).await?;
    Ok(Json(json!({ "success": true, "data": page })))
}

async fn get_order(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Value>> {
    let order = state.service.get_order(id).await?;
    Ok(Json(json!({ "success": true, "order": order })))
}

async fn save_order(
    State(state): State<SharedState>,
    ApiJson(order): ApiJson<NewCustomOrder>,
) -> ApiResult<Json<Value>> {
    let saved = state.service.save_order(&order).await?;
    Ok(Json(json!({
        "success": true,
        "order_id": saved.id,
        "order": saved,
        "message": "Order saved",
    })))
}

async fn update_order(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<CustomOrderPatch>,
) -> ApiResult<Json<Value>> {
    let order = state.service.update_order(id, &patch).await?;
    Ok(Json(json!({
        "success": true,
        "order": order,
        "message": format!("Order {} updated", id),
    })))
}

async fn delete_order(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Value>> {
    if !state.service.store().soft_delete(id).await? {
        return Err(GttError::not_found(format!("Order {} not found", id)).into());
    }
    Ok(Json(json!({ "success": true, "message": format!("Order {} deleted", id) })))
}

async fn delete_orders(
    State(state): State<SharedState>,
    ApiJson(ids): ApiJson<OrderIds>,
) -> ApiResult<Json<Value>> {
    let report = state.service.delete_many(&ids.order_ids).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Deleted {} orders, {} failed",
            report.success.len(),
            report.failed.len()
        ),
        "results": report,
    })))
}

async fn place_order(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Value>> {
    let trigger_id = state.service.place_custom_order(id).await?;
    Ok(Json(json!({
        "success": true,
        "trigger_id": trigger_id,
        "message": format!("Order placed on Kite with trigger ID {}", trigger_id),
    })))
}

async fn place_orders(
    State(state): State<SharedState>,
    ApiJson(ids): ApiJson<OrderIds>,
) -> ApiResult<Json<Value>> {
    let report = state.service.place_many(&ids.order_ids).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Successfully placed {} orders, {} failed",
            report.success.len(),
            report.failed.len()
        ),
        "results": report,
    })))
}

async fn reset_kite_status(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Value>> {
    state.service.reset_kite_status(id).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Kite status reset for order {}", id),
    })))
}

async fn latest_price(
    State(state): State<SharedState>,
    ApiPath(symbol): ApiPath<String>,
    ApiQuery(params): ApiQuery<ExchangeParam>,
) -> ApiResult<Json<Value>> {
    let symbol = symbol.trim().to_ascii_uppercase();
    let last_price = state.service.latest_price(&params.exchange, &symbol).await?;
    Ok(Json(json!({
        "success": true,
        "symbol": symbol,
        "last_price": last_price,
    })))
}

async fn symbol_info(
    State(state): State<SharedState>,
    ApiPath(symbol): ApiPath<String>,
    ApiQuery(params): ApiQuery<ExchangeParam>,
) -> ApiResult<Json<Value>> {
    let info = state.service.symbol_info(&symbol, &params.exchange).await?;
    Ok(Json(json!({ "success": true, "data": info })))
}

async fn suggest_order(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<SuggestRequest>,
) -> ApiResult<Json<Value>> {
    let order = state.service.suggest_order(&request).await?;
    Ok(Json(json!({ "success": true, "order": order })))
}

async fn sync(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let report = state.service.sync_with_broker().await?;
    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Checked {} orders, reset {}, {} conflicts",
            report.checked,
            report.reset.len(),
            report.conflicts.len()
        ),
        "results": report,
    })))
}
