use crate::app::error::{ApiPath, ApiResult};
use crate::app::state::SharedState;
use crate::core::holdings::{find_holding, summarize};
use crate::utils::error::GttError;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/holdings", get(list_holdings))
        .route("/api/holdings/:symbol", get(holding_detail))
        .route("/api/auctions", get(auctions))
}

async fn list_holdings(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let holdings = state.service.broker()?.holdings().await?;
    let summary = summarize(&holdings);
    Ok(Json(json!({
        "success": true,
        "holdings": holdings,
        "summary": summary,
    })))
}

async fn holding_detail(
    State(state): State<SharedState>,
    ApiPath(symbol): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    let holdings = state.service.broker()?.holdings().await?;
    let holding = find_holding(&holdings, &symbol)
        .ok_or_else(|| GttError::not_found(format!("Holding {} not found", symbol)))?;
    Ok(Json(json!({ "success": true, "holding": holding })))
}

async fn auctions(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let auctions = state.service.broker()?.auctions().await?;
    Ok(Json(json!({ "success": true, "auctions": auctions })))
}
