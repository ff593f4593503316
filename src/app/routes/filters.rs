use crate::app::error::{ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::app::state::SharedState;
use crate::core::saved_filters::NewFilter;
use crate::domain::model::SavedFilter;
use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct PopularParams {
    #[serde(default = "default_popular_limit")]
    pub limit: usize,
}

fn default_popular_limit() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub filters: Vec<SavedFilter>,
    #[serde(default)]
    pub overwrite: bool,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_filters).post(save_filter))
        .route("/popular", get(popular))
        .route("/export", get(export))
        .route("/import", post(import))
        .route("/:id", delete(delete_filter))
        .route("/:id/use", post(use_filter))
}

async fn list_filters(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let filters = state.filters.list().await?;
    Ok(Json(json!({ "success": true, "filters": filters })))
}

async fn save_filter(
    State(state): State<SharedState>,
    ApiJson(filter): ApiJson<NewFilter>,
) -> ApiResult<Json<Value>> {
    let saved = state.filters.save(&filter).await?;
    Ok(Json(json!({
        "success": true,
        "filter": saved,
        "message": format!("Filter '{}' saved", saved.name),
    })))
}

async fn delete_filter(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<Value>> {
    state.filters.delete(id).await?;
    Ok(Json(json!({ "success": true, "message": format!("Filter {} deleted", id) })))
}

async fn use_filter(
    State(state): State<SharedState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<Value>> {
    let filter = state.filters.use_filter(id).await?;
    Ok(Json(json!({ "success": true, "filter": filter })))
}

async fn popular(
    State(state): State<SharedState>,
    ApiQuery(params): ApiQuery<PopularParams>,
) -> ApiResult<Json<Value>> {
    let filters = state.filters.popular(params.limit).await?;
    Ok(Json(json!({ "success": true, "filters": filters })))
}

async fn export(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let filters = state.filters.export().await?;
    Ok(Json(json!({
        "success": true,
        "exported_at": chrono::Utc::now(),
        "filters": filters,
    })))
}

async fn import(
    State(state): State<SharedState>,
    ApiJson(request): ApiJson<ImportRequest>,
) -> ApiResult<Json<Value>> {
    let summary = state
        .filters
        .import(request.filters, request.overwrite)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Imported {} filters", summary.imported),
        "results": summary,
    })))
}
