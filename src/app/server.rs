use crate::app::routes::{custom_gtt, debug, filters, gtt, holdings};
use crate::app::state::SharedState;
use crate::utils::error::Result;
use axum::Router;
use tokio::net::TcpListener;

/// Method and path of every route, served by `/api/debug/routes`.
pub const ROUTES: &[(&str, &str)] = &[
    ("GET", "/health"),
    ("GET", "/api/test"),
    ("GET", "/api/debug/routes"),
    ("GET", "/api/debug/kite"),
    ("GET", "/api/debug/diagnostics"),
    ("GET", "/api/gtt/orders"),
    ("GET", "/api/gtt/fetch"),
    ("GET", "/api/gtt/order/:id"),
    ("POST", "/api/gtt/order"),
    ("PUT", "/api/gtt/order/:id"),
    ("DELETE", "/api/gtt/order/:id"),
    ("POST", "/api/gtt/orders/bulk"),
    ("GET", "/api/quote"),
    ("GET", "/api/holdings"),
    ("GET", "/api/holdings/:symbol"),
    ("GET", "/api/auctions"),
    ("GET", "/api/custom-gtt/orders"),
    ("GET", "/api/custom-gtt/orders/:id"),
    ("POST", "/api/custom-gtt/save-order"),
    ("POST", "/api/custom-gtt/update-order/:id"),
    ("POST", "/api/custom-gtt/delete-order/:id"),
    ("POST", "/api/custom-gtt/delete-orders"),
    ("POST", "/api/custom-gtt/place-order/:id"),
    ("POST", "/api/custom-gtt/place-orders"),
    ("POST", "/api/custom-gtt/reset-kite-status/:id"),
    ("GET", "/api/custom-gtt/get-latest-price/:symbol"),
    ("GET", "/api/custom-gtt/get-symbol-info/:symbol"),
    ("POST", "/api/custom-gtt/suggest-order"),
    ("POST", "/api/custom-gtt/sync"),
    ("GET", "/api/saved-filters"),
    ("POST", "/api/saved-filters"),
    ("DELETE", "/api/saved-filters/:id"),
    ("POST", "/api/saved-filters/:id/use"),
    ("GET", "/api/saved-filters/popular"),
    ("GET", "/api/saved-filters/export"),
    ("POST", "/api/saved-filters/import"),
];

pub fn router(state: SharedState) -> Router {
    Router::new()
        .merge(debug::router())
        .merge(gtt::router())
        .merge(holdings::router())
        .nest("/api/custom-gtt", custom_gtt::router())
        .nest("/api/saved-filters", filters::router())
        .with_state(state)
}

pub async fn serve(state: SharedState, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    tracing::info!("🚀 GTT desk API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
