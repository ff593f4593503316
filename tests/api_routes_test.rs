mod common;

use anyhow::Result;
use common::FakeBroker;
use gtt_desk::adapters::{LocalStorage, OrderStore};
use gtt_desk::app::{router, AppState};
use gtt_desk::domain::ports::Broker;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

struct TestApp {
    base: String,
    http: reqwest::Client,
    _data_dir: TempDir,
}

impl TestApp {
    async fn start(broker: Option<FakeBroker>) -> Result<Self> {
        let data_dir = TempDir::new()?;
        let store = Arc::new(OrderStore::open(":memory:").await?);
        let broker = broker.map(|b| Arc::new(b) as Arc<dyn Broker>);
        let state = AppState::new(store, broker, LocalStorage::new(data_dir.path()));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move { axum::serve(listener, router(state)).await });

        Ok(Self {
            base: format!("http://{}", addr),
            http: reqwest::Client::new(),
            _data_dir: data_dir,
        })
    }

    async fn get(&self, path: &str) -> Result<(u16, Value)> {
        let response = self.http.get(format!("{}{}", self.base, path)).send().await?;
        Ok((response.status().as_u16(), response.json().await?))
    }

    async fn post(&self, path: &str, body: Value) -> Result<(u16, Value)> {
        let response = self
            .http
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await?;
        Ok((response.status().as_u16(), response.json().await?))
    }

    async fn delete(&self, path: &str) -> Result<(u16, Value)> {
        let response = self.http.delete(format!("{}{}", self.base, path)).send().await?;
        Ok((response.status().as_u16(), response.json().await?))
    }
}

#[tokio::test]
async fn health_and_route_listing() -> Result<()> {
    let app = TestApp::start(None).await?;

    let (status, body) = app.get("/health").await?;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/api/debug/routes").await?;
    assert_eq!(status, 200);
    assert!(body["routes"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["path"] == "/api/custom-gtt/place-order/:id"));
    Ok(())
}

#[tokio::test]
async fn custom_order_save_list_and_place() -> Result<()> {
    let app = TestApp::start(Some(FakeBroker::new().with_quote("NSE:INFY", 1500.0))).await?;

    let (status, saved) = app
        .post(
            "/api/custom-gtt/save-order",
            json!({"symbol": "INFY", "order_type": "BUY", "trigger_price": 1400.0, "quantity": 2}),
        )
        .await?;
    assert_eq!(status, 200);
    assert_eq!(saved["success"], true);
    let id = saved["order_id"].as_i64().unwrap();

    let (_, listing) = app.get("/api/custom-gtt/orders?kite_status=not_placed").await?;
    assert_eq!(listing["data"]["total_count"], 1);
    assert_eq!(listing["data"]["records"][0]["symbol"], "INFY");

    let (status, placed) = app
        .post(&format!("/api/custom-gtt/place-order/{}", id), json!({}))
        .await?;
    assert_eq!(status, 200);
    assert_eq!(placed["trigger_id"], 1001);

    let (status, again) = app
        .post(&format!("/api/custom-gtt/place-order/{}", id), json!({}))
        .await?;
    assert_eq!(status, 409);
    assert_eq!(again["success"], false);

    let (_, order) = app.get(&format!("/api/custom-gtt/orders/{}", id)).await?;
    assert_eq!(order["order"]["placed_on_kite"], true);
    assert_eq!(order["order"]["last_price"], 1500.0);
    Ok(())
}

#[tokio::test]
async fn error_envelopes_carry_status_codes() -> Result<()> {
    let app = TestApp::start(Some(FakeBroker::new())).await?;

    let (status, body) = app
        .post(
            "/api/custom-gtt/save-order",
            json!({"symbol": "SBIN", "order_type": "BUY", "trigger_type": "single"}),
        )
        .await?;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let (status, _) = app
        .post("/api/custom-gtt/save-order", json!({"symbol": "SBIN"}))
        .await?;
    assert_eq!(status, 400);

    let (status, body) = app.get("/api/custom-gtt/orders/4242").await?;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .post("/api/custom-gtt/place-orders", json!({"order_ids": []}))
        .await?;
    assert_eq!(status, 400);
    Ok(())
}

#[tokio::test]
async fn broker_routes_fail_without_credentials() -> Result<()> {
    let app = TestApp::start(None).await?;

    let (status, body) = app.get("/api/gtt/orders").await?;
    assert_eq!(status, 500);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/api/holdings").await?;
    assert_eq!(status, 500);

    let (status, body) = app.get("/api/debug/diagnostics").await?;
    assert_eq!(status, 200);
    assert_eq!(body["broker_configured"], false);
    Ok(())
}

#[tokio::test]
async fn holdings_and_gtt_listing_go_through_broker() -> Result<()> {
    let broker = FakeBroker::new()
        .with_holding("ITC", 10)
        .with_gtt(common::gtt(
            9,
            "ITC",
            gtt_desk::domain::model::TransactionType::Sell,
            "active",
        ));
    let app = TestApp::start(Some(broker)).await?;

    let (status, body) = app.get("/api/holdings").await?;
    assert_eq!(status, 200);
    assert_eq!(body["summary"]["holdings_count"], 1);

    let (status, _) = app.get("/api/holdings/NOPE").await?;
    assert_eq!(status, 404);

    let (status, body) = app.get("/api/gtt/fetch?search=itc").await?;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total_count"], 1);
    assert_eq!(body["data"]["records"][0]["id"], 9);
    Ok(())
}

#[tokio::test]
async fn saved_filter_lifecycle() -> Result<()> {
    let app = TestApp::start(None).await?;

    let (status, body) = app
        .post("/api/saved-filters", json!({"name": "Banks", "query": "BANK"}))
        .await?;
    assert_eq!(status, 200);
    let id = body["filter"]["id"].as_u64().unwrap();

    let (status, _) = app
        .post("/api/saved-filters", json!({"name": "banks", "query": "HDFC"}))
        .await?;
    assert_eq!(status, 409);

    let (status, body) = app
        .post(&format!("/api/saved-filters/{}/use", id), json!({}))
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["filter"]["usage_count"], 1);

    let (_, body) = app.get("/api/saved-filters/popular").await?;
    assert_eq!(body["filters"].as_array().unwrap().len(), 1);

    let (_, exported) = app.get("/api/saved-filters/export").await?;
    let (status, body) = app
        .post(
            "/api/saved-filters/import",
            json!({"filters": exported["filters"], "overwrite": false}),
        )
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["results"]["imported"], 0);

    let (status, _) = app.delete(&format!("/api/saved-filters/{}", id)).await?;
    assert_eq!(status, 200);
    let (_, body) = app.get("/api/saved-filters").await?;
    assert!(body["filters"].as_array().unwrap().is_empty());

    let (status, _) = app.delete(&format!("/api/saved-filters/{}", id)).await?;
    assert_eq!(status, 404);
    Ok(())
}

#[tokio::test]
async fn gtt_fetch_survives_huge_page_numbers() -> Result<()> {
    let broker = FakeBroker::new().with_gtt(common::gtt(
        9,
        "ITC",
        gtt_desk::domain::model::TransactionType::Buy,
        "active",
    ));
    let app = TestApp::start(Some(broker)).await?;

    let (status, body) = app
        .get("/api/gtt/fetch?page=4294967295&per_page=4294967295")
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total_count"], 1);
    assert!(body["data"]["records"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["per_page"], 500);
    Ok(())
}

#[tokio::test]
async fn gtt_create_accepts_comma_separated_trigger_values() -> Result<()> {
    let app = TestApp::start(Some(FakeBroker::new())).await?;

    let (status, body) = app
        .post(
            "/api/gtt/order",
            json!({
                "tradingsymbol": "INFY",
                "trigger_type": "two-leg",
                "trigger_values": "1650, 1400",
                "last_price": 1500.0,
                "transaction_type": "SELL",
                "quantity": 3
            }),
        )
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["trigger_id"], 1001);

    let (_, listing) = app.get("/api/gtt/orders").await?;
    let values = &listing["orders"][0]["condition"]["trigger_values"];
    assert_eq!(values, &json!([1400.0, 1650.0]));

    let (status, body) = app
        .post(
            "/api/gtt/orders/bulk",
            json!({"orders": [{
                "tradingsymbol": "TCS",
                "trigger_values": "3000",
                "last_price": 3200.0,
                "transaction_type": "BUY",
                "quantity": 1
            }]}),
        )
        .await?;
    assert_eq!(status, 200);
    assert_eq!(body["results"]["success"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn malformed_query_and_path_use_json_envelope() -> Result<()> {
    let app = TestApp::start(Some(FakeBroker::new())).await?;

    for path in [
        "/api/gtt/fetch?page=abc",
        "/api/custom-gtt/orders?kite_status=sideways",
        "/api/custom-gtt/orders/abc",
        "/api/gtt/order/not-a-number",
    ] {
        let (status, body) = app.get(path).await?;
        assert_eq!(status, 400, "{}", path);
        assert_eq!(body["success"], false, "{}", path);
        assert!(body["error"].is_string(), "{}", path);
    }

    let (status, body) = app.delete("/api/saved-filters/xyz").await?;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    Ok(())
}
