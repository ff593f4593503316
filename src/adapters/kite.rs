//! Kite Connect v3 REST client.
//!
//! Every response is wrapped in `{status, data, message, error_type}`. A non-success
//! envelope or HTTP status is surfaced as `GttError::KiteError` so callers can tell
//! token problems apart from rejected orders.

use crate::domain::model::{Gtt, GttRequest, Holding, Profile, Quote};
use crate::domain::ports::Broker;
use crate::utils::error::{GttError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const KITE_API_URL: &str = "https://api.kite.trade";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TriggerId {
    trigger_id: i64,
}

pub struct KiteClient {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: String,
    timeout: Duration,
}

impl KiteClient {
    pub fn new(api_key: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::with_base_url(KITE_API_URL, api_key, access_token, 10)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        access_token: impl Into<String>,
        timeout_seconds: u64,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: access_token.into(),
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("X-Kite-Version", "3")
            .header(
                "Authorization",
                format!("token {}:{}", self.api_key, self.access_token),
            )
            .timeout(self.timeout)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("📡 Kite response status: {}", status);

        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => return Err(GttError::SerializationError(e)),
            Err(_) => {
                return Err(GttError::KiteError {
                    status: status.as_u16(),
                    error_type: None,
                    message: body.chars().take(200).collect(),
                })
            }
        };

        if !status.is_success() || envelope.status != "success" {
            return Err(GttError::KiteError {
                status: status.as_u16(),
                error_type: envelope.error_type,
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("Kite request failed with status {}", status)),
            });
        }

        envelope.data.ok_or_else(|| GttError::KiteError {
            status: status.as_u16(),
            error_type: None,
            message: "Kite response has no data".to_string(),
        })
    }

    fn gtt_form(request: &GttRequest) -> Result<Vec<(&'static str, String)>> {
        Ok(vec![
            ("type", request.trigger_type.as_str().to_string()),
            ("condition", serde_json::to_string(&request.condition)?),
            ("orders", serde_json::to_string(&request.orders)?),
        ])
    }
}

#[async_trait]
impl Broker for KiteClient {
    async fn profile(&self) -> Result<Profile> {
        self.send(self.request(Method::GET, "/user/profile")).await
    }

    async fn holdings(&self) -> Result<Vec<Holding>> {
        self.send(self.request(Method::GET, "/portfolio/holdings"))
            .await
    }

    async fn auctions(&self) -> Result<Vec<serde_json::Value>> {
        self.send(self.request(Method::GET, "/portfolio/holdings/auctions"))
            .await
    }

    async fn quote(&self, instruments: &[String]) -> Result<HashMap<String, Quote>> {
        if instruments.is_empty() {
            return Ok(HashMap::new());
        }
        let query: Vec<(&str, &str)> = instruments.iter().map(|i| ("i", i.as_str())).collect();
        self.send(self.request(Method::GET, "/quote").query(&query))
            .await
    }

    async fn gtts(&self) -> Result<Vec<Gtt>> {
        self.send(self.request(Method::GET, "/gtt/triggers")).await
    }

    async fn gtt(&self, trigger_id: i64) -> Result<Gtt> {
        self.send(self.request(Method::GET, &format!("/gtt/triggers/{}", trigger_id)))
            .await
    }

    async fn place_gtt(&self, request: &GttRequest) -> Result<i64> {
        let form = Self::gtt_form(request)?;
        let created: TriggerId = self
            .send(self.request(Method::POST, "/gtt/triggers").form(&form))
            .await?;
        tracing::info!(
            "✅ Placed {} GTT {} for {}",
            request.trigger_type,
            created.trigger_id,
            request.condition.tradingsymbol
        );
        Ok(created.trigger_id)
    }

    async fn modify_gtt(&self, trigger_id: i64, request: &GttRequest) -> Result<i64> {
        let form = Self::gtt_form(request)?;
        let modified: TriggerId = self
            .send(
                self.request(Method::PUT, &format!("/gtt/triggers/{}", trigger_id))
                    .form(&form),
            )
            .await?;
        tracing::info!("✅ Modified GTT {}", modified.trigger_id);
        Ok(modified.trigger_id)
    }

    async fn delete_gtt(&self, trigger_id: i64) -> Result<i64> {
        let deleted: TriggerId = self
            .send(self.request(Method::DELETE, &format!("/gtt/triggers/{}", trigger_id)))
            .await?;
        tracing::info!("✅ Deleted GTT {}", deleted.trigger_id);
        Ok(deleted.trigger_id)
    }
}
