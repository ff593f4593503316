use crate::domain::model::{Gtt, GttRequest, Holding, Profile, Quote};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// Brokerage operations the dashboard needs. `KiteClient` is the production implementation.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn profile(&self) -> Result<Profile>;
    async fn holdings(&self) -> Result<Vec<Holding>>;
    async fn auctions(&self) -> Result<Vec<serde_json::Value>>;
    /// Instruments are `EXCHANGE:SYMBOL`; the map is keyed the same way.
    async fn quote(&self, instruments: &[String]) -> Result<HashMap<String, Quote>>;
    async fn gtts(&self) -> Result<Vec<Gtt>>;
    async fn gtt(&self, trigger_id: i64) -> Result<Gtt>;
    async fn place_gtt(&self, request: &GttRequest) -> Result<i64>;
    async fn modify_gtt(&self, trigger_id: i64, request: &GttRequest) -> Result<i64>;
    async fn delete_gtt(&self, trigger_id: i64) -> Result<i64>;
}
