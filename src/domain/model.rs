use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Buy,
    Sell,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerType {
    #[serde(rename = "single")]
    Single,
    #[serde(rename = "two-leg")]
    TwoLeg,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::TwoLeg => "two-leg",
        }
    }

    /// Accepts `single`, `two-leg`, and the `OCO`/`two_leg` spellings used in spreadsheets.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "single" => Some(Self::Single),
            "two-leg" | "two_leg" | "twoleg" | "oco" => Some(Self::TwoLeg),
            _ => None,
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GttCondition {
    pub exchange: String,
    pub tradingsymbol: String,
    pub trigger_values: Vec<f64>,
    pub last_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_token: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GttLeg {
    pub exchange: String,
    pub tradingsymbol: String,
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub price: f64,
    #[serde(default = "default_order_type")]
    pub order_type: String,
    #[serde(default = "default_product")]
    pub product: String,
    #[serde(default, skip_serializing)]
    pub result: Option<serde_json::Value>,
}

fn default_order_type() -> String {
    "LIMIT".to_string()
}

fn default_product() -> String {
    "CNC".to_string()
}

/// A trigger as reported by the broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gtt {
    pub id: i64,
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub status: String,
    pub condition: GttCondition,
    pub orders: Vec<GttLeg>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Gtt {
    pub fn transaction_type(&self) -> Option<TransactionType> {
        self.orders.first().map(|leg| leg.transaction_type)
    }

    pub fn quantity(&self) -> i64 {
        self.orders.first().map(|leg| leg.quantity).unwrap_or(0)
    }

    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}

/// Payload for placing or modifying a trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GttRequest {
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    pub condition: GttCondition,
    pub orders: Vec<GttLeg>,
}

/// Flat user intent that `core::trigger::build_gtt` turns into a `GttRequest`.
#[derive(Debug, Clone, Deserialize)]
pub struct GttDraft {
    #[serde(alias = "tradingsymbol")]
    pub symbol: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(default = "default_trigger_type")]
    pub trigger_type: TriggerType,
    #[serde(deserialize_with = "crate::core::trigger::deserialize_trigger_values")]
    pub trigger_values: Vec<f64>,
    #[serde(default)]
    pub last_price: Option<f64>,
    pub transaction_type: TransactionType,
    pub quantity: i64,
    #[serde(default)]
    pub price: Option<f64>,
}

pub fn default_exchange() -> String {
    "NSE".to_string()
}

fn default_trigger_type() -> TriggerType {
    TriggerType::Single
}

/// Edit of a live broker trigger.
#[derive(Debug, Clone, Deserialize)]
pub struct GttEdit {
    #[serde(deserialize_with = "crate::core::trigger::deserialize_trigger_values")]
    pub trigger_values: Vec<f64>,
    pub quantity: i64,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub last_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomOrder {
    pub id: i64,
    pub symbol: String,
    pub company_name: Option<String>,
    pub nifty_rank: Option<i64>,
    pub exchange: String,
    pub order_type: TransactionType,
    pub trigger_type: TriggerType,
    pub trigger_price: Option<f64>,
    pub last_price: Option<f64>,
    pub quantity: i64,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub notes: Option<String>,
    pub tags: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub placed_on_kite: bool,
    pub kite_trigger_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCustomOrder {
    pub symbol: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub nifty_rank: Option<i64>,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    pub order_type: TransactionType,
    #[serde(default = "default_trigger_type")]
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub trigger_price: Option<f64>,
    #[serde(default)]
    pub last_price: Option<f64>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomOrderPatch {
    pub symbol: Option<String>,
    pub company_name: Option<String>,
    pub nifty_rank: Option<i64>,
    pub exchange: Option<String>,
    pub order_type: Option<TransactionType>,
    pub trigger_type: Option<TriggerType>,
    pub trigger_price: Option<f64>,
    pub last_price: Option<f64>,
    pub quantity: Option<i64>,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub notes: Option<String>,
    pub tags: Option<String>,
}

impl CustomOrderPatch {
    pub fn is_empty(&self) -> bool {
        self.symbol.is_none()
            && self.company_name.is_none()
            && self.nifty_rank.is_none()
            && self.exchange.is_none()
            && self.order_type.is_none()
            && self.trigger_type.is_none()
            && self.trigger_price.is_none()
            && self.last_price.is_none()
            && self.quantity.is_none()
            && self.target_price.is_none()
            && self.stop_loss.is_none()
            && self.notes.is_none()
            && self.tags.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KiteStatus {
    Placed,
    NotPlaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub order_type: Option<TransactionType>,
    #[serde(default)]
    pub kite_status: Option<KiteStatus>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            search: None,
            order_type: None,
            kite_status: None,
            page: default_page(),
            per_page: default_per_page(),
            sort_by: None,
            sort_order: SortOrder::default(),
        }
    }
}

pub fn default_page() -> u32 {
    1
}

pub fn default_per_page() -> u32 {
    25
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, total_count: u64, page: u32, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total_count.div_ceil(per_page as u64) as u32;
        Self {
            records,
            total_count,
            page,
            per_page,
            total_pages,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub tradingsymbol: String,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub t1_quantity: i64,
    #[serde(default)]
    pub average_price: f64,
    #[serde(default)]
    pub last_price: f64,
    #[serde(default)]
    pub pnl: f64,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HoldingsSummary {
    pub total_investment: f64,
    pub current_value: f64,
    pub total_pnl: f64,
    pub pnl_percentage: f64,
    pub holdings_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub instrument_token: Option<i64>,
    pub last_price: f64,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFilter {
    pub id: u64,
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub usage_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolReference {
    pub symbol: String,
    pub company_name: Option<String>,
    pub nifty_rank: Option<i64>,
    pub close_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub exchange: String,
    pub company_name: Option<String>,
    pub nifty_rank: Option<i64>,
    pub last_price: Option<f64>,
    pub source: &'static str,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub success: Vec<serde_json::Value>,
    pub failed: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub checked: usize,
    pub reset: Vec<i64>,
    pub conflicts: Vec<serde_json::Value>,
}
