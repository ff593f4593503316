//! Orchestrates shadow orders in the local store against live triggers on the broker.

use crate::adapters::store::{OrderStore, MAX_PER_PAGE};
use crate::core::trigger;
use crate::domain::model::{
    BatchReport, CustomOrder, CustomOrderPatch, Gtt, GttDraft, GttEdit, NewCustomOrder, Page,
    SymbolInfo, SyncReport, TransactionType, TriggerType,
};
use crate::domain::ports::Broker;
use crate::utils::error::{GttError, Result};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Broker statuses after which a trigger will never fire.
const CLOSED_STATUSES: &[&str] = &["deleted", "cancelled", "expired", "rejected", "disabled"];

const FALLBACK_COMPANIES: &[(&str, &str)] = &[
    ("RELIANCE", "Reliance Industries Ltd"),
    ("TCS", "Tata Consultancy Services Ltd"),
    ("HDFCBANK", "HDFC Bank Ltd"),
    ("INFY", "Infosys Ltd"),
    ("ICICIBANK", "ICICI Bank Ltd"),
    ("HINDUNILVR", "Hindustan Unilever Ltd"),
    ("ITC", "ITC Ltd"),
    ("SBIN", "State Bank of India"),
    ("BHARTIARTL", "Bharti Airtel Ltd"),
    ("KOTAKBANK", "Kotak Mahindra Bank Ltd"),
    ("LT", "Larsen & Toubro Ltd"),
    ("AXISBANK", "Axis Bank Ltd"),
    ("ASIANPAINT", "Asian Paints Ltd"),
    ("MARUTI", "Maruti Suzuki India Ltd"),
    ("WIPRO", "Wipro Ltd"),
];

pub fn fallback_company(symbol: &str) -> Option<&'static str> {
    FALLBACK_COMPANIES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(symbol))
        .map(|(_, name)| *name)
}

pub fn instrument(exchange: &str, symbol: &str) -> String {
    format!(
        "{}:{}",
        exchange.trim().to_ascii_uppercase(),
        symbol.trim().to_ascii_uppercase()
    )
}

/// Dashboard listing filter for live broker triggers.
#[derive(Debug, Clone, Deserialize)]
pub struct GttFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, rename = "type")]
    pub trigger_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "crate::domain::model::default_page")]
    pub page: u32,
    #[serde(default = "crate::domain::model::default_per_page")]
    pub per_page: u32,
}

impl Default for GttFilter {
    fn default() -> Self {
        Self {
            search: None,
            trigger_type: None,
            status: None,
            page: crate::domain::model::default_page(),
            per_page: crate::domain::model::default_per_page(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestRequest {
    pub symbol: String,
    #[serde(default = "crate::domain::model::default_exchange")]
    pub exchange: String,
    pub order_type: TransactionType,
    #[serde(default = "default_suggest_trigger_type")]
    pub trigger_type: TriggerType,
    #[serde(default = "default_suggest_quantity")]
    pub quantity: i64,
}

fn default_suggest_trigger_type() -> TriggerType {
    TriggerType::Single
}

fn default_suggest_quantity() -> i64 {
    1
}

pub struct GttService {
    store: Arc<OrderStore>,
    broker: Option<Arc<dyn Broker>>,
}

impl GttService {
    pub fn new(store: Arc<OrderStore>, broker: Option<Arc<dyn Broker>>) -> Self {
        Self { store, broker }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    pub fn has_broker(&self) -> bool {
        self.broker.is_some()
    }

    pub fn broker(&self) -> Result<&dyn Broker> {
        self.broker.as_deref().ok_or(GttError::BrokerUnavailable)
    }

    pub async fn latest_price(&self, exchange: &str, symbol: &str) -> Result<f64> {
        let key = instrument(exchange, symbol);
        let quotes = self.broker()?.quote(std::slice::from_ref(&key)).await?;
        quotes
            .get(&key)
            .map(|quote| quote.last_price)
            .ok_or_else(|| GttError::not_found(format!("No quote found for {}", key)))
    }

    /// Only active triggers conflict. A failed broker listing counts as no conflict.
    pub async fn has_conflict(&self, symbol: &str, tx: TransactionType) -> bool {
        let broker = match self.broker() {
            Ok(broker) => broker,
            Err(_) => return false,
        };
        match broker.gtts().await {
            Ok(gtts) => gtts.iter().any(|gtt| {
                gtt.is_active()
                    && gtt.condition.tradingsymbol.eq_ignore_ascii_case(symbol)
                    && gtt.transaction_type() == Some(tx)
            }),
            Err(e) => {
                tracing::warn!("⚠️ Could not check GTT conflicts for {}: {}", symbol, e);
                false
            }
        }
    }

    pub async fn get_order(&self, id: i64) -> Result<CustomOrder> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| GttError::not_found(format!("Order {} not found", id)))
    }

    pub async fn save_order(&self, order: &NewCustomOrder) -> Result<CustomOrder> {
        trigger::validate_new_order(order)?;
        let id = self.store.insert_order(order).await?;
        tracing::info!("✅ Saved custom order {} for {}", id, order.symbol);
        self.get_order(id).await
    }

    pub async fn update_order(&self, id: i64, patch: &CustomOrderPatch) -> Result<CustomOrder> {
        if patch.is_empty() {
            return Err(GttError::validation("No fields to update"));
        }
        if patch.quantity.is_some_and(|q| q <= 0) {
            return Err(GttError::validation("Quantity must be greater than 0"));
        }
        if !self.store.update_order(id, patch).await? {
            return Err(GttError::not_found(format!("Order {} not found", id)));
        }
        self.get_order(id).await
    }

    pub async fn reset_kite_status(&self, id: i64) -> Result<()> {
        if !self.store.reset_kite_status(id).await? {
            return Err(GttError::not_found(format!("Order {} not found", id)));
        }
        Ok(())
    }

    pub async fn place_custom_order(&self, id: i64) -> Result<i64> {
        let broker = self.broker()?;
        let order = self.get_order(id).await?;
        if order.placed_on_kite {
            return Err(GttError::conflict(format!(
                "Order {} is already placed on Kite with trigger ID {}",
                id,
                order.kite_trigger_id.unwrap_or_default()
            )));
        }
        if self.has_conflict(&order.symbol, order.order_type).await {
            return Err(GttError::conflict(format!(
                "A similar GTT order for {} with {} already exists on Kite",
                order.symbol, order.order_type
            )));
        }

        let last_price = match order.last_price {
            Some(price) if price > 0.0 => price,
            _ => {
                let price = self.latest_price(&order.exchange, &order.symbol).await?;
                let patch = CustomOrderPatch {
                    last_price: Some(price),
                    ..CustomOrderPatch::default()
                };
                self.store.update_order(id, &patch).await?;
                price
            }
        };

        let request = trigger::build_gtt(&trigger::draft_from_custom(&order, last_price)?)?;
        let trigger_id = broker.place_gtt(&request).await?;
        self.store.mark_placed(id, trigger_id).await?;
        tracing::info!(
            "✅ Custom order {} ({}) placed on Kite as trigger {}",
            id,
            order.symbol,
            trigger_id
        );
        Ok(trigger_id)
    }

    pub async fn place_many(&self, ids: &[i64]) -> Result<BatchReport> {
        if ids.is_empty() {
            return Err(GttError::validation("No order IDs provided"));
        }
        self.broker()?;

        let mut report = BatchReport::default();
        for id in ids {
            match self.place_custom_order(*id).await {
                Ok(trigger_id) => report
                    .success
                    .push(json!({ "order_id": id, "trigger_id": trigger_id })),
                Err(e) => {
                    tracing::warn!("❌ Failed to place order {}: {}", id, e);
                    report
                        .failed
                        .push(json!({ "order_id": id, "error": e.to_string() }));
                }
            }
        }
        Ok(report)
    }

    pub async fn delete_many(&self, ids: &[i64]) -> Result<BatchReport> {
        if ids.is_empty() {
            return Err(GttError::validation("No order IDs provided"));
        }
        let mut report = BatchReport::default();
        for id in ids {
            match self.store.soft_delete(*id).await {
                Ok(true) => report.success.push(json!({ "order_id": id })),
                Ok(false) => report
                    .failed
                    .push(json!({ "order_id": id, "error": format!("Order {} not found", id) })),
                Err(e) => report
                    .failed
                    .push(json!({ "order_id": id, "error": e.to_string() })),
            }
        }
        Ok(report)
    }

    pub async fn sync_with_broker(&self) -> Result<SyncReport> {
        let gtts = self.broker()?.gtts().await?;
        let by_id: HashMap<i64, &Gtt> = gtts.iter().map(|gtt| (gtt.id, gtt)).collect();

        let placed = self.store.placed_orders().await?;
        let pending = self.store.orders_not_on_kite().await?;
        let mut report = SyncReport {
            checked: placed.len() + pending.len(),
            ..SyncReport::default()
        };

        for order in &placed {
            let closed = match order.kite_trigger_id.and_then(|tid| by_id.get(&tid)) {
                Some(gtt) => CLOSED_STATUSES
                    .iter()
                    .any(|status| gtt.status.eq_ignore_ascii_case(status)),
                None => true,
            };
            if closed && self.store.reset_kite_status(order.id).await? {
                tracing::info!(
                    "🔄 Reset order {} ({}): trigger {:?} no longer live",
                    order.id,
                    order.symbol,
                    order.kite_trigger_id
                );
                report.reset.push(order.id);
            }
        }

        for order in &pending {
            if let Some(gtt) = gtts.iter().find(|gtt| {
                gtt.is_active()
                    && gtt.condition.tradingsymbol.eq_ignore_ascii_case(&order.symbol)
                    && gtt.transaction_type() == Some(order.order_type)
            }) {
                report.conflicts.push(json!({
                    "order_id": order.id,
                    "symbol": order.symbol,
                    "order_type": order.order_type,
                    "trigger_id": gtt.id,
                }));
            }
        }

        tracing::info!(
            "✅ Sync checked {} orders: {} reset, {} conflicts",
            report.checked,
            report.reset.len(),
            report.conflicts.len()
        );
        Ok(report)
    }

    /// Deletes a live trigger and clears any shadow row pointing at it.
    pub async fn delete_broker_gtt(&self, trigger_id: i64) -> Result<u64> {
        let deleted = self.broker()?.delete_gtt(trigger_id).await?;
        let reset = self.store.reset_by_trigger_id(deleted).await?;
        if reset > 0 {
            tracing::info!("🔄 Reset {} custom orders linked to trigger {}", reset, deleted);
        }
        Ok(reset)
    }

    pub async fn create_gtt(&self, draft: &GttDraft) -> Result<i64> {
        let broker = self.broker()?;
        let mut draft = draft.clone();
        if draft.last_price.is_none() {
            draft.last_price = Some(self.latest_price(&draft.exchange, &draft.symbol).await?);
        }
        let request = trigger::build_gtt(&draft)?;
        broker.place_gtt(&request).await
    }

    pub async fn modify_gtt(&self, trigger_id: i64, edit: &GttEdit) -> Result<i64> {
        let broker = self.broker()?;
        let existing = broker.gtt(trigger_id).await?;
        let last_price = match edit.last_price {
            Some(price) => price,
            None => {
                self.latest_price(
                    &existing.condition.exchange,
                    &existing.condition.tradingsymbol,
                )
                .await?
            }
        };
        let request = trigger::rebuild_gtt(
            &existing,
            &edit.trigger_values,
            edit.quantity,
            edit.price,
            last_price,
        )?;
        broker.modify_gtt(trigger_id, &request).await
    }

    pub async fn place_bulk(&self, drafts: &[GttDraft]) -> Result<BatchReport> {
        if drafts.is_empty() {
            return Err(GttError::validation("No orders provided"));
        }
        self.broker()?;

        let mut report = BatchReport::default();
        for draft in drafts {
            match self.create_gtt(draft).await {
                Ok(trigger_id) => report
                    .success
                    .push(json!({ "symbol": draft.symbol, "trigger_id": trigger_id })),
                Err(e) => {
                    tracing::warn!("❌ Bulk GTT for {} failed: {}", draft.symbol, e);
                    report
                        .failed
                        .push(json!({ "symbol": draft.symbol, "error": e.to_string() }));
                }
            }
        }
        Ok(report)
    }

    pub async fn filtered_gtts(&self, filter: &GttFilter) -> Result<Page<Gtt>> {
        let gtts = self.broker()?.gtts().await?;
        Ok(filter_gtts(gtts, filter))
    }

    pub async fn suggest_order(&self, request: &SuggestRequest) -> Result<CustomOrder> {
        let symbol = request.symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(GttError::validation("Symbol is required"));
        }
        if let Some(existing) = self.store.find_pending(&symbol, request.order_type).await? {
            tracing::debug!("🔍 Reusing pending order {} for {}", existing.id, symbol);
            return Ok(existing);
        }

        let reference = self.store.symbol_reference(&symbol).await?;
        let close = match reference.as_ref().and_then(|r| r.close_price) {
            Some(close) => close,
            None => self.latest_price(&request.exchange, &symbol).await?,
        };
        let levels = trigger::suggested_levels(request.order_type, request.trigger_type, close);

        let order = NewCustomOrder {
            symbol: symbol.clone(),
            company_name: reference
                .as_ref()
                .and_then(|r| r.company_name.clone())
                .or_else(|| fallback_company(&symbol).map(str::to_string)),
            nifty_rank: reference.as_ref().and_then(|r| r.nifty_rank),
            exchange: request.exchange.clone(),
            order_type: request.order_type,
            trigger_type: levels.trigger_type,
            trigger_price: levels.trigger_price,
            last_price: Some(close),
            quantity: request.quantity,
            target_price: levels.target_price,
            stop_loss: levels.stop_loss,
            notes: None,
            tags: None,
        };
        self.save_order(&order).await
    }

    pub async fn symbol_info(&self, symbol: &str, exchange: &str) -> Result<SymbolInfo> {
        let symbol = symbol.trim().to_ascii_uppercase();
        if let Some(reference) = self.store.symbol_reference(&symbol).await? {
            return Ok(SymbolInfo {
                symbol,
                exchange: exchange.to_ascii_uppercase(),
                company_name: reference.company_name,
                nifty_rank: reference.nifty_rank,
                last_price: reference.close_price,
                source: "reference",
            });
        }

        let company_name = fallback_company(&symbol).map(str::to_string);
        let last_price = match self.latest_price(exchange, &symbol).await {
            Ok(price) => Some(price),
            Err(e) => {
                tracing::debug!("🔍 No quote for {}: {}", symbol, e);
                None
            }
        };
        if company_name.is_none() && last_price.is_none() {
            return Err(GttError::not_found(format!("Symbol {} not found", symbol)));
        }
        Ok(SymbolInfo {
            symbol,
            exchange: exchange.to_ascii_uppercase(),
            company_name,
            nifty_rank: None,
            last_price,
            source: if last_price.is_some() { "quote" } else { "fallback" },
        })
    }
}

pub fn filter_gtts(gtts: Vec<Gtt>, filter: &GttFilter) -> Page<Gtt> {
    let search = filter
        .search
        .as_deref()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty());
    let type_filter = filter.trigger_type.as_deref().filter(|s| !s.is_empty());
    let status_filter = filter.status.as_deref().filter(|s| !s.is_empty());

    let matching: Vec<Gtt> = gtts
        .into_iter()
        .filter(|gtt| match &search {
            Some(needle) => [
                gtt.condition.tradingsymbol.as_str(),
                gtt.condition.exchange.as_str(),
                gtt.trigger_type.as_str(),
                gtt.status.as_str(),
            ]
            .iter()
            .any(|field| field.to_uppercase().contains(needle.as_str())),
            None => true,
        })
        .filter(|gtt| {
            type_filter.map_or(true, |t| gtt.trigger_type.as_str().eq_ignore_ascii_case(t))
        })
        .filter(|gtt| status_filter.map_or(true, |s| gtt.status.eq_ignore_ascii_case(s)))
        .collect();

    let total = matching.len() as u64;
    let page = filter.page.max(1);
    let per_page = filter.per_page.clamp(1, MAX_PER_PAGE);
    let offset = (page as usize - 1).saturating_mul(per_page as usize);
    let records: Vec<Gtt> = matching
        .into_iter()
        .skip(offset)
        .take(per_page as usize)
        .collect();

    let result = Page::new(records, total, page, per_page);
    if total == 0 {
        result.with_message("No GTT orders found")
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gtt(id: i64, symbol: &str, trigger_type: TriggerType, status: &str) -> Gtt {
        serde_json::from_value(json!({
            "id": id,
            "type": trigger_type.as_str(),
            "status": status,
            "condition": {
                "exchange": "NSE",
                "tradingsymbol": symbol,
                "trigger_values": [100.0],
                "last_price": 110.0
            },
            "orders": [{
                "exchange": "NSE",
                "tradingsymbol": symbol,
                "transaction_type": "BUY",
                "quantity": 1,
                "price": 100.0,
                "order_type": "LIMIT",
                "product": "CNC"
            }]
        }))
        .unwrap()
    }

    #[test]
    fn filter_matches_search_type_and_status() {
        let gtts = vec![
            gtt(1, "INFY", TriggerType::Single, "active"),
            gtt(2, "INFRATEL", TriggerType::TwoLeg, "active"),
            gtt(3, "TCS", TriggerType::Single, "triggered"),
        ];

        let filter = GttFilter {
            search: Some("inf".to_string()),
            ..GttFilter::default()
        };
        assert_eq!(filter_gtts(gtts.clone(), &filter).total_count, 2);

        let filter = GttFilter {
            search: Some("inf".to_string()),
            trigger_type: Some("TWO-LEG".to_string()),
            ..GttFilter::default()
        };
        let page = filter_gtts(gtts.clone(), &filter);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id, 2);

        let filter = GttFilter {
            search: Some("TRIGGERED".to_string()),
            ..GttFilter::default()
        };
        assert_eq!(filter_gtts(gtts.clone(), &filter).records[0].id, 3);

        let filter = GttFilter {
            status: Some("cancelled".to_string()),
            ..GttFilter::default()
        };
        let empty = filter_gtts(gtts, &filter);
        assert!(empty.records.is_empty());
        assert_eq!(empty.message.as_deref(), Some("No GTT orders found"));
    }

    #[test]
    fn filter_paginates() {
        let gtts = (1..=7)
            .map(|id| gtt(id, "SBIN", TriggerType::Single, "active"))
            .collect();
        let filter = GttFilter {
            page: 2,
            per_page: 3,
            ..GttFilter::default()
        };
        let page = filter_gtts(gtts, &filter);
        assert_eq!(page.total_pages, 3);
        let ids: Vec<i64> = page.records.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![4, 5, 6]);
    }

    #[test]
    fn filter_clamps_huge_pages() {
        let gtts: Vec<Gtt> = (1..=3)
            .map(|id| gtt(id, "SBIN", TriggerType::Single, "active"))
            .collect();
        let filter = GttFilter {
            page: u32::MAX,
            per_page: u32::MAX,
            ..GttFilter::default()
        };
        let page = filter_gtts(gtts.clone(), &filter);
        assert!(page.records.is_empty());
        assert_eq!(page.total_count, 3);
        assert_eq!(page.per_page, MAX_PER_PAGE);

        let filter = GttFilter {
            page: 100_000,
            per_page: 100_000,
            ..GttFilter::default()
        };
        assert!(filter_gtts(gtts.clone(), &filter).records.is_empty());

        let filter = GttFilter {
            page: 0,
            per_page: 0,
            ..GttFilter::default()
        };
        let first = filter_gtts(gtts, &filter);
        assert_eq!(first.records.len(), 1);
        assert_eq!(first.records[0].id, 1);
    }

    #[test]
    fn fallback_company_is_case_insensitive() {
        assert_eq!(fallback_company("infy"), Some("Infosys Ltd"));
        assert_eq!(fallback_company("NOPE"), None);
        assert_eq!(instrument("nse", " tcs "), "NSE:TCS");
    }
}
