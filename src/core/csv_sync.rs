//! CSV batch workflow: import GTT rows onto the broker, export live triggers, load reference data.

use crate::adapters::store::OrderStore;
use crate::core::gtt_service::instrument;
use crate::core::holdings::held_quantity;
use crate::core::trigger::{build_gtt, parse_trigger_values};
use crate::domain::model::{
    default_exchange, Gtt, GttDraft, Holding, SymbolReference, TransactionType, TriggerType,
};
use crate::domain::ports::Broker;
use crate::utils::error::{GttError, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

#[derive(Debug, Deserialize)]
struct ImportRow {
    tradingsymbol: String,
    #[serde(default = "default_exchange")]
    exchange: String,
    trigger_type: String,
    trigger_values: String,
    #[serde(default)]
    last_price: Option<f64>,
    transaction_type: String,
    quantity: i64,
    #[serde(default)]
    price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportAction {
    Placed,
    Modified,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub tradingsymbol: String,
    pub action: ImportAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportOutcome {
    fn failed(tradingsymbol: impl Into<String>, error: impl ToString) -> Self {
        Self {
            tradingsymbol: tradingsymbol.into(),
            action: ImportAction::Failed,
            trigger_id: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    tradingsymbol: &'a str,
    exchange: &'a str,
    trigger_type: &'static str,
    trigger_values: String,
    last_price: f64,
    transaction_type: &'static str,
    quantity: i64,
    price: f64,
    status: &'a str,
    gtt_id: i64,
    created_at: &'a str,
    expires_at: &'a str,
}

#[derive(Debug, Deserialize)]
struct SymbolRow {
    #[serde(alias = "tradingsymbol")]
    symbol: String,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    nifty_rank: Option<i64>,
    #[serde(default, alias = "close")]
    close_price: Option<f64>,
}

struct Importer<'a> {
    broker: &'a dyn Broker,
    existing: Vec<Gtt>,
    holdings: Option<Vec<Holding>>,
}

impl Importer<'_> {
    async fn holdings(&mut self) -> Result<&[Holding]> {
        if self.holdings.is_none() {
            self.holdings = Some(self.broker.holdings().await?);
        }
        Ok(self.holdings.as_deref().unwrap_or_default())
    }

    async fn draft(&self, row: &ImportRow) -> Result<GttDraft> {
        let trigger_type = TriggerType::parse(&row.trigger_type).ok_or_else(|| {
            GttError::validation(format!("Unknown trigger type '{}'", row.trigger_type))
        })?;
        let transaction_type = TransactionType::parse(&row.transaction_type).ok_or_else(|| {
            GttError::validation(format!(
                "Unknown transaction type '{}'",
                row.transaction_type
            ))
        })?;
        let last_price = match row.last_price {
            Some(price) if price > 0.0 => price,
            _ => {
                let key = instrument(&row.exchange, &row.tradingsymbol);
                let quotes = self.broker.quote(std::slice::from_ref(&key)).await?;
                quotes
                    .get(&key)
                    .map(|q| q.last_price)
                    .ok_or_else(|| GttError::not_found(format!("No quote found for {}", key)))?
            }
        };

        Ok(GttDraft {
            symbol: row.tradingsymbol.clone(),
            exchange: row.exchange.clone(),
            trigger_type,
            trigger_values: parse_trigger_values(&row.trigger_values)?,
            last_price: Some(last_price),
            transaction_type,
            quantity: row.quantity,
            price: row.price,
        })
    }

    async fn apply(&mut self, row: &ImportRow) -> Result<ImportOutcome> {
        let draft = self.draft(row).await?;
        let request = build_gtt(&draft)?;
        let symbol = request.condition.tradingsymbol.clone();

        let existing_id = self
            .existing
            .iter()
            .find(|gtt| gtt.condition.tradingsymbol.eq_ignore_ascii_case(&symbol))
            .map(|gtt| gtt.id);

        if let Some(existing_id) = existing_id {
            let trigger_id = self.broker.modify_gtt(existing_id, &request).await?;
            return Ok(ImportOutcome {
                tradingsymbol: symbol,
                action: ImportAction::Modified,
                trigger_id: Some(trigger_id),
                error: None,
            });
        }

        if draft.trigger_type == TriggerType::TwoLeg
            && draft.transaction_type == TransactionType::Sell
        {
            let held = held_quantity(self.holdings().await?, &symbol);
            if held < draft.quantity {
                return Err(GttError::validation(format!(
                    "Insufficient holdings for {}: have {}, need {}",
                    symbol, held, draft.quantity
                )));
            }
        }

        let trigger_id = self.broker.place_gtt(&request).await?;
        Ok(ImportOutcome {
            tradingsymbol: symbol,
            action: ImportAction::Placed,
            trigger_id: Some(trigger_id),
            error: None,
        })
    }
}

/// Places or modifies one trigger per CSV row. Row failures are reported, never fatal.
pub async fn import_orders<R: Read>(broker: &dyn Broker, reader: R) -> Result<Vec<ImportOutcome>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let symbol_idx = headers.iter().position(|h| h == "tradingsymbol");

    let mut importer = Importer {
        broker,
        existing: broker.gtts().await?,
        holdings: None,
    };

    let mut outcomes = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                outcomes.push(ImportOutcome::failed(format!("row {}", line + 1), e));
                continue;
            }
        };
        let symbol = symbol_idx
            .and_then(|idx| record.get(idx))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("row {}", line + 1));

        let outcome = match record.deserialize::<ImportRow>(Some(&headers)) {
            Ok(row) => match importer.apply(&row).await {
                Ok(outcome) => outcome,
                Err(e) => ImportOutcome::failed(symbol, e),
            },
            Err(e) => ImportOutcome::failed(symbol, e),
        };

        match outcome.action {
            ImportAction::Failed => tracing::warn!(
                "❌ {}: {}",
                outcome.tradingsymbol,
                outcome.error.as_deref().unwrap_or_default()
            ),
            action => tracing::info!(
                "✅ {} {:?} as trigger {}",
                outcome.tradingsymbol,
                action,
                outcome.trigger_id.unwrap_or_default()
            ),
        }
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

/// One row per order leg.
pub fn write_export<W: Write>(gtts: &[Gtt], writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for gtt in gtts {
        let trigger_values = gtt
            .condition
            .trigger_values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(";");
        for leg in &gtt.orders {
            csv_writer.serialize(ExportRow {
                tradingsymbol: &gtt.condition.tradingsymbol,
                exchange: &gtt.condition.exchange,
                trigger_type: gtt.trigger_type.as_str(),
                trigger_values: trigger_values.clone(),
                last_price: gtt.condition.last_price,
                transaction_type: leg.transaction_type.as_str(),
                quantity: leg.quantity,
                price: leg.price,
                status: &gtt.status,
                gtt_id: gtt.id,
                created_at: gtt.created_at.as_deref().unwrap_or_default(),
                expires_at: gtt.expires_at.as_deref().unwrap_or_default(),
            })?;
            rows += 1;
        }
    }
    csv_writer.flush()?;
    Ok(rows)
}

/// Upserts `symbol,company_name,nifty_rank,close_price` rows into the reference table.
pub async fn load_symbol_reference<R: Read>(store: &OrderStore, reader: R) -> Result<usize> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut loaded = 0;
    for row in csv_reader.deserialize::<SymbolRow>() {
        let row = row?;
        if row.symbol.is_empty() {
            continue;
        }
        store
            .upsert_symbol(&SymbolReference {
                symbol: row.symbol,
                company_name: row.company_name.filter(|s| !s.is_empty()),
                nifty_rank: row.nifty_rank,
                close_price: row.close_price,
            })
            .await?;
        loaded += 1;
    }
    tracing::info!("✅ Loaded {} symbol reference rows", loaded);
    Ok(loaded)
}
