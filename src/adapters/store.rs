//! libSQL store for shadow (custom) GTT orders and symbol reference data.

use crate::domain::model::{
    CustomOrder, CustomOrderPatch, KiteStatus, NewCustomOrder, OrderQuery, Page, SymbolReference,
    TransactionType,
};
use crate::utils::error::{GttError, Result};
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database, Value};
use serde::Serialize;

const MIGRATION_001: &str = include_str!("../../migrations/001_custom_gtt.sql");

const ORDER_COLUMNS: &str = "id, symbol, company_name, nifty_rank, exchange, order_type, \
     trigger_type, trigger_price, last_price, quantity, target_price, stop_loss, notes, tags, \
     created_at, updated_at, is_active, placed_on_kite, kite_trigger_id";

const SORTABLE_COLUMNS: &[&str] = &[
    "id",
    "symbol",
    "company_name",
    "nifty_rank",
    "order_type",
    "trigger_price",
    "last_price",
    "quantity",
    "target_price",
    "stop_loss",
    "created_at",
    "updated_at",
];

/// Upper bound on `per_page` for every paged listing.
pub const MAX_PER_PAGE: u32 = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrderCounts {
    pub active: u64,
    pub placed: u64,
    pub pending: u64,
}

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| GttError::StoreError {
            message: format!("Failed to parse datetime '{s}': {e}"),
        })
}

fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T> {
    Ok(serde_json::from_value(serde_json::Value::String(
        s.to_string(),
    ))?)
}

/// `None` for both SQL NULL and empty strings.
fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.to_string()))
}

fn opt_real(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::Real)
}

fn opt_integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn row_to_order(row: &libsql::Row) -> Result<CustomOrder> {
    let updated_at = get_opt_string(row, 15)?;
    Ok(CustomOrder {
        id: row.get::<i64>(0)?,
        symbol: row.get::<String>(1)?,
        company_name: get_opt_string(row, 2)?,
        nifty_rank: row.get::<Option<i64>>(3)?,
        exchange: row.get::<String>(4)?,
        order_type: parse_enum(&row.get::<String>(5)?)?,
        trigger_type: parse_enum(&row.get::<String>(6)?)?,
        trigger_price: row.get::<Option<f64>>(7)?,
        last_price: row.get::<Option<f64>>(8)?,
        quantity: row.get::<i64>(9)?,
        target_price: row.get::<Option<f64>>(10)?,
        stop_loss: row.get::<Option<f64>>(11)?,
        notes: get_opt_string(row, 12)?,
        tags: get_opt_string(row, 13)?,
        created_at: parse_datetime(&row.get::<String>(14)?)?,
        updated_at: updated_at.as_deref().map(parse_datetime).transpose()?,
        is_active: row.get::<i64>(16)? != 0,
        placed_on_kite: row.get::<i64>(17)? != 0,
        kite_trigger_id: row.get::<Option<i64>>(18)?,
    })
}

fn row_to_reference(row: &libsql::Row) -> Result<SymbolReference> {
    Ok(SymbolReference {
        symbol: row.get::<String>(0)?,
        company_name: get_opt_string(row, 1)?,
        nifty_rank: row.get::<Option<i64>>(2)?,
        close_price: row.get::<Option<f64>>(3)?,
    })
}

pub struct OrderStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl OrderStore {
    /// Opens (or creates) the database at `path` and runs migrations. `:memory:` works for tests.
    pub async fn open(path: &str) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        conn.execute_batch(MIGRATION_001)
            .await
            .map_err(|e| GttError::StoreError {
                message: format!("001_custom_gtt migration failed: {e}"),
            })?;
        tracing::debug!("🗄️ Order store ready at {}", path);
        Ok(Self { db, conn })
    }

    pub async fn insert_order(&self, order: &NewCustomOrder) -> Result<i64> {
        let mut rows = self
            .conn
            .query(
                "INSERT INTO custom_gtt_orders (symbol, company_name, nifty_rank, exchange, \
                 order_type, trigger_type, trigger_price, last_price, quantity, target_price, \
                 stop_loss, notes, tags, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, datetime('now')) \
                 RETURNING id",
                libsql::params_from_iter(vec![
                    Value::Text(order.symbol.trim().to_ascii_uppercase()),
                    opt_text(order.company_name.as_deref()),
                    opt_integer(order.nifty_rank),
                    Value::Text(order.exchange.trim().to_ascii_uppercase()),
                    Value::Text(order.order_type.as_str().to_string()),
                    Value::Text(order.trigger_type.as_str().to_string()),
                    opt_real(order.trigger_price),
                    opt_real(order.last_price),
                    Value::Integer(order.quantity),
                    opt_real(order.target_price),
                    opt_real(order.stop_loss),
                    opt_text(order.notes.as_deref()),
                    opt_text(order.tags.as_deref()),
                ]),
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| GttError::StoreError {
            message: "Insert returned no id".to_string(),
        })?;
        Ok(row.get::<i64>(0)?)
    }

    /// Active rows only.
    pub async fn get_order(&self, id: i64) -> Result<Option<CustomOrder>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM custom_gtt_orders WHERE id = ?1 AND is_active = 1"
        );
        let mut rows = self.conn.query(&sql, [id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_order(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_orders(&self, query: &OrderQuery) -> Result<Page<CustomOrder>> {
        let mut clauses = vec!["is_active = 1".to_string()];
        let mut params: Vec<Value> = Vec::new();

        if let Some(order_type) = query.order_type {
            clauses.push("order_type = ?".to_string());
            params.push(Value::Text(order_type.as_str().to_string()));
        }
        match query.kite_status {
            Some(KiteStatus::Placed) => clauses.push("placed_on_kite = 1".to_string()),
            Some(KiteStatus::NotPlaced) => clauses.push("placed_on_kite = 0".to_string()),
            None => {}
        }
        if let Some(search) = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            clauses.push(
                "(UPPER(symbol) LIKE ? OR UPPER(COALESCE(company_name, '')) LIKE ? \
                 OR UPPER(COALESCE(notes, '')) LIKE ? OR UPPER(COALESCE(tags, '')) LIKE ?)"
                    .to_string(),
            );
            let pattern = format!("%{}%", search.to_uppercase());
            for _ in 0..4 {
                params.push(Value::Text(pattern.clone()));
            }
        }
        let where_sql = clauses.join(" AND ");

        let count_sql = format!("SELECT COUNT(*) FROM custom_gtt_orders WHERE {where_sql}");
        let mut rows = self.conn.query(&count_sql, libsql::params_from_iter(params.clone())).await?;
        let total_count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?.max(0) as u64,
            None => 0,
        };

        let sort_column = query
            .sort_by
            .as_deref()
            .filter(|col| SORTABLE_COLUMNS.contains(col))
            .unwrap_or("id");
        let page = query.page.max(1);
        let per_page = query.per_page.clamp(1, MAX_PER_PAGE);
        let offset = (page as i64 - 1) * per_page as i64;

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM custom_gtt_orders WHERE {where_sql} \
             ORDER BY {sort_column} {}, id DESC LIMIT ? OFFSET ?",
            query.sort_order.as_sql()
        );
        params.push(Value::Integer(per_page as i64));
        params.push(Value::Integer(offset));

        let mut rows = self.conn.query(&sql, libsql::params_from_iter(params)).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_order(&row)?);
        }

        Ok(Page::new(records, total_count, page, per_page))
    }

    /// Returns false when the row is missing or the patch is empty.
    pub async fn update_order(&self, id: i64, patch: &CustomOrderPatch) -> Result<bool> {
        if patch.is_empty() {
            return Ok(false);
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(symbol) = &patch.symbol {
            sets.push("symbol = ?");
            params.push(Value::Text(symbol.trim().to_ascii_uppercase()));
        }
        if let Some(company_name) = &patch.company_name {
            sets.push("company_name = ?");
            params.push(Value::Text(company_name.clone()));
        }
        if let Some(rank) = patch.nifty_rank {
            sets.push("nifty_rank = ?");
            params.push(Value::Integer(rank));
        }
        if let Some(exchange) = &patch.exchange {
            sets.push("exchange = ?");
            params.push(Value::Text(exchange.trim().to_ascii_uppercase()));
        }
        if let Some(order_type) = patch.order_type {
            sets.push("order_type = ?");
            params.push(Value::Text(order_type.as_str().to_string()));
        }
        if let Some(trigger_type) = patch.trigger_type {
            sets.push("trigger_type = ?");
            params.push(Value::Text(trigger_type.as_str().to_string()));
        }
        if let Some(price) = patch.trigger_price {
            sets.push("trigger_price = ?");
            params.push(Value::Real(price));
        }
        if let Some(price) = patch.last_price {
            sets.push("last_price = ?");
            params.push(Value::Real(price));
        }
        if let Some(quantity) = patch.quantity {
            sets.push("quantity = ?");
            params.push(Value::Integer(quantity));
        }
        if let Some(price) = patch.target_price {
            sets.push("target_price = ?");
            params.push(Value::Real(price));
        }
        if let Some(price) = patch.stop_loss {
            sets.push("stop_loss = ?");
            params.push(Value::Real(price));
        }
        if let Some(notes) = &patch.notes {
            sets.push("notes = ?");
            params.push(Value::Text(notes.clone()));
        }
        if let Some(tags) = &patch.tags {
            sets.push("tags = ?");
            params.push(Value::Text(tags.clone()));
        }
        sets.push("updated_at = datetime('now')");
        params.push(Value::Integer(id));

        let sql = format!(
            "UPDATE custom_gtt_orders SET {} WHERE id = ? AND is_active = 1",
            sets.join(", ")
        );
        let changed = self.conn.execute(&sql, libsql::params_from_iter(params)).await?;
        Ok(changed > 0)
    }

    pub async fn soft_delete(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE custom_gtt_orders SET is_active = 0, updated_at = datetime('now') \
                 WHERE id = ?1 AND is_active = 1",
                [id],
            )
            .await?;
        Ok(changed > 0)
    }

    pub async fn mark_placed(&self, id: i64, trigger_id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE custom_gtt_orders SET placed_on_kite = 1, kite_trigger_id = ?1, \
                 updated_at = datetime('now') WHERE id = ?2 AND is_active = 1",
                [trigger_id, id],
            )
            .await?;
        Ok(changed > 0)
    }

    pub async fn reset_kite_status(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE custom_gtt_orders SET placed_on_kite = 0, kite_trigger_id = NULL, \
                 updated_at = datetime('now') WHERE id = ?1 AND is_active = 1",
                [id],
            )
            .await?;
        Ok(changed > 0)
    }

    /// Resets every active row that points at `trigger_id`; returns how many changed.
    pub async fn reset_by_trigger_id(&self, trigger_id: i64) -> Result<u64> {
        let changed = self
            .conn
            .execute(
                "UPDATE custom_gtt_orders SET placed_on_kite = 0, kite_trigger_id = NULL, \
                 updated_at = datetime('now') WHERE kite_trigger_id = ?1 AND is_active = 1",
                [trigger_id],
            )
            .await?;
        Ok(changed)
    }

    async fn collect(&self, sql: &str, params: Vec<Value>) -> Result<Vec<CustomOrder>> {
        let mut rows = self.conn.query(sql, libsql::params_from_iter(params)).await?;
        let mut orders = Vec::new();
        while let Some(row) = rows.next().await? {
            orders.push(row_to_order(&row)?);
        }
        Ok(orders)
    }

    pub async fn orders_not_on_kite(&self) -> Result<Vec<CustomOrder>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM custom_gtt_orders \
             WHERE is_active = 1 AND placed_on_kite = 0 ORDER BY symbol, id"
        );
        self.collect(&sql, Vec::new()).await
    }

    pub async fn placed_orders(&self) -> Result<Vec<CustomOrder>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM custom_gtt_orders \
             WHERE is_active = 1 AND placed_on_kite = 1 ORDER BY symbol, id"
        );
        self.collect(&sql, Vec::new()).await
    }

    /// Most recent unplaced row for `symbol` and side, if any.
    pub async fn find_pending(
        &self,
        symbol: &str,
        order_type: TransactionType,
    ) -> Result<Option<CustomOrder>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM custom_gtt_orders \
             WHERE is_active = 1 AND placed_on_kite = 0 AND symbol = ?1 AND order_type = ?2 \
             ORDER BY id DESC LIMIT 1"
        );
        let orders = self
            .collect(
                &sql,
                vec![
                    Value::Text(symbol.trim().to_ascii_uppercase()),
                    Value::Text(order_type.as_str().to_string()),
                ],
            )
            .await?;
        Ok(orders.into_iter().next())
    }

    pub async fn counts(&self) -> Result<OrderCounts> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*), COALESCE(SUM(placed_on_kite), 0) \
                 FROM custom_gtt_orders WHERE is_active = 1",
                (),
            )
            .await?;
        let Some(row) = rows.next().await? else {
            return Ok(OrderCounts::default());
        };
        let active = row.get::<i64>(0)?.max(0) as u64;
        let placed = row.get::<i64>(1)?.max(0) as u64;
        Ok(OrderCounts {
            active,
            placed,
            pending: active.saturating_sub(placed),
        })
    }

    pub async fn upsert_symbol(&self, reference: &SymbolReference) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO symbol_reference \
                 (symbol, company_name, nifty_rank, close_price, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, datetime('now')) \
                 ON CONFLICT(symbol) DO UPDATE SET \
                   company_name = COALESCE(?2, company_name), \
                   nifty_rank = COALESCE(?3, nifty_rank), \
                   close_price = COALESCE(?4, close_price), \
                   updated_at = datetime('now')",
                libsql::params_from_iter(vec![
                    Value::Text(reference.symbol.trim().to_ascii_uppercase()),
                    opt_text(reference.company_name.as_deref()),
                    opt_integer(reference.nifty_rank),
                    opt_real(reference.close_price),
                ]),
            )
            .await?;
        Ok(())
    }

    pub async fn symbol_reference(&self, symbol: &str) -> Result<Option<SymbolReference>> {
        let mut rows = self
            .conn
            .query(
                "SELECT symbol, company_name, nifty_rank, close_price \
                 FROM symbol_reference WHERE symbol = ?1",
                [symbol.trim().to_ascii_uppercase()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_reference(&row)?)),
            None => Ok(None),
        }
    }
}
