#![allow(dead_code)]

use async_trait::async_trait;
use gtt_desk::domain::model::{
    Gtt, GttCondition, GttLeg, GttRequest, Holding, Profile, Quote, TransactionType, TriggerType,
};
use gtt_desk::domain::ports::Broker;
use gtt_desk::utils::error::{GttError, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory broker that records every placement, modification and deletion.
#[derive(Default)]
pub struct FakeBroker {
    pub gtts: Mutex<Vec<Gtt>>,
    pub quotes: Mutex<HashMap<String, f64>>,
    pub holdings: Mutex<Vec<Holding>>,
    pub placed: Mutex<Vec<GttRequest>>,
    pub modified: Mutex<Vec<(i64, GttRequest)>>,
    pub deleted: Mutex<Vec<i64>>,
    pub fail_listing: Mutex<bool>,
    next_id: Mutex<i64>,
}

impl FakeBroker {
    pub fn new() -> Self {
        let broker = Self::default();
        *broker.next_id.lock().unwrap() = 1000;
        broker
    }

    pub fn with_quote(self, instrument: &str, price: f64) -> Self {
        self.quotes.lock().unwrap().insert(instrument.to_string(), price);
        self
    }

    pub fn with_gtt(self, gtt: Gtt) -> Self {
        self.gtts.lock().unwrap().push(gtt);
        self
    }

    pub fn with_holding(self, symbol: &str, quantity: i64) -> Self {
        self.holdings.lock().unwrap().push(Holding {
            tradingsymbol: symbol.to_string(),
            exchange: "NSE".to_string(),
            quantity,
            t1_quantity: 0,
            average_price: 100.0,
            last_price: 110.0,
            pnl: 10.0 * quantity as f64,
            extra: HashMap::new(),
        });
        self
    }

    pub fn placed_count(&self) -> usize {
        self.placed.lock().unwrap().len()
    }
}

pub fn gtt(id: i64, symbol: &str, tx: TransactionType, status: &str) -> Gtt {
    Gtt {
        id,
        trigger_type: TriggerType::Single,
        status: status.to_string(),
        condition: GttCondition {
            exchange: "NSE".to_string(),
            tradingsymbol: symbol.to_string(),
            trigger_values: vec![100.0],
            last_price: 110.0,
            instrument_token: None,
        },
        orders: vec![GttLeg {
            exchange: "NSE".to_string(),
            tradingsymbol: symbol.to_string(),
            transaction_type: tx,
            quantity: 1,
            price: 100.0,
            order_type: "LIMIT".to_string(),
            product: "CNC".to_string(),
            result: None,
        }],
        created_at: None,
        updated_at: None,
        expires_at: None,
        user_id: None,
    }
}

#[async_trait]
impl Broker for FakeBroker {
    async fn profile(&self) -> Result<Profile> {
        Ok(Profile {
            user_id: "AB1234".to_string(),
            user_name: Some("Test User".to_string()),
            email: None,
            extra: HashMap::new(),
        })
    }

    async fn holdings(&self) -> Result<Vec<Holding>> {
        Ok(self.holdings.lock().unwrap().clone())
    }

    async fn auctions(&self) -> Result<Vec<serde_json::Value>> {
        Ok(Vec::new())
    }

    async fn quote(&self, instruments: &[String]) -> Result<HashMap<String, Quote>> {
        let quotes = self.quotes.lock().unwrap();
        Ok(instruments
            .iter()
            .filter_map(|i| {
                quotes.get(i).map(|price| {
                    (
                        i.clone(),
                        Quote {
                            instrument_token: None,
                            last_price: *price,
                            extra: HashMap::new(),
                        },
                    )
                })
            })
            .collect())
    }

    async fn gtts(&self) -> Result<Vec<Gtt>> {
        if *self.fail_listing.lock().unwrap() {
            return Err(GttError::KiteError {
                status: 503,
                error_type: Some("NetworkException".to_string()),
                message: "listing unavailable".to_string(),
            });
        }
        Ok(self.gtts.lock().unwrap().clone())
    }

    async fn gtt(&self, trigger_id: i64) -> Result<Gtt> {
        self.gtts
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.id == trigger_id)
            .cloned()
            .ok_or_else(|| GttError::KiteError {
                status: 404,
                error_type: Some("GeneralException".to_string()),
                message: format!("Trigger {} not found", trigger_id),
            })
    }

    async fn place_gtt(&self, request: &GttRequest) -> Result<i64> {
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        };
        self.placed.lock().unwrap().push(request.clone());
        self.gtts.lock().unwrap().push(Gtt {
            id,
            trigger_type: request.trigger_type,
            status: "active".to_string(),
            condition: request.condition.clone(),
            orders: request.orders.clone(),
            created_at: None,
            updated_at: None,
            expires_at: None,
            user_id: None,
        });
        Ok(id)
    }

    async fn modify_gtt(&self, trigger_id: i64, request: &GttRequest) -> Result<i64> {
        self.modified
            .lock()
            .unwrap()
            .push((trigger_id, request.clone()));
        Ok(trigger_id)
    }

    async fn delete_gtt(&self, trigger_id: i64) -> Result<i64> {
        self.deleted.lock().unwrap().push(trigger_id);
        self.gtts.lock().unwrap().retain(|g| g.id != trigger_id);
        Ok(trigger_id)
    }
}
