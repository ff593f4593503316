use crate::adapters::storage::LocalStorage;
use crate::adapters::store::OrderStore;
use crate::core::gtt_service::GttService;
use crate::core::saved_filters::SavedFilterManager;
use crate::domain::ports::Broker;
use crate::utils::monitor::SystemMonitor;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct AppState {
    pub service: GttService,
    pub filters: SavedFilterManager<LocalStorage>,
    pub monitor: SystemMonitor,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        store: Arc<OrderStore>,
        broker: Option<Arc<dyn Broker>>,
        storage: LocalStorage,
    ) -> SharedState {
        Arc::new(Self {
            service: GttService::new(store, broker),
            filters: SavedFilterManager::new(storage),
            monitor: SystemMonitor::new(),
            started_at: Utc::now(),
        })
    }
}
