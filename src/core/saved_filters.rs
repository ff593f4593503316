//! Named search queries for the custom-order table, persisted as a JSON file.

use crate::domain::model::SavedFilter;
use crate::domain::ports::Storage;
use crate::utils::error::{GttError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub const SAVED_FILTERS_FILE: &str = "saved_filters.json";

#[derive(Debug, Clone, Deserialize)]
pub struct NewFilter {
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: Vec<String>,
}

pub struct SavedFilterManager<S: Storage> {
    storage: S,
    path: String,
    lock: Mutex<()>,
}

impl<S: Storage> SavedFilterManager<S> {
    pub fn new(storage: S) -> Self {
        Self::with_path(storage, SAVED_FILTERS_FILE)
    }

    pub fn with_path(storage: S, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<SavedFilter>> {
        if !self.storage.exists(&self.path).await {
            return Ok(Vec::new());
        }
        let data = self.storage.read_file(&self.path).await?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&data)?)
    }

    async fn store(&self, filters: &[SavedFilter]) -> Result<()> {
        let data = serde_json::to_vec_pretty(filters)?;
        self.storage.write_file(&self.path, &data).await
    }

    /// Most used first, then most recently used.
    pub async fn list(&self) -> Result<Vec<SavedFilter>> {
        let _guard = self.lock.lock().await;
        let mut filters = self.load().await?;
        sort_by_usage(&mut filters);
        Ok(filters)
    }

    pub async fn get(&self, id: u64) -> Result<SavedFilter> {
        let _guard = self.lock.lock().await;
        self.load()
            .await?
            .into_iter()
            .find(|f| f.id == id)
            .ok_or_else(|| GttError::not_found(format!("Filter {} not found", id)))
    }

    pub async fn save(&self, filter: &NewFilter) -> Result<SavedFilter> {
        let name = filter.name.trim();
        let query = filter.query.trim();
        if name.is_empty() {
            return Err(GttError::validation("Filter name is required"));
        }
        if query.is_empty() {
            return Err(GttError::validation("Filter query is required"));
        }

        let _guard = self.lock.lock().await;
        let mut filters = self.load().await?;
        if filters.iter().any(|f| f.name.eq_ignore_ascii_case(name)) {
            return Err(GttError::conflict(format!(
                "A filter named '{}' already exists",
                name
            )));
        }

        let saved = SavedFilter {
            id: filters.iter().map(|f| f.id).max().unwrap_or(0) + 1,
            name: name.to_string(),
            query: query.to_string(),
            description: filter
                .description
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            created_at: Utc::now(),
            last_used: None,
            usage_count: 0,
        };
        filters.push(saved.clone());
        self.store(&filters).await?;
        tracing::info!("✅ Saved filter '{}' ({})", saved.name, saved.id);
        Ok(saved)
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut filters = self.load().await?;
        let before = filters.len();
        filters.retain(|f| f.id != id);
        if filters.len() == before {
            return Err(GttError::not_found(format!("Filter {} not found", id)));
        }
        self.store(&filters).await
    }

    /// Records a use of the filter and returns it.
    pub async fn use_filter(&self, id: u64) -> Result<SavedFilter> {
        let _guard = self.lock.lock().await;
        let mut filters = self.load().await?;
        let filter = filters
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| GttError::not_found(format!("Filter {} not found", id)))?;
        filter.usage_count += 1;
        filter.last_used = Some(Utc::now());
        let used = filter.clone();
        self.store(&filters).await?;
        Ok(used)
    }

    pub async fn popular(&self, limit: usize) -> Result<Vec<SavedFilter>> {
        let mut filters = self.list().await?;
        filters.retain(|f| f.usage_count > 0);
        filters.truncate(limit);
        Ok(filters)
    }

    pub async fn export(&self) -> Result<Vec<SavedFilter>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Overwrite replaces everything and renumbers from 1. Merge skips names that already exist.
    pub async fn import(
        &self,
        incoming: Vec<SavedFilter>,
        overwrite: bool,
    ) -> Result<ImportSummary> {
        let _guard = self.lock.lock().await;
        let mut filters = if overwrite {
            Vec::new()
        } else {
            self.load().await?
        };
        let mut summary = ImportSummary::default();
        let mut next_id = filters.iter().map(|f| f.id).max().unwrap_or(0) + 1;

        for mut filter in incoming {
            let name = filter.name.trim().to_string();
            if name.is_empty() || filter.query.trim().is_empty() {
                summary.skipped.push(filter.name);
                continue;
            }
            if filters.iter().any(|f| f.name.eq_ignore_ascii_case(&name)) {
                summary.skipped.push(name);
                continue;
            }
            filter.id = next_id;
            filter.name = name;
            next_id += 1;
            filters.push(filter);
            summary.imported += 1;
        }

        self.store(&filters).await?;
        tracing::info!(
            "✅ Imported {} filters ({} skipped)",
            summary.imported,
            summary.skipped.len()
        );
        Ok(summary)
    }
}

fn sort_by_usage(filters: &mut [SavedFilter]) {
    filters.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then_with(|| b.last_used.cmp(&a.last_used))
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
