//! In-memory storage, used by tests and for embedding the engine.

use std::collections::HashMap;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::models::{Category, Entry, MonthlyCap, MonthlyCapChange, ReportSettings};

use super::{
    month_expense_total, CapReader, CategorySource, EntryFilter, EntrySource, SettingsReader,
};

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<Vec<Entry>>,
    categories: Mutex<HashMap<i64, Category>>,
    caps: Mutex<HashMap<String, MonthlyCap>>,
    cap_changes: Mutex<Vec<MonthlyCapChange>>,
    settings: Mutex<Option<ReportSettings>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_entries(&self, entries: impl IntoIterator<Item = Entry>) {
        self.entries.lock().await.extend(entries);
    }

    pub async fn save_category(&self, category: Category) {
        self.categories.lock().await.insert(category.id, category);
    }

    /// Set the active cap for its month, replacing any previous one.
    pub async fn set_cap(&self, cap: MonthlyCap) {
        self.caps.lock().await.insert(cap.month_key.clone(), cap);
    }

    pub async fn record_cap_change(&self, change: MonthlyCapChange) {
        self.cap_changes.lock().await.push(change);
    }

    pub async fn save_settings(&self, settings: ReportSettings) {
        *self.settings.lock().await = Some(settings);
    }
}

#[async_trait::async_trait]
impl EntrySource for MemoryStorage {
    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().filter(|e| filter.matches(e)).cloned().collect())
    }
}

#[async_trait::async_trait]
impl CategorySource for MemoryStorage {
    async fn list_categories_by_ids(&self, ids: &[i64]) -> Result<Vec<Category>> {
        let categories = self.categories.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| categories.get(id).cloned())
            .collect())
    }
}

#[async_trait::async_trait]
impl CapReader for MemoryStorage {
    async fn show_cap(&self, month_key: &str) -> Result<Option<MonthlyCap>> {
        let caps = self.caps.lock().await;
        Ok(caps.get(month_key).cloned())
    }

    async fn cap_history(&self, month_key: &str) -> Result<Vec<MonthlyCapChange>> {
        let changes = self.cap_changes.lock().await;
        Ok(changes
            .iter()
            .filter(|c| c.month_key == month_key)
            .cloned()
            .collect())
    }

    async fn expense_total(&self, month_key: &str, currency_code: &str) -> Result<i64> {
        let entries = self.entries.lock().await;
        month_expense_total(&entries, month_key, currency_code)
    }
}

#[async_trait::async_trait]
impl SettingsReader for MemoryStorage {
    async fn report_settings(&self) -> Result<Option<ReportSettings>> {
        Ok(*self.settings.lock().await)
    }
}
