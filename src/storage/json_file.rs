use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::models::{Category, Entry, MonthlyCap, MonthlyCapChange, ReportSettings};

use super::{
    month_expense_total, CapReader, CategorySource, EntryFilter, EntrySource, SettingsReader,
};

/// JSON file-based storage.
///
/// Directory structure:
/// ```text
/// data/
///   entries.jsonl
///   categories.json
///   caps.json
///   cap_changes.jsonl
///   settings.json
/// ```
pub struct JsonFileStorage {
    base_path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn entries_file(&self) -> PathBuf {
        self.base_path.join("entries.jsonl")
    }

    fn categories_file(&self) -> PathBuf {
        self.base_path.join("categories.json")
    }

    fn caps_file(&self) -> PathBuf {
        self.base_path.join("caps.json")
    }

    fn cap_changes_file(&self) -> PathBuf {
        self.base_path.join("cap_changes.jsonl")
    }

    fn settings_file(&self) -> PathBuf {
        self.base_path.join("settings.json")
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        Ok(())
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context("Failed to read file"),
        }
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        self.ensure_dir(path).await?;
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        fs::write(path, content)
            .await
            .context("Failed to write file")?;
        Ok(())
    }

    async fn read_jsonl<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Vec<T>> {
        let file = match fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to open file"),
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut items = Vec::new();

        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            if line.trim().is_empty() {
                continue;
            }
            let item: T = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse JSONL line: {}", line))?;
            items.push(item);
        }

        Ok(items)
    }

    async fn append_jsonl<T: serde::Serialize>(&self, path: &Path, items: &[T]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        self.ensure_dir(path).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context("Failed to open file for append")?;

        for item in items {
            let line = serde_json::to_string(item).context("Failed to serialize item")?;
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
        }
        file.flush().await?;

        Ok(())
    }

    async fn load_entries(&self) -> Result<Vec<Entry>> {
        self.read_jsonl(&self.entries_file()).await
    }

    pub async fn append_entries(&self, entries: &[Entry]) -> Result<()> {
        self.append_jsonl(&self.entries_file(), entries).await
    }

    pub async fn save_categories(&self, categories: &[Category]) -> Result<()> {
        self.write_json(&self.categories_file(), &categories).await
    }

    /// Replace the active cap of `cap.month_key`.
    pub async fn save_cap(&self, cap: &MonthlyCap) -> Result<()> {
        let path = self.caps_file();
        let mut caps: Vec<MonthlyCap> = self.read_json(&path).await?.unwrap_or_default();
        caps.retain(|c| c.month_key != cap.month_key);
        caps.push(cap.clone());
        caps.sort_by(|a, b| a.month_key.cmp(&b.month_key));
        self.write_json(&path, &caps).await
    }

    pub async fn append_cap_changes(&self, changes: &[MonthlyCapChange]) -> Result<()> {
        self.append_jsonl(&self.cap_changes_file(), changes).await
    }

    pub async fn save_settings(&self, settings: &ReportSettings) -> Result<()> {
        self.write_json(&self.settings_file(), settings).await
    }
}

#[async_trait::async_trait]
impl EntrySource for JsonFileStorage {
    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        let entries = self.load_entries().await?;
        let total = entries.len();
        let matched: Vec<Entry> = entries.into_iter().filter(|e| filter.matches(e)).collect();
        debug!(total, matched = matched.len(), "listed entries from disk");
        Ok(matched)
    }
}

#[async_trait::async_trait]
impl CategorySource for JsonFileStorage {
    async fn list_categories_by_ids(&self, ids: &[i64]) -> Result<Vec<Category>> {
        let categories: Vec<Category> = self
            .read_json(&self.categories_file())
            .await?
            .unwrap_or_default();
        Ok(categories
            .into_iter()
            .filter(|c| ids.contains(&c.id))
            .collect())
    }
}

#[async_trait::async_trait]
impl CapReader for JsonFileStorage {
    async fn show_cap(&self, month_key: &str) -> Result<Option<MonthlyCap>> {
        let caps: Vec<MonthlyCap> = self.read_json(&self.caps_file()).await?.unwrap_or_default();
        Ok(caps.into_iter().find(|c| c.month_key == month_key))
    }

    async fn cap_history(&self, month_key: &str) -> Result<Vec<MonthlyCapChange>> {
        let changes: Vec<MonthlyCapChange> = self.read_jsonl(&self.cap_changes_file()).await?;
        Ok(changes
            .into_iter()
            .filter(|c| c.month_key == month_key)
            .collect())
    }

    async fn expense_total(&self, month_key: &str, currency_code: &str) -> Result<i64> {
        let entries = self.load_entries().await?;
        month_expense_total(&entries, month_key, currency_code)
    }
}

#[async_trait::async_trait]
impl SettingsReader for JsonFileStorage {
    async fn report_settings(&self) -> Result<Option<ReportSettings>> {
        self.read_json(&self.settings_file()).await
    }
}
