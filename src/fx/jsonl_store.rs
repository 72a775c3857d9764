use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use super::store::newest;
use super::{FxRatePoint, FxRateStore};

/// Rates on disk as `fx/{BASE}-{QUOTE}/{YYYY}.jsonl`, one point per line.
pub struct JsonlFxRateStore {
    base_path: PathBuf,
}

impl JsonlFxRateStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn fx_dir(&self, base: &str, quote: &str) -> PathBuf {
        let pair = format!("{}-{}", sanitize_code(base), sanitize_code(quote));
        self.base_path.join("fx").join(pair)
    }

    fn fx_file(&self, base: &str, quote: &str, year: i32) -> PathBuf {
        self.fx_dir(base, quote).join(format!("{year:04}.jsonl"))
    }

    async fn read_jsonl(&self, path: &Path) -> Result<Vec<FxRatePoint>> {
        let file = match fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", path.display()))
            }
        };

        let mut lines = BufReader::new(file).lines();
        let mut items = Vec::new();
        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            if line.trim().is_empty() {
                continue;
            }
            let item: FxRatePoint = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse JSONL line: {line}"))?;
            items.push(item);
        }
        Ok(items)
    }

    async fn write_jsonl(&self, path: &Path, items: &[FxRatePoint]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create FX directory")?;
        }

        let mut content = String::new();
        for item in items {
            content.push_str(&serde_json::to_string(item).context("Failed to serialize FX rate")?);
            content.push('\n');
        }
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    fn sort_fx_rates(items: &mut [FxRatePoint]) {
        items.sort_by(|a, b| {
            a.as_of_date
                .cmp(&b.as_of_date)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| a.rate.cmp(&b.rate))
        });
    }
}

#[async_trait::async_trait]
impl FxRateStore for JsonlFxRateStore {
    async fn get_fx_rate(
        &self,
        base: &str,
        quote: &str,
        date: NaiveDate,
    ) -> Result<Option<FxRatePoint>> {
        let path = self.fx_file(base, quote, date.year());
        let mut rates = self.read_jsonl(&path).await?;
        rates.retain(|r| r.as_of_date == date);
        Ok(rates.into_iter().max_by_key(|r| r.timestamp))
    }

    async fn latest_fx_rate(&self, base: &str, quote: &str) -> Result<Option<FxRatePoint>> {
        let fx_dir = self.fx_dir(base, quote);
        let mut entries = match fs::read_dir(&fx_dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to read FX directory"),
        };

        let mut years = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                years.push(path);
            }
        }
        // Year files sort lexically; the newest non-empty one wins.
        years.sort();
        for path in years.iter().rev() {
            if let Some(rate) = newest(self.read_jsonl(path).await?) {
                debug!(base, quote, date = %rate.as_of_date, "latest FX rate on disk");
                return Ok(Some(rate));
            }
        }
        Ok(None)
    }

    async fn put_fx_rates(&self, rates: &[FxRatePoint]) -> Result<()> {
        if rates.is_empty() {
            return Ok(());
        }

        let mut grouped: HashMap<(String, String, i32), Vec<FxRatePoint>> = HashMap::new();
        for rate in rates {
            let key = (rate.base.clone(), rate.quote.clone(), rate.as_of_date.year());
            grouped.entry(key).or_default().push(rate.clone());
        }

        for ((base, quote, year), items) in grouped {
            let path = self.fx_file(&base, &quote, year);
            let mut all_items = self.read_jsonl(&path).await?;
            all_items.extend(items);
            Self::sort_fx_rates(&mut all_items);
            self.write_jsonl(&path, &all_items).await?;
        }
        Ok(())
    }
}

fn sanitize_code(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn put_fx_rates_rewrites_year_file_in_chronological_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = JsonlFxRateStore::new(dir.path());

        store
            .put_fx_rates(&[FxRatePoint::close("usd", "eur", day("2025-12-31"), "0.99", "test")])
            .await?;
        store
            .put_fx_rates(&[FxRatePoint::close("USD", "EUR", day("2025-01-15"), "0.91", "test")])
            .await?;

        let path = dir.path().join("fx").join("USD-EUR").join("2025.jsonl");
        let lines = fs::read_to_string(&path).await?;
        let parsed: Vec<FxRatePoint> = lines
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].as_of_date, day("2025-01-15"));
        assert_eq!(parsed[1].as_of_date, day("2025-12-31"));
        Ok(())
    }

    #[tokio::test]
    async fn latest_spans_year_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = JsonlFxRateStore::new(dir.path());

        store
            .put_fx_rates(&[
                FxRatePoint::close("EUR", "USD", day("2025-11-30"), "1.05", "test"),
                FxRatePoint::close("EUR", "USD", day("2026-01-02"), "1.08", "test"),
            ])
            .await?;

        let latest = store.latest_fx_rate("EUR", "USD").await?.unwrap();
        assert_eq!(latest.as_of_date, day("2026-01-02"));

        let exact = store
            .get_fx_rate("EUR", "USD", day("2025-11-30"))
            .await?
            .unwrap();
        assert_eq!(exact.rate, "1.05");

        assert!(store.latest_fx_rate("JPY", "USD").await?.is_none());
        Ok(())
    }
}
