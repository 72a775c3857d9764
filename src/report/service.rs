use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::fx::CurrencyConverter;
use crate::models::{Entry, PaymentMethod};
use crate::storage::{
    CapReader, CategorySource, EntryFilter, EntrySource, LabelMode, SettingsReader,
};

use super::aggregate::{aggregate, CategoryLabels};
use super::calls::{CallPolicy, CATEGORY_SOURCE, ENTRY_SOURCE, SETTINGS_READER};
use super::caps::{build_cap_status, CapOverview};
use super::convert::convert_entries;
use super::orphans::{detect_orphan_warnings, OrphanThresholds};
use super::period::{
    build_report_period, parse_utc_timestamp, ReportGrouping, ReportPeriodInput,
};
use super::{
    FxEstimateDetails, GeneratedReport, Report, ReportError, Warning, WarningCode, WarningDetails,
};

/// Everything a caller can ask of one report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRequest {
    pub period: ReportPeriodInput,
    /// `day`, `week` or `month`; blank means `month`.
    pub grouping: String,
    pub category_id: Option<i64>,
    pub label_ids: Vec<i64>,
    /// `any`, `all` or `none`; blank means `any`.
    pub label_mode: String,
    pub convert_to: Option<String>,
    /// `cash` or `card`.
    pub payment_method: Option<String>,
    pub card_id: Option<i64>,
}

impl ReportRequest {
    pub fn new(period: ReportPeriodInput) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    pub fn with_grouping(mut self, grouping: impl Into<String>) -> Self {
        self.grouping = grouping.into();
        self
    }

    pub fn with_convert_to(mut self, currency: impl Into<String>) -> Self {
        self.convert_to = Some(currency.into());
        self
    }
}

/// The report engine. Holds only collaborators, so one instance can serve
/// any number of concurrent `generate` calls.
pub struct ReportService {
    entries: Arc<dyn EntrySource>,
    categories: Option<Arc<dyn CategorySource>>,
    caps: Option<Arc<dyn CapReader>>,
    converter: Option<Arc<dyn CurrencyConverter>>,
    settings: Option<Arc<dyn SettingsReader>>,
    default_thresholds: OrphanThresholds,
    calls: CallPolicy,
}

impl ReportService {
    pub fn new(entries: Arc<dyn EntrySource>) -> Self {
        Self {
            entries,
            categories: None,
            caps: None,
            converter: None,
            settings: None,
            default_thresholds: OrphanThresholds::default(),
            calls: CallPolicy::default(),
        }
    }

    pub fn with_category_source(mut self, categories: Arc<dyn CategorySource>) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn with_cap_reader(mut self, caps: Arc<dyn CapReader>) -> Self {
        self.caps = Some(caps);
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn CurrencyConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn with_settings_reader(mut self, settings: Arc<dyn SettingsReader>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Thresholds used when no settings are stored.
    pub fn with_default_thresholds(mut self, thresholds: OrphanThresholds) -> Self {
        self.default_thresholds = thresholds;
        self
    }

    /// Upper bound on each individual collaborator call.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.calls = CallPolicy::new(Some(timeout));
        self
    }

    pub async fn generate(&self, request: ReportRequest) -> Result<GeneratedReport, ReportError> {
        let period = build_report_period(&request.period)?;
        let grouping = ReportGrouping::parse(&request.grouping)?;
        let mut filter = EntryFilter::new(period.from_datetime(), period.to_datetime());
        apply_filters(&mut filter, &request)?;
        let target_currency = request
            .convert_to
            .as_deref()
            .map(normalize_currency)
            .transpose()?
            .flatten();

        let converter = match (&target_currency, &self.converter) {
            (Some(target), None) => {
                return Err(ReportError::FxRateUnavailable {
                    target_currency: target.clone(),
                })
            }
            (Some(_), Some(converter)) => Some(converter.as_ref()),
            (None, _) => None,
        };

        debug!(
            scope = %period.scope,
            from = %period.from_utc,
            to = %period.to_utc,
            grouping = %grouping,
            "generating report"
        );

        let mut entries = self
            .calls
            .run(ENTRY_SOURCE, self.entries.list_entries(&filter))
            .await?;
        sort_entries(&mut entries);

        let labels = self.category_labels(&entries).await?;
        let aggregation = aggregate(&entries, grouping, &labels)?;

        let converted = match (&target_currency, converter) {
            (Some(target), Some(converter)) => {
                Some(convert_entries(&entries, target, converter, &self.calls).await?)
            }
            _ => None,
        };

        let caps = match &self.caps {
            Some(reader) => build_cap_status(&period, reader.as_ref(), &self.calls).await?,
            None => CapOverview::default(),
        };

        let thresholds = self.thresholds().await?;
        let mut warnings = detect_orphan_warnings(&entries, &period, &caps.status, thresholds)?;

        if let Some(summary) = converted.as_ref().filter(|s| s.used_estimate_rate) {
            warnings.push(Warning {
                code: WarningCode::FxEstimateUsed,
                message: format!(
                    "Converted totals in {} use estimated exchange rates for some entries",
                    summary.target_currency
                ),
                details: WarningDetails::FxEstimate(FxEstimateDetails {
                    target_currency: summary.target_currency.clone(),
                }),
            });
        }

        info!(
            entries = entries.len(),
            warnings = warnings.len(),
            caps = caps.status.len(),
            "report generated"
        );

        Ok(GeneratedReport {
            report: Report {
                period,
                grouping,
                earnings: aggregation.earnings,
                spending: aggregation.spending,
                net: aggregation.net,
                converted,
                cap_status: caps.status,
                cap_changes: caps.changes,
            },
            warnings,
        })
    }

    async fn category_labels(&self, entries: &[Entry]) -> Result<CategoryLabels, ReportError> {
        let Some(source) = &self.categories else {
            return Ok(CategoryLabels::new());
        };
        let ids: Vec<i64> = entries
            .iter()
            .filter_map(|e| e.category_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(CategoryLabels::new());
        }

        let categories = self
            .calls
            .run(CATEGORY_SOURCE, source.list_categories_by_ids(&ids))
            .await?;
        Ok(categories.into_iter().map(|c| (c.id, c.name)).collect())
    }

    async fn thresholds(&self) -> Result<OrphanThresholds, ReportError> {
        let Some(reader) = &self.settings else {
            return Ok(self.default_thresholds);
        };
        let stored = self
            .calls
            .run(SETTINGS_READER, reader.report_settings())
            .await?;
        Ok(stored
            .map(OrphanThresholds::from)
            .unwrap_or(self.default_thresholds))
    }
}

fn apply_filters(filter: &mut EntryFilter, request: &ReportRequest) -> Result<(), ReportError> {
    if let Some(category_id) = request.category_id {
        if category_id <= 0 {
            return Err(ReportError::InvalidCategory(category_id));
        }
        filter.category_id = Some(category_id);
    }

    let mut label_ids = BTreeSet::new();
    for &id in &request.label_ids {
        if id <= 0 {
            return Err(ReportError::InvalidLabel(id));
        }
        label_ids.insert(id);
    }
    filter.label_ids = label_ids.into_iter().collect();
    filter.label_mode = LabelMode::parse(&request.label_mode)
        .ok_or_else(|| ReportError::InvalidLabelMode(request.label_mode.clone()))?;

    let method = match request.payment_method.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.to_lowercase().as_str() {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            _ => {
                return Err(ReportError::InvalidPaymentFilter(format!(
                    "unknown payment method {raw:?} (expected cash or card)"
                )))
            }
        },
    };

    if let Some(card_id) = request.card_id {
        if card_id <= 0 {
            return Err(ReportError::InvalidPaymentFilter(format!(
                "invalid card id {card_id}"
            )));
        }
        if method == Some(PaymentMethod::Cash) {
            return Err(ReportError::InvalidPaymentFilter(
                "card id cannot be combined with cash payments".to_string(),
            ));
        }
        filter.payment_method = Some(PaymentMethod::Card);
        filter.card_id = Some(card_id);
    } else {
        filter.payment_method = method;
    }

    Ok(())
}

/// Blank means no conversion; otherwise three ASCII letters.
fn normalize_currency(raw: &str) -> Result<Option<String>, ReportError> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        return Ok(None);
    }
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(ReportError::InvalidCurrency(raw.to_string()));
    }
    Ok(Some(code))
}

/// Chronological by parsed instant; the raw string breaks ties between equal
/// instants written differently.
fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        parse_utc_timestamp(&a.transaction_date_utc)
            .cmp(&parse_utc_timestamp(&b.transaction_date_utc))
            .then_with(|| a.transaction_date_utc.cmp(&b.transaction_date_utc))
            .then_with(|| a.entry_type.as_str().cmp(b.entry_type.as_str()))
            .then_with(|| a.currency_code.cmp(&b.currency_code))
            .then_with(|| a.amount_minor.cmp(&b.amount_minor))
            .then_with(|| a.id.cmp(&b.id))
    });
}
