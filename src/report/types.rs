use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::MonthlyCapChange;

use super::period::{ReportGrouping, ReportScope};

/// A resolved reporting window. Both boundaries are inclusive and rendered as
/// RFC3339 UTC strings with nanosecond precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPeriod {
    pub scope: ReportScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month_key: Option<String>,
    pub from_utc: String,
    pub to_utc: String,
    #[serde(skip)]
    pub(crate) from: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) to: DateTime<Utc>,
}

impl ReportPeriod {
    pub fn from_datetime(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyTotal {
    pub currency_code: String,
    pub total_minor: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupTotal {
    pub period_key: String,
    pub currency_code: String,
    pub total_minor: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub category_key: String,
    pub category_label: String,
    pub currency_code: String,
    pub total_minor: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub by_currency: Vec<CurrencyTotal>,
    pub groups: Vec<GroupTotal>,
    pub categories: Vec<CategoryTotal>,
}

/// Earnings minus spending per currency. Totals may be negative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportNet {
    pub by_currency: Vec<CurrencyTotal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportCapStatus {
    pub month_key: String,
    pub currency_code: String,
    pub cap_amount_minor: i64,
    pub spend_total_minor: i64,
    pub overspend_minor: i64,
    pub is_exceeded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedSummary {
    pub target_currency: String,
    pub earnings_minor: i64,
    pub spending_minor: i64,
    pub net_minor: i64,
    pub used_estimate_rate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub period: ReportPeriod,
    pub grouping: ReportGrouping,
    pub earnings: ReportSection,
    pub spending: ReportSection,
    pub net: ReportNet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted: Option<ConvertedSummary>,
    pub cap_status: Vec<ReportCapStatus>,
    pub cap_changes: Vec<MonthlyCapChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    OrphanCountThresholdExceeded,
    OrphanSpendingThresholdExceeded,
    FxEstimateUsed,
}

impl WarningCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCode::OrphanCountThresholdExceeded => "ORPHAN_COUNT_THRESHOLD_EXCEEDED",
            WarningCode::OrphanSpendingThresholdExceeded => "ORPHAN_SPENDING_THRESHOLD_EXCEEDED",
            WarningCode::FxEstimateUsed => "FX_ESTIMATE_USED",
        }
    }
}

/// Which comparison raised an orphan spending warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrphanTrigger {
    MonthSpend,
    MonthCap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanCountDetails {
    pub period_from_utc: String,
    pub period_to_utc: String,
    pub orphan_count: i64,
    pub threshold: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanSpendingDetails {
    pub month_key: String,
    pub currency_code: String,
    pub orphan_spend_minor: i64,
    pub month_spend_minor: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap_amount_minor: Option<i64>,
    pub threshold_bps: i64,
    pub triggered_by: Vec<OrphanTrigger>,
    pub ratio_to_month_spend_bps: i64,
    pub ratio_to_cap_bps: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FxEstimateDetails {
    pub target_currency: String,
}

/// Structured warning payload. Serialized as the bare details object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WarningDetails {
    OrphanCount(OrphanCountDetails),
    OrphanSpending(OrphanSpendingDetails),
    FxEstimate(FxEstimateDetails),
}

/// Informational annotation attached to a successful report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,
    pub details: WarningDetails,
}

/// What `ReportService::generate` hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedReport {
    pub report: Report,
    pub warnings: Vec<Warning>,
}
