//! The reporting engine: period resolution, aggregation, cap status, orphan
//! warnings and currency conversion, assembled by [`ReportService`].

mod aggregate;
mod calls;
mod caps;
mod convert;
mod error;
mod orphans;
mod period;
mod service;
mod types;

pub use aggregate::{
    aggregate, Aggregation, CategoryLabels, ORPHAN_CATEGORY_KEY, ORPHAN_CATEGORY_LABEL,
    UNKNOWN_CATEGORY_LABEL,
};
pub use caps::CapOverview;
pub use error::ReportError;
pub use orphans::{
    detect_orphan_warnings, ratio_bps, OrphanThresholds, DEFAULT_ORPHAN_COUNT_THRESHOLD,
    DEFAULT_ORPHAN_SPENDING_THRESHOLD_BPS,
};
pub use period::{
    build_report_period, format_utc, month_key_of, months_in_period, parse_month_key,
    parse_utc_timestamp, ReportGrouping, ReportPeriodInput, ReportScope,
};
pub use service::{ReportRequest, ReportService};
pub use types::{
    CategoryTotal, ConvertedSummary, CurrencyTotal, FxEstimateDetails, GeneratedReport,
    GroupTotal, OrphanCountDetails, OrphanSpendingDetails, OrphanTrigger, Report,
    ReportCapStatus, ReportNet, ReportPeriod, ReportSection, Warning, WarningCode, WarningDetails,
};
