use serde::{Deserialize, Serialize};

/// User-editable report settings, as persisted by the settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSettings {
    pub orphan_count_threshold: i64,
    pub orphan_spending_threshold_bps: i64,
}
