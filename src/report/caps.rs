use tracing::debug;

use crate::models::MonthlyCapChange;
use crate::storage::CapReader;

use super::calls::{CallPolicy, CAP_READER};
use super::period::{months_in_period, parse_utc_timestamp};
use super::{ReportCapStatus, ReportError, ReportPeriod};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapOverview {
    pub status: Vec<ReportCapStatus>,
    pub changes: Vec<MonthlyCapChange>,
}

/// Cap status for every calendar month touched by `period`.
///
/// Months without an active cap contribute their change history but no
/// status row.
pub(crate) async fn build_cap_status(
    period: &ReportPeriod,
    reader: &dyn CapReader,
    calls: &CallPolicy,
) -> Result<CapOverview, ReportError> {
    let mut overview = CapOverview::default();

    for month_key in months_in_period(period) {
        let history = calls.run(CAP_READER, reader.cap_history(&month_key)).await?;
        overview.changes.extend(history);

        let Some(cap) = calls.run(CAP_READER, reader.show_cap(&month_key)).await? else {
            debug!(month_key = %month_key, "no active cap");
            continue;
        };

        let currency_code = cap.currency_code.trim().to_uppercase();
        let spend_total_minor = calls
            .run(CAP_READER, reader.expense_total(&month_key, &currency_code))
            .await?;
        let overspend_minor = spend_total_minor
            .checked_sub(cap.amount_minor)
            .ok_or_else(|| ReportError::AmountOverflow(format!("{month_key} overspend")))?
            .max(0);

        debug!(
            month_key = %month_key,
            currency = %currency_code,
            cap = cap.amount_minor,
            spend = spend_total_minor,
            "resolved cap status"
        );

        overview.status.push(ReportCapStatus {
            month_key: month_key.clone(),
            currency_code,
            cap_amount_minor: cap.amount_minor,
            spend_total_minor,
            overspend_minor,
            is_exceeded: overspend_minor > 0,
        });
    }

    overview.status.sort_by(|a, b| {
        a.month_key
            .cmp(&b.month_key)
            .then_with(|| a.currency_code.cmp(&b.currency_code))
    });
    overview.changes.sort_by(|a, b| {
        a.month_key
            .cmp(&b.month_key)
            .then_with(|| {
                parse_utc_timestamp(&a.changed_at_utc).cmp(&parse_utc_timestamp(&b.changed_at_utc))
            })
            .then_with(|| a.changed_at_utc.cmp(&b.changed_at_utc))
            .then_with(|| a.id.cmp(&b.id))
    });

    Ok(overview)
}
