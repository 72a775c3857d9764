use std::time::Duration;

/// Everything that can abort report generation.
///
/// Input errors are returned before any collaborator is called. Collaborator
/// failures carry the underlying `anyhow` chain.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Invalid report scope: {0:?} (expected range, monthly, bimonthly or quarterly)")]
    InvalidScope(String),

    #[error("Invalid report period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid report grouping: {0:?} (expected day, week or month)")]
    InvalidGrouping(String),

    #[error("Invalid category id: {0}")]
    InvalidCategory(i64),

    #[error("Invalid label id: {0}")]
    InvalidLabel(i64),

    #[error("Invalid label mode: {0:?} (expected any, all or none)")]
    InvalidLabelMode(String),

    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    #[error("Invalid payment filter: {0}")]
    InvalidPaymentFilter(String),

    #[error("Invalid transaction date {value:?} on entry {entry_id}")]
    InvalidTransactionDate { entry_id: i64, value: String },

    #[error("Amount overflow while totalling {0}")]
    AmountOverflow(String),

    #[error("FX rate unavailable: no converter configured for target currency {target_currency}")]
    FxRateUnavailable { target_currency: String },

    #[error("{collaborator} failed: {source:#}")]
    Collaborator {
        collaborator: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("{collaborator} call timed out after {}ms", .timeout.as_millis())]
    Timeout {
        collaborator: &'static str,
        timeout: Duration,
    },
}

impl ReportError {
    /// True for errors caused by the request itself; retrying with corrected
    /// input is safe.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ReportError::InvalidScope(_)
                | ReportError::InvalidPeriod(_)
                | ReportError::InvalidGrouping(_)
                | ReportError::InvalidCategory(_)
                | ReportError::InvalidLabel(_)
                | ReportError::InvalidLabelMode(_)
                | ReportError::InvalidCurrency(_)
                | ReportError::InvalidPaymentFilter(_)
        )
    }
}
