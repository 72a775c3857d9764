use serde::{Deserialize, Serialize};

/// The active spending cap for a calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCap {
    pub month_key: String,
    pub currency_code: String,
    pub amount_minor: i64,
}

impl MonthlyCap {
    pub fn new(
        month_key: impl Into<String>,
        currency_code: impl Into<String>,
        amount_minor: i64,
    ) -> Self {
        Self {
            month_key: month_key.into(),
            currency_code: currency_code.into(),
            amount_minor,
        }
    }
}

/// One historical edit of a monthly cap. Stored in `cap_changes.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCapChange {
    pub id: i64,
    pub month_key: String,
    pub currency_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_amount_minor: Option<i64>,
    pub new_amount_minor: i64,
    pub changed_at_utc: String,
}
