use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Income,
    Expense,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Income => "income",
            EntryType::Expense => "expense",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
        }
    }
}

/// A single income or expense record. One line in `entries.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Always positive; the direction comes from `entry_type`.
    pub amount_minor: i64,
    pub currency_code: String,
    /// RFC3339 timestamp exactly as stored.
    pub transaction_date_utc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<i64>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<i64>,
    #[serde(default)]
    pub note: String,
}

impl Entry {
    pub fn new(
        id: i64,
        entry_type: EntryType,
        amount_minor: i64,
        currency_code: impl Into<String>,
        transaction_date_utc: impl Into<String>,
    ) -> Self {
        Self {
            id,
            entry_type,
            amount_minor,
            currency_code: currency_code.into(),
            transaction_date_utc: transaction_date_utc.into(),
            category_id: None,
            label_ids: Vec::new(),
            payment_method: PaymentMethod::Cash,
            card_id: None,
            note: String::new(),
        }
    }

    pub fn income(
        id: i64,
        amount_minor: i64,
        currency_code: impl Into<String>,
        transaction_date_utc: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            EntryType::Income,
            amount_minor,
            currency_code,
            transaction_date_utc,
        )
    }

    pub fn expense(
        id: i64,
        amount_minor: i64,
        currency_code: impl Into<String>,
        transaction_date_utc: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            EntryType::Expense,
            amount_minor,
            currency_code,
            transaction_date_utc,
        )
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_labels(mut self, label_ids: impl IntoIterator<Item = i64>) -> Self {
        self.label_ids = label_ids.into_iter().collect();
        self
    }

    pub fn with_card(mut self, card_id: i64) -> Self {
        self.payment_method = PaymentMethod::Card;
        self.card_id = Some(card_id);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn is_orphan(&self) -> bool {
        self.category_id.is_none()
    }
}
