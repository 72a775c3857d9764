use std::fmt;

use chrono::{DateTime, Utc};

use crate::models::{Entry, PaymentMethod};
use crate::report::parse_utc_timestamp;

/// How `EntryFilter::label_ids` are matched against an entry's labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMode {
    /// At least one of the labels.
    #[default]
    Any,
    /// Every label.
    All,
    /// None of the labels.
    None,
}

impl LabelMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "any" => Some(LabelMode::Any),
            "all" => Some(LabelMode::All),
            "none" => Some(LabelMode::None),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelMode::Any => "any",
            LabelMode::All => "all",
            LabelMode::None => "none",
        }
    }
}

impl fmt::Display for LabelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Already-validated selection criteria handed to an `EntrySource`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFilter {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub category_id: Option<i64>,
    pub label_ids: Vec<i64>,
    pub label_mode: LabelMode,
    pub payment_method: Option<PaymentMethod>,
    pub card_id: Option<i64>,
}

impl EntryFilter {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            category_id: None,
            label_ids: Vec::new(),
            label_mode: LabelMode::Any,
            payment_method: None,
            card_id: None,
        }
    }

    /// Whether `entry` satisfies every criterion.
    ///
    /// Entries whose timestamp cannot be parsed are kept so the report
    /// surfaces them as invalid instead of silently dropping them.
    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(ts) = parse_utc_timestamp(&entry.transaction_date_utc) {
            if ts < self.from || ts > self.to {
                return false;
            }
        }

        if let Some(category_id) = self.category_id {
            if entry.category_id != Some(category_id) {
                return false;
            }
        }

        if !self.label_ids.is_empty() {
            let has = |id: &i64| entry.label_ids.contains(id);
            let ok = match self.label_mode {
                LabelMode::Any => self.label_ids.iter().any(has),
                LabelMode::All => self.label_ids.iter().all(has),
                LabelMode::None => !self.label_ids.iter().any(has),
            };
            if !ok {
                return false;
            }
        }

        if let Some(method) = self.payment_method {
            if entry.payment_method != method {
                return false;
            }
        }

        if let Some(card_id) = self.card_id {
            if entry.card_id != Some(card_id) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn february() -> EntryFilter {
        EntryFilter::new(
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 2, 28, 23, 59, 59).unwrap(),
        )
    }

    #[test]
    fn date_bounds_are_inclusive_and_offset_aware() {
        let filter = february();
        assert!(filter.matches(&Entry::expense(1, 1, "USD", "2026-02-01T00:00:00Z")));
        assert!(filter.matches(&Entry::expense(2, 1, "USD", "2026-02-28T23:59:59Z")));
        assert!(!filter.matches(&Entry::expense(3, 1, "USD", "2026-03-01T00:00:00Z")));
        // 2026-03-01T00:30 at +01:00 is still February in UTC.
        assert!(filter.matches(&Entry::expense(4, 1, "USD", "2026-03-01T00:30:00+01:00")));
    }

    #[test]
    fn unparseable_dates_pass_through() {
        assert!(february().matches(&Entry::expense(1, 1, "USD", "not a date")));
    }

    #[test]
    fn label_modes() {
        let mut filter = february();
        filter.label_ids = vec![1, 2];
        let both = Entry::expense(1, 1, "USD", "2026-02-02T00:00:00Z").with_labels([1, 2, 3]);
        let one = Entry::expense(2, 1, "USD", "2026-02-02T00:00:00Z").with_labels([2]);
        let neither = Entry::expense(3, 1, "USD", "2026-02-02T00:00:00Z").with_labels([7]);

        filter.label_mode = LabelMode::Any;
        assert!(filter.matches(&both) && filter.matches(&one) && !filter.matches(&neither));

        filter.label_mode = LabelMode::All;
        assert!(filter.matches(&both) && !filter.matches(&one) && !filter.matches(&neither));

        filter.label_mode = LabelMode::None;
        assert!(!filter.matches(&both) && !filter.matches(&one) && filter.matches(&neither));
    }

    #[test]
    fn category_and_payment_filters() {
        let mut filter = february();
        filter.category_id = Some(4);
        filter.payment_method = Some(PaymentMethod::Card);
        filter.card_id = Some(11);

        let hit = Entry::expense(1, 1, "USD", "2026-02-02T00:00:00Z")
            .with_category(4)
            .with_card(11);
        let cash = Entry::expense(2, 1, "USD", "2026-02-02T00:00:00Z").with_category(4);
        let other_card = Entry::expense(3, 1, "USD", "2026-02-02T00:00:00Z")
            .with_category(4)
            .with_card(12);

        assert!(filter.matches(&hit));
        assert!(!filter.matches(&cash));
        assert!(!filter.matches(&other_card));
    }
}
