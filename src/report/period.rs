//! Period resolution and the calendar helpers shared by the other report stages.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use super::{ReportError, ReportPeriod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportScope {
    Range,
    Monthly,
    Bimonthly,
    Quarterly,
}

impl ReportScope {
    /// Parse a scope name. Blank input means `range`.
    pub fn parse(s: &str) -> Result<Self, ReportError> {
        match s.trim().to_lowercase().as_str() {
            "" | "range" => Ok(ReportScope::Range),
            "monthly" => Ok(ReportScope::Monthly),
            "bimonthly" => Ok(ReportScope::Bimonthly),
            "quarterly" => Ok(ReportScope::Quarterly),
            _ => Err(ReportError::InvalidScope(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportScope::Range => "range",
            ReportScope::Monthly => "monthly",
            ReportScope::Bimonthly => "bimonthly",
            ReportScope::Quarterly => "quarterly",
        }
    }

    fn month_span(&self) -> Option<u32> {
        match self {
            ReportScope::Range => None,
            ReportScope::Monthly => Some(1),
            ReportScope::Bimonthly => Some(2),
            ReportScope::Quarterly => Some(3),
        }
    }
}

impl fmt::Display for ReportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket granularity for `GroupTotal::period_key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportGrouping {
    Day,
    Week,
    #[default]
    Month,
}

impl ReportGrouping {
    /// Parse a grouping name. Blank input means `month`.
    pub fn parse(s: &str) -> Result<Self, ReportError> {
        match s.trim().to_lowercase().as_str() {
            "" | "month" => Ok(ReportGrouping::Month),
            "day" => Ok(ReportGrouping::Day),
            "week" => Ok(ReportGrouping::Week),
            _ => Err(ReportError::InvalidGrouping(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportGrouping::Day => "day",
            ReportGrouping::Week => "week",
            ReportGrouping::Month => "month",
        }
    }

    /// `YYYY-MM-DD`, ISO `YYYY-Www` or `YYYY-MM` for the UTC calendar date of `ts`.
    pub fn period_key(&self, ts: DateTime<Utc>) -> String {
        let date = ts.date_naive();
        match self {
            ReportGrouping::Day => date.format("%Y-%m-%d").to_string(),
            ReportGrouping::Week => {
                let iso = date.iso_week();
                format!("{:04}-W{:02}", iso.year(), iso.week())
            }
            ReportGrouping::Month => month_key_of(ts),
        }
    }
}

impl fmt::Display for ReportGrouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw period request, as typed by a user or passed by an API caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportPeriodInput {
    pub scope: String,
    pub month_key: String,
    pub date_from_utc: String,
    pub date_to_utc: String,
}

impl ReportPeriodInput {
    pub fn month(scope: impl Into<String>, month_key: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            month_key: month_key.into(),
            ..Default::default()
        }
    }

    pub fn range(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            scope: "range".to_string(),
            date_from_utc: from.into(),
            date_to_utc: to.into(),
            ..Default::default()
        }
    }
}

pub fn build_report_period(input: &ReportPeriodInput) -> Result<ReportPeriod, ReportError> {
    let scope = ReportScope::parse(&input.scope)?;

    let (month_key, from, to) = match scope.month_span() {
        Some(months) => {
            let key = input.month_key.trim();
            if key.is_empty() {
                return Err(ReportError::InvalidPeriod(format!(
                    "month_key is required for {scope} reports"
                )));
            }
            let first = parse_month_key(key).ok_or_else(|| {
                ReportError::InvalidPeriod(format!("invalid month_key {key:?} (expected YYYY-MM)"))
            })?;
            let from = first.and_time(NaiveTime::MIN).and_utc();
            let next = first
                .checked_add_months(Months::new(months))
                .ok_or_else(|| {
                    ReportError::InvalidPeriod(format!("month_key {key:?} is out of range"))
                })?;
            let to = next.and_time(NaiveTime::MIN).and_utc() - Duration::nanoseconds(1);
            (Some(key.to_string()), from, to)
        }
        None => {
            let from = parse_boundary("date_from_utc", &input.date_from_utc, false)?;
            let to = parse_boundary("date_to_utc", &input.date_to_utc, true)?;
            if from > to {
                return Err(ReportError::InvalidPeriod(format!(
                    "date_from_utc {} is after date_to_utc {}",
                    format_utc(from),
                    format_utc(to)
                )));
            }
            (None, from, to)
        }
    };

    Ok(ReportPeriod {
        scope,
        month_key,
        from_utc: format_utc(from),
        to_utc: format_utc(to),
        from,
        to,
    })
}

fn parse_boundary(label: &str, raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ReportError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ReportError::InvalidPeriod(format!(
            "{label} is required for range reports"
        )));
    }

    if value.len() == 10 {
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            let time = if end_of_day {
                NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
            } else {
                Some(NaiveTime::MIN)
            };
            if let Some(time) = time {
                return Ok(date.and_time(time).and_utc());
            }
        }
    }

    parse_utc_timestamp(value).ok_or_else(|| {
        ReportError::InvalidPeriod(format!(
            "invalid {label} {value:?} (expected RFC3339 timestamp or YYYY-MM-DD)"
        ))
    })
}

/// Parse an RFC3339 timestamp with any offset into UTC.
pub fn parse_utc_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// RFC3339 in UTC with up to nine fractional digits, trailing zeros trimmed.
pub fn format_utc(ts: DateTime<Utc>) -> String {
    let whole = ts.format("%Y-%m-%dT%H:%M:%S").to_string();
    let nanos = ts.timestamp_subsec_nanos();
    if nanos == 0 {
        return format!("{whole}Z");
    }
    let digits = format!("{nanos:09}");
    format!("{whole}.{}Z", digits.trim_end_matches('0'))
}

/// Parse `YYYY-MM` into the first day of that month.
pub fn parse_month_key(key: &str) -> Option<NaiveDate> {
    let key = key.trim();
    let bytes = key.as_bytes();
    if bytes.len() != 7 || bytes[4] != b'-' {
        return None;
    }
    if !bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || b.is_ascii_digit())
    {
        return None;
    }
    NaiveDate::parse_from_str(&format!("{key}-01"), "%Y-%m-%d").ok()
}

pub fn month_key_of(ts: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", ts.year(), ts.month())
}

/// Every calendar month touched by `[from, to]`, oldest first.
pub fn months_in_period(period: &ReportPeriod) -> Vec<String> {
    let Some(mut cursor) = period.from.date_naive().with_day(1) else {
        return Vec::new();
    };
    let Some(last) = period.to.date_naive().with_day(1) else {
        return Vec::new();
    };

    let mut months = Vec::new();
    while cursor <= last {
        months.push(format!("{:04}-{:02}", cursor.year(), cursor.month()));
        match cursor.checked_add_months(Months::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn monthly_period_ends_on_last_nanosecond_of_february() {
        let period = build_report_period(&ReportPeriodInput::month("monthly", "2026-02")).unwrap();
        assert_eq!(period.scope, ReportScope::Monthly);
        assert_eq!(period.month_key.as_deref(), Some("2026-02"));
        assert_eq!(period.from_utc, "2026-02-01T00:00:00Z");
        assert_eq!(period.to_utc, "2026-02-28T23:59:59.999999999Z");
    }

    #[test]
    fn leap_year_february_has_29_days() {
        let period = build_report_period(&ReportPeriodInput::month("monthly", "2028-02")).unwrap();
        assert_eq!(period.to_utc, "2028-02-29T23:59:59.999999999Z");
    }

    #[test]
    fn bimonthly_period_crosses_into_december() {
        let period =
            build_report_period(&ReportPeriodInput::month("BiMonthly", " 2026-11 ")).unwrap();
        assert_eq!(period.from_utc, "2026-11-01T00:00:00Z");
        assert_eq!(period.to_utc, "2026-12-31T23:59:59.999999999Z");
    }

    #[test]
    fn quarterly_period_crosses_year_boundary() {
        let period = build_report_period(&ReportPeriodInput::month("quarterly", "2026-12")).unwrap();
        assert_eq!(period.from_utc, "2026-12-01T00:00:00Z");
        assert_eq!(period.to_utc, "2027-02-28T23:59:59.999999999Z");
    }

    #[test]
    fn range_with_bare_dates_spans_whole_days() {
        let period =
            build_report_period(&ReportPeriodInput::range("2026-02-10", "2026-02-11")).unwrap();
        assert_eq!(period.scope, ReportScope::Range);
        assert_eq!(period.month_key, None);
        assert_eq!(period.from_utc, "2026-02-10T00:00:00Z");
        assert_eq!(period.to_utc, "2026-02-11T23:59:59.999999999Z");
    }

    #[test]
    fn blank_scope_defaults_to_range() {
        let input = ReportPeriodInput {
            scope: "  ".to_string(),
            date_from_utc: "2026-03-01".to_string(),
            date_to_utc: "2026-03-02".to_string(),
            ..Default::default()
        };
        assert_eq!(build_report_period(&input).unwrap().scope, ReportScope::Range);
    }

    #[test]
    fn range_timestamps_are_normalized_to_utc() {
        let period = build_report_period(&ReportPeriodInput::range(
            "2026-02-10T01:30:00+02:00",
            "2026-02-10T12:00:00.250Z",
        ))
        .unwrap();
        assert_eq!(period.from_utc, "2026-02-09T23:30:00Z");
        assert_eq!(period.to_utc, "2026-02-10T12:00:00.25Z");
    }

    #[test]
    fn invalid_scope_is_rejected() {
        let err = build_report_period(&ReportPeriodInput::month("weekly", "2026-02")).unwrap_err();
        assert!(matches!(err, ReportError::InvalidScope(s) if s == "weekly"));
    }

    #[test]
    fn monthly_scope_requires_valid_month_key() {
        for key in ["", "2026-2", "2026-13", "26-02", "2026/02", "2026-02-01"] {
            let err = build_report_period(&ReportPeriodInput::month("monthly", key)).unwrap_err();
            assert!(matches!(err, ReportError::InvalidPeriod(_)), "key {key:?}");
        }
    }

    #[test]
    fn range_rejects_missing_unparseable_and_inverted_boundaries() {
        let cases = [
            ("", "2026-02-11"),
            ("2026-02-10", ""),
            ("yesterday", "2026-02-11"),
            ("2026-02-12", "2026-02-11"),
        ];
        for (from, to) in cases {
            let err = build_report_period(&ReportPeriodInput::range(from, to)).unwrap_err();
            assert!(matches!(err, ReportError::InvalidPeriod(_)), "{from:?}..{to:?}");
        }
    }

    #[test]
    fn same_day_range_is_valid() {
        let period =
            build_report_period(&ReportPeriodInput::range("2026-02-10", "2026-02-10")).unwrap();
        assert!(period.from_datetime() < period.to_datetime());
    }

    #[test]
    fn week_keys_follow_iso_year() {
        // 2027-01-01 is a Friday and belongs to ISO week 53 of 2026.
        let ts = Utc.with_ymd_and_hms(2027, 1, 1, 8, 0, 0).unwrap();
        assert_eq!(ReportGrouping::Week.period_key(ts), "2026-W53");
        assert_eq!(ReportGrouping::Day.period_key(ts), "2027-01-01");
        assert_eq!(ReportGrouping::Month.period_key(ts), "2027-01");
    }

    #[test]
    fn grouping_parse_defaults_and_rejects() {
        assert_eq!(ReportGrouping::parse("").unwrap(), ReportGrouping::Month);
        assert_eq!(ReportGrouping::parse(" WEEK ").unwrap(), ReportGrouping::Week);
        assert!(matches!(
            ReportGrouping::parse("year"),
            Err(ReportError::InvalidGrouping(_))
        ));
    }

    #[test]
    fn months_in_period_lists_each_touched_month() {
        let period =
            build_report_period(&ReportPeriodInput::range("2026-11-15", "2027-01-03")).unwrap();
        assert_eq!(
            months_in_period(&period),
            vec!["2026-11".to_string(), "2026-12".to_string(), "2027-01".to_string()]
        );
    }
}
