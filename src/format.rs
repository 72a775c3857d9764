use rust_decimal::Decimal;

use crate::report::{CurrencyTotal, GeneratedReport, ReportSection};

/// Number of minor-unit digits for an ISO-4217 currency code.
///
/// Zero-decimal and three-decimal currencies are listed explicitly; anything
/// else (including unknown codes) uses two.
pub fn minor_unit_exponent(currency_code: &str) -> u32 {
    match currency_code.trim().to_uppercase().as_str() {
        "BIF" | "CLP" | "DJF" | "GNF" | "ISK" | "JPY" | "KMF" | "KRW" | "PYG" | "RWF" | "UGX"
        | "UYI" | "VND" | "VUV" | "XAF" | "XOF" | "XPF" => 0,
        "BHD" | "IQD" | "JOD" | "KWD" | "LYD" | "OMR" | "TND" => 3,
        _ => 2,
    }
}

fn group_int_digits(int_part: &str) -> String {
    // Insert commas every 3 digits.
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3);
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let remaining = len.saturating_sub(i + 1);
        if remaining > 0 && remaining % 3 == 0 {
            out.push(',');
        }
    }
    out
}

/// Render an integer minor-unit amount as a grouped major-unit string with
/// exactly `exponent` decimals, e.g. `-123456` with exponent 2 → `-1,234.56`.
pub fn format_minor_units(amount_minor: i64, exponent: u32) -> String {
    let value = Decimal::new(amount_minor, exponent.min(28));
    let negative = value.is_sign_negative() && !value.is_zero();

    let s = value.abs().to_string();
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s.as_str(), ""),
    };

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&group_int_digits(int_part));
    if exponent > 0 {
        out.push('.');
        out.push_str(frac_part);
        for _ in frac_part.len()..exponent as usize {
            out.push('0');
        }
    }
    out
}

/// `format_minor_units` followed by the currency code.
pub fn format_amount(amount_minor: i64, currency_code: &str) -> String {
    let code = currency_code.trim().to_uppercase();
    format!(
        "{} {code}",
        format_minor_units(amount_minor, minor_unit_exponent(&code))
    )
}

fn section_lines(lines: &mut Vec<String>, title: &str, section: &ReportSection, grouping: &str) {
    lines.push(title.to_string());
    if section.by_currency.is_empty() {
        lines.push("  (none)".to_string());
        return;
    }
    currency_lines(lines, &section.by_currency);
    lines.push(format!("  By {grouping}:"));
    for group in &section.groups {
        lines.push(format!(
            "    {}  {}",
            group.period_key,
            format_amount(group.total_minor, &group.currency_code)
        ));
    }
    lines.push("  By category:".to_string());
    for category in &section.categories {
        lines.push(format!(
            "    {}  {}",
            category.category_label,
            format_amount(category.total_minor, &category.currency_code)
        ));
    }
}

fn currency_lines(lines: &mut Vec<String>, totals: &[CurrencyTotal]) {
    for total in totals {
        lines.push(format!(
            "  {}",
            format_amount(total.total_minor, &total.currency_code)
        ));
    }
}

/// Plain-text rendering of a generated report for terminal output.
pub fn render_report_text(generated: &GeneratedReport) -> String {
    let report = &generated.report;
    let grouping = report.grouping.as_str();
    let mut lines = vec![format!(
        "Report {} .. {} ({}, by {grouping})",
        report.period.from_utc, report.period.to_utc, report.period.scope
    )];

    section_lines(&mut lines, "Earnings", &report.earnings, grouping);
    section_lines(&mut lines, "Spending", &report.spending, grouping);

    lines.push("Net".to_string());
    currency_lines(&mut lines, &report.net.by_currency);

    if let Some(converted) = &report.converted {
        let code = &converted.target_currency;
        lines.push(format!(
            "Converted to {code}{}",
            if converted.used_estimate_rate {
                " (estimated rates)"
            } else {
                ""
            }
        ));
        lines.push(format!("  earnings  {}", format_amount(converted.earnings_minor, code)));
        lines.push(format!("  spending  {}", format_amount(converted.spending_minor, code)));
        lines.push(format!("  net       {}", format_amount(converted.net_minor, code)));
    }

    if !report.cap_status.is_empty() {
        lines.push("Caps".to_string());
        for cap in &report.cap_status {
            let mut line = format!(
                "  {}  cap {}  spent {}",
                cap.month_key,
                format_amount(cap.cap_amount_minor, &cap.currency_code),
                format_amount(cap.spend_total_minor, &cap.currency_code)
            );
            if cap.is_exceeded {
                line.push_str(&format!(
                    "  over by {}",
                    format_amount(cap.overspend_minor, &cap.currency_code)
                ));
            }
            lines.push(line);
        }
    }

    if !generated.warnings.is_empty() {
        lines.push("Warnings".to_string());
        for warning in &generated.warnings {
            lines.push(format!("  [{}] {}", warning.code.as_str(), warning.message));
        }
    }

    lines.join("\n")
}
