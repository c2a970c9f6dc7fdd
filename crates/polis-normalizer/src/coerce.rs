//! Type coercion of untrusted JSON values into canonical field types
//!
//! Every coercion either returns a value traceable to its input or `None`.
//! Anything lossy (currency symbols, non-ISO dates, counts buried in text) is
//! reported as a warning rather than rejected.

use chrono::NaiveDate;
use serde_json::Value;
use std::fmt;

/// A low-confidence coercion noticed while normalizing
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionWarning {
    /// Canonical field the value was destined for
    pub field: &'static str,

    /// What was unusual about it
    pub message: String,
}

impl CoercionWarning {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Non-ISO date layouts seen on policy documents, day-first
const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d.%m.%Y", "%Y%m%d"];

/// Text value of a field; numbers are rendered verbatim
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Monetary amount, rounded to cents
pub fn money(value: &Value, field: &'static str, warnings: &mut Vec<CoercionWarning>) -> Option<f64> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(amount) if amount.is_finite() => Some(round_cents(amount)),
            _ => {
                warnings.push(CoercionWarning::new(field, format!("{} is not a finite amount", n)));
                None
            }
        },
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Ok(plain) = trimmed.parse::<f64>() {
                if plain.is_finite() {
                    return Some(round_cents(plain));
                }
                warnings.push(CoercionWarning::new(field, format!("'{}' is not a finite amount", trimmed)));
                return None;
            }
            match parse_money_text(trimmed) {
                Some(amount) => {
                    warnings.push(CoercionWarning::new(
                        field,
                        format!("read amount {:.2} from text '{}'", amount, trimmed),
                    ));
                    Some(amount)
                }
                None => {
                    warnings.push(CoercionWarning::new(field, format!("could not read an amount from '{}'", trimmed)));
                    None
                }
            }
        }
        Value::Null => None,
        other => {
            warnings.push(CoercionWarning::new(field, format!("expected an amount, got {}", other)));
            None
        }
    }
}

/// Calendar date; ISO dates (optionally with a time part) pass silently
pub fn date(value: &Value, field: &'static str, warnings: &mut Vec<CoercionWarning>) -> Option<NaiveDate> {
    let raw = match value {
        Value::String(s) => s.trim(),
        Value::Null => return None,
        other => {
            warnings.push(CoercionWarning::new(field, format!("expected a date, got {}", other)));
            return None;
        }
    };
    if raw.is_empty() {
        return None;
    }

    let iso_prefix = raw.get(..10).unwrap_or(raw);
    if let Ok(parsed) = NaiveDate::parse_from_str(iso_prefix, "%Y-%m-%d") {
        return Some(parsed);
    }

    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            warnings.push(CoercionWarning::new(
                field,
                format!("read date {} from non-ISO text '{}'", parsed, raw),
            ));
            return Some(parsed);
        }
    }

    warnings.push(CoercionWarning::new(field, format!("could not read a date from '{}'", raw)));
    None
}

/// Non-negative whole count (installments)
pub fn count(value: &Value, field: &'static str, warnings: &mut Vec<CoercionWarning>) -> Option<u32> {
    match value {
        Value::Number(n) => {
            if let Some(whole) = n.as_u64() {
                return u32::try_from(whole).ok();
            }
            match n.as_f64() {
                Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) => Some(f as u32),
                _ => {
                    warnings.push(CoercionWarning::new(field, format!("expected a whole count, got {}", n)));
                    None
                }
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Ok(plain) = trimmed.parse::<u32>() {
                return Some(plain);
            }
            let digits: String = trimmed
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            match digits.parse::<u32>() {
                Ok(parsed) => {
                    warnings.push(CoercionWarning::new(
                        field,
                        format!("read count {} from text '{}'", parsed, trimmed),
                    ));
                    Some(parsed)
                }
                Err(_) => {
                    warnings.push(CoercionWarning::new(field, format!("could not read a count from '{}'", trimmed)));
                    None
                }
            }
        }
        _ => None,
    }
}

/// Model year between 1900 and 2100
pub fn year(value: &Value, field: &'static str, warnings: &mut Vec<CoercionWarning>) -> Option<i32> {
    let parsed = count(value, field, warnings)?;
    if (1900..=2100).contains(&parsed) {
        i32::try_from(parsed).ok()
    } else {
        warnings.push(CoercionWarning::new(field, format!("{} is not a plausible year", parsed)));
        None
    }
}

/// Parse amounts such as `$1,234.56 MXN` or `1.234,56 €`
///
/// The text must hold exactly one numeric group; percentages and text with
/// several figures (`12 pagos de $1,000.00`) are not amounts.
fn parse_money_text(raw: &str) -> Option<f64> {
    if raw.contains('%') {
        return None;
    }

    let mut groups = numeric_groups(raw);
    let (start, kept) = groups.next()?;
    if groups.next().is_some() {
        return None;
    }
    let negative = raw[..start].contains('-');

    let last_dot = kept.rfind('.');
    let last_comma = kept.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if comma > dot => kept.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => kept.replace(',', ""),
        (None, Some(comma)) => {
            let decimals = kept.len() - comma - 1;
            if kept.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                kept.replace(',', ".")
            } else {
                kept.replace(',', "")
            }
        }
        (Some(_), None) if kept.matches('.').count() > 1 => kept.replace('.', ""),
        _ => kept.to_string(),
    };

    let amount = normalized.parse::<f64>().ok()?;
    Some(round_cents(if negative { -amount } else { amount }))
}

/// Runs of digits and separators that contain at least one digit, with the
/// byte offset where each run starts
fn numeric_groups(raw: &str) -> impl Iterator<Item = (usize, &str)> {
    raw.split(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .filter_map(move |run| {
            let trimmed = run.trim_matches(|c| c == '.' || c == ',');
            if !trimmed.chars().any(|c| c.is_ascii_digit()) {
                return None;
            }
            let start = trimmed.as_ptr() as usize - raw.as_ptr() as usize;
            Some((start, trimmed))
        })
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text() {
        assert_eq!(text(&json!("  Acme  ")), Some("Acme".to_string()));
        assert_eq!(text(&json!("   ")), None);
        assert_eq!(text(&json!(12345)), Some("12345".to_string()));
        assert_eq!(text(&json!(null)), None);
        assert_eq!(text(&json!({"a": 1})), None);
    }

    #[test]
    fn test_money_plain_values_do_not_warn() {
        let mut warnings = Vec::new();
        assert_eq!(money(&json!(1200.5), "premium", &mut warnings), Some(1200.5));
        assert_eq!(money(&json!("1200.50"), "premium", &mut warnings), Some(1200.5));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_money_with_symbols_warns() {
        let mut warnings = Vec::new();
        assert_eq!(money(&json!("$12,345.67 MXN"), "premium", &mut warnings), Some(12345.67));
        assert_eq!(money(&json!("1.234,56 €"), "premium", &mut warnings), Some(1234.56));
        assert_eq!(money(&json!("$ 1,500"), "premium", &mut warnings), Some(1500.0));
        assert_eq!(money(&json!("2.500.000"), "premium", &mut warnings), Some(2_500_000.0));
        assert_eq!(warnings.len(), 4);
        assert_eq!(warnings[0].field, "premium");
    }

    #[test]
    fn test_money_unreadable() {
        let mut warnings = Vec::new();
        assert_eq!(money(&json!("pending"), "premium", &mut warnings), None);
        assert_eq!(money(&json!(true), "premium", &mut warnings), None);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_money_rejects_non_finite() {
        let mut warnings = Vec::new();
        assert_eq!(money(&json!("NaN"), "premium", &mut warnings), None);
        assert_eq!(money(&json!("inf"), "monthly_amount", &mut warnings), None);
        assert_eq!(money(&json!("-infinity"), "premium", &mut warnings), None);
        assert_eq!(warnings.len(), 3);
        assert_eq!(warnings[1].field, "monthly_amount");
    }

    #[test]
    fn test_money_does_not_merge_separate_figures() {
        let mut warnings = Vec::new();
        assert_eq!(money(&json!("12 pagos de $1,000.00"), "premium", &mut warnings), None);
        assert_eq!(money(&json!("5%"), "deductible", &mut warnings), None);
        assert_eq!(money(&json!("10 % de la suma"), "deductible", &mut warnings), None);
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().all(|w| w.message.starts_with("could not read")));

        warnings.clear();
        assert_eq!(money(&json!("-$250.00"), "premium", &mut warnings), Some(-250.0));
        assert_eq!(money(&json!("Total: $3,200.00."), "premium", &mut warnings), Some(3200.0));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_iso_dates() {
        let mut warnings = Vec::new();
        let expected = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(date(&json!("2025-03-09"), "expiration_date", &mut warnings), Some(expected));
        assert_eq!(date(&json!("2025-03-09T12:00:00Z"), "expiration_date", &mut warnings), Some(expected));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_day_first_dates_warn() {
        let mut warnings = Vec::new();
        let expected = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(date(&json!("09/03/2025"), "effective_date", &mut warnings), Some(expected));
        assert_eq!(date(&json!("09-03-2025"), "effective_date", &mut warnings), Some(expected));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_bad_dates() {
        let mut warnings = Vec::new();
        assert_eq!(date(&json!("next year"), "effective_date", &mut warnings), None);
        assert_eq!(date(&json!("31/02/2025"), "effective_date", &mut warnings), None);
        assert_eq!(date(&json!(20250101), "effective_date", &mut warnings), None);
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_count() {
        let mut warnings = Vec::new();
        assert_eq!(count(&json!(12), "installment_count", &mut warnings), Some(12));
        assert_eq!(count(&json!(12.0), "installment_count", &mut warnings), Some(12));
        assert_eq!(count(&json!("4"), "installment_count", &mut warnings), Some(4));
        assert!(warnings.is_empty());

        assert_eq!(count(&json!("12 pagos mensuales"), "installment_count", &mut warnings), Some(12));
        assert_eq!(count(&json!(2.5), "installment_count", &mut warnings), None);
        assert_eq!(count(&json!("contado"), "installment_count", &mut warnings), None);
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_year() {
        let mut warnings = Vec::new();
        assert_eq!(year(&json!(2022), "vehicle_year", &mut warnings), Some(2022));
        assert_eq!(year(&json!("2019"), "vehicle_year", &mut warnings), Some(2019));
        assert_eq!(year(&json!(22), "vehicle_year", &mut warnings), None);
        assert_eq!(warnings.len(), 1);
    }
}
