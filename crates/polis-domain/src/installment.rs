//! Installment and coverage-line children of a policy

use chrono::{Months, NaiveDate};

/// One scheduled payment of a policy's premium
#[derive(Debug, Clone, PartialEq)]
pub struct Installment {
    /// 1-based position in the schedule, unique within the policy
    pub sequence: u32,

    /// Amount due
    pub amount: f64,

    /// Due date
    pub due_date: NaiveDate,

    /// Whether the installment has been paid
    pub paid: bool,
}

/// One coverage line listed on a policy
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageLine {
    /// What is covered
    pub description: String,

    /// Sum insured for this line, if stated
    pub limit: Option<f64>,
}

impl CoverageLine {
    /// Create a coverage line
    pub fn new(description: impl Into<String>, limit: Option<f64>) -> Self {
        Self {
            description: description.into(),
            limit,
        }
    }
}

/// Build a payment schedule of `count` installments
///
/// The first installment is due on `first_due`; each following one is due one
/// calendar month later (end-of-month dates clamp, so Jan 31 is followed by
/// the last day of February). All installments start out pending.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use polis_domain::generate_installments;
///
/// let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let schedule = generate_installments(12, 100.0, start);
/// assert_eq!(schedule.len(), 12);
/// assert_eq!(schedule[11].sequence, 12);
/// ```
pub fn generate_installments(count: u32, amount: f64, first_due: NaiveDate) -> Vec<Installment> {
    (0..count)
        .map_while(|offset| {
            first_due
                .checked_add_months(Months::new(offset))
                .map(|due_date| Installment {
                    sequence: offset + 1,
                    amount,
                    due_date,
                    paid: false,
                })
        })
        .collect()
}

/// Split a total premium into `count` equal amounts, rounded to cents
pub fn split_premium(premium: f64, count: u32) -> Option<f64> {
    if count == 0 {
        return None;
    }
    Some(((premium / f64::from(count)) * 100.0).round() / 100.0)
}
