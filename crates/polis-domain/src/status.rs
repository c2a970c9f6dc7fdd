//! Status module - lifecycle status derived from a policy's validity dates

use chrono::{Datelike, NaiveDate};

/// Days before expiration during which a policy counts as expiring
pub const EXPIRING_WINDOW_DAYS: i64 = 30;

/// Days after expiration after which a lapsed policy counts as superseded
pub const EXPIRED_GRACE_DAYS: i64 = 30;

/// Derived lifecycle status of a policy
///
/// Status is never extracted; it is always recomputed from the expiration
/// (and optionally effective) date relative to a reference day:
/// - Current: more than 30 days of validity left
/// - Expiring: expires within the next 30 days (or today)
/// - Expired: lapsed within the last 30 days
/// - Superseded: lapsed long ago, or belongs to a previous renewal cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyStatus {
    /// In force with more than the expiring window left
    Current,

    /// In force but expires soon
    Expiring,

    /// Recently lapsed
    Expired,

    /// Lapsed in a prior cycle and never renewed
    Superseded,
}

impl PolicyStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyStatus::Current => "current",
            PolicyStatus::Expiring => "expiring",
            PolicyStatus::Expired => "expired",
            PolicyStatus::Superseded => "superseded",
        }
    }

    /// Parse a status from its stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "current" => Some(PolicyStatus::Current),
            "expiring" => Some(PolicyStatus::Expiring),
            "expired" => Some(PolicyStatus::Expired),
            "superseded" => Some(PolicyStatus::Superseded),
            _ => None,
        }
    }

    /// All statuses, in lifecycle order
    pub fn all() -> [PolicyStatus; 4] {
        [
            PolicyStatus::Current,
            PolicyStatus::Expiring,
            PolicyStatus::Expired,
            PolicyStatus::Superseded,
        ]
    }
}

impl std::str::FromStr for PolicyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid policy status: {}", s))
    }
}

impl std::fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the lifecycle status of a policy as of `today`
///
/// Year-boundary checks run before the day-offset checks so that a policy
/// missed in a previous renewal cycle reads as superseded, not expired.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use polis_domain::{derive_status, PolicyStatus};
///
/// let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
/// let expiration = NaiveDate::from_ymd_opt(2025, 1, 30).unwrap();
/// assert_eq!(derive_status(Some(expiration), None, today), PolicyStatus::Expiring);
/// assert_eq!(derive_status(None, None, today), PolicyStatus::Current);
/// ```
pub fn derive_status(
    expiration: Option<NaiveDate>,
    start: Option<NaiveDate>,
    today: NaiveDate,
) -> PolicyStatus {
    let Some(expiration) = expiration else {
        return PolicyStatus::Current;
    };

    let days_left = (expiration - today).num_days();
    let current_year = today.year();

    if let Some(start) = start {
        if start.year() < current_year && days_left < 0 {
            return PolicyStatus::Superseded;
        }
    }

    if expiration.year() < current_year {
        PolicyStatus::Superseded
    } else if days_left < -EXPIRED_GRACE_DAYS {
        PolicyStatus::Superseded
    } else if days_left < 0 {
        PolicyStatus::Expired
    } else if days_left <= EXPIRING_WINDOW_DAYS {
        PolicyStatus::Expiring
    } else {
        PolicyStatus::Current
    }
}
