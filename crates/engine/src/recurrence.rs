//! Recurring schedule arithmetic.
//!
//! [`next_recurring_date`] is pure: no I/O and no clock access.

use chrono::{DateTime, Days, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurringInterval {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurringInterval {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

impl TryFrom<&str> for RecurringInterval {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            "YEARLY" => Ok(Self::Yearly),
            other => Err(EngineError::Validation(format!(
                "invalid recurring interval: {other}"
            ))),
        }
    }
}

/// Returns the next occurrence after `start`.
///
/// Month and year steps clamp to the last day of the target month, so
/// Jan 31 is followed by the last day of February. The time of day is kept.
/// `None` only when the result falls outside chrono's representable range.
pub fn next_recurring_date(
    start: DateTime<Utc>,
    interval: RecurringInterval,
) -> Option<DateTime<Utc>> {
    match interval {
        RecurringInterval::Daily => start.checked_add_days(Days::new(1)),
        RecurringInterval::Weekly => start.checked_add_days(Days::new(7)),
        RecurringInterval::Monthly => start.checked_add_months(Months::new(1)),
        RecurringInterval::Yearly => start.checked_add_months(Months::new(12)),
    }
}

/// Same as [`next_recurring_date`] for an interval stored as text.
///
/// Unknown intervals mean "not recurring".
pub fn next_recurring_date_from_str(start: DateTime<Utc>, interval: &str) -> Option<DateTime<Utc>> {
    RecurringInterval::try_from(interval)
        .ok()
        .and_then(|interval| next_recurring_date(start, interval))
}
