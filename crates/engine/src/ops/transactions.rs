use chrono::{DateTime, Utc};

use crate::{
    EngineError, RecurringInterval, ResultEngine, TransactionFields, next_recurring_date,
    util::{normalize_optional_text, normalize_required_text},
};

mod list;
mod write;

pub use list::TransactionListFilter;

/// Transaction fields after validation, with the derived schedule.
#[derive(Clone, Debug)]
struct ValidatedFields {
    category: String,
    description: Option<String>,
    recurring_interval: Option<RecurringInterval>,
    next_recurring_date: Option<DateTime<Utc>>,
}

impl ValidatedFields {
    fn is_recurring(&self) -> bool {
        self.recurring_interval.is_some()
    }
}

/// Validates user-supplied fields and derives `next_recurring_date`.
///
/// A recurring transaction always carries an interval and a next date after
/// its own date; a non-recurring one carries neither.
fn validate_fields(fields: &TransactionFields) -> ResultEngine<ValidatedFields> {
    if !fields.amount.is_positive() {
        return Err(EngineError::Validation(
            "amount must be a positive number".to_string(),
        ));
    }
    let category = normalize_required_text(&fields.category, "category")?;
    let description = normalize_optional_text(fields.description.as_deref());

    let (recurring_interval, next_recurring_date) = if fields.is_recurring {
        let interval = fields.recurring_interval.ok_or_else(|| {
            EngineError::Validation(
                "recurring interval is required for recurring transactions".to_string(),
            )
        })?;
        let next = next_recurring_date(fields.occurred_at, interval).ok_or_else(|| {
            EngineError::Validation("next recurring date is out of range".to_string())
        })?;
        (Some(interval), Some(next))
    } else {
        (None, None)
    };

    Ok(ValidatedFields {
        category,
        description,
        recurring_interval,
        next_recurring_date,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::*;
    use crate::{Money, TransactionKind};

    fn fields(amount: Money) -> TransactionFields {
        TransactionFields::new(
            Uuid::new_v4(),
            TransactionKind::Expense,
            amount,
            "Groceries",
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn rejects_non_positive_amounts() {
        for amount in [dec!(0), dec!(-1)] {
            assert_eq!(
                validate_fields(&fields(Money::new(amount))).unwrap_err(),
                EngineError::Validation("amount must be a positive number".to_string())
            );
        }
    }

    #[test]
    fn recurring_requires_interval() {
        let input = fields(Money::new(dec!(10))).recurrence(true, None);
        assert_eq!(
            validate_fields(&input).unwrap_err(),
            EngineError::Validation(
                "recurring interval is required for recurring transactions".to_string()
            )
        );
    }

    #[test]
    fn recurring_derives_next_date() {
        let input = fields(Money::new(dec!(10))).recurring(RecurringInterval::Weekly);
        let validated = validate_fields(&input).unwrap();
        assert!(validated.is_recurring());
        assert_eq!(
            validated.next_recurring_date,
            Some(Utc.with_ymd_and_hms(2024, 1, 22, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn interval_without_flag_is_dropped() {
        let input =
            fields(Money::new(dec!(10))).recurrence(false, Some(RecurringInterval::Monthly));
        let validated = validate_fields(&input).unwrap();
        assert!(!validated.is_recurring());
        assert_eq!(validated.next_recurring_date, None);
    }

    #[test]
    fn blank_category_is_rejected() {
        let mut input = fields(Money::new(dec!(10)));
        input.category = "  ".to_string();
        assert!(validate_fields(&input).is_err());
    }
}
