use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::prompt::canonical_category;

/// Fields extracted from a receipt. Every field is independently optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub amount: Option<Decimal>,
    pub date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    /// One of [`crate::CATEGORIES`].
    pub category: Option<String>,
    pub merchant_name: Option<String>,
}

impl Draft {
    /// Maps the object returned by the model. A field that is missing or
    /// does not parse is left empty; it never fails the whole draft.
    pub(crate) fn from_object(object: &Map<String, Value>) -> Self {
        let merchant_name = object
            .get("merchantName")
            .or_else(|| object.get("merchant_name"))
            .and_then(text);
        let description = object
            .get("description")
            .and_then(text)
            .or_else(|| merchant_name.clone());

        Self {
            amount: object.get("amount").and_then(amount),
            date: object.get("date").and_then(date),
            description,
            category: object
                .get("category")
                .and_then(Value::as_str)
                .and_then(canonical_category)
                .map(str::to_string),
            merchant_name,
        }
    }
}

fn text(value: &Value) -> Option<String> {
    let value = value.as_str()?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => Decimal::from_str(&number.to_string())
            .or_else(|_| Decimal::from_scientific(&number.to_string()))
            .ok(),
        Value::String(raw) => {
            let cleaned: String = raw
                .trim()
                .trim_start_matches(['$', '€', '£', '¥'])
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    }
}

fn date(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
