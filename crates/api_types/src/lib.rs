use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of failure kinds carried by every error envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotAuthenticated,
    NotFound,
    ValidationError,
    RateLimited,
    PartialOwnership,
    ExternalServiceUnavailable,
    ParseError,
    StorageError,
    EmptyResponse,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::NotFound => "not_found",
            Self::ValidationError => "validation_error",
            Self::RateLimited => "rate_limited",
            Self::PartialOwnership => "partial_ownership",
            Self::ExternalServiceUnavailable => "external_service_unavailable",
            Self::ParseError => "parse_error",
            Self::StorageError => "storage_error",
            Self::EmptyResponse => "empty_response",
        }
    }
}

pub mod envelope {
    use serde::de::DeserializeOwned;

    use super::*;

    /// Response body of every endpoint.
    ///
    /// Success: `{"success": true, "data": ...}`.
    /// Failure: `{"success": false, "error": "...", "kind": "..."}`.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(bound(deserialize = "T: Deserialize<'de>"))]
    pub struct Envelope<T> {
        pub success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub data: Option<T>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub kind: Option<ErrorKind>,
    }

    impl<T> Envelope<T> {
        pub fn ok(data: T) -> Self {
            Self {
                success: true,
                data: Some(data),
                error: None,
                kind: None,
            }
        }

        pub fn err(kind: ErrorKind, error: impl Into<String>) -> Self {
            Self {
                success: false,
                data: None,
                error: Some(error.into()),
                kind: Some(kind),
            }
        }
    }

    /// Failure decoded from a response body.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ApiFailure {
        pub kind: ErrorKind,
        pub message: String,
    }

    impl std::fmt::Display for ApiFailure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}: {}", self.kind.as_str(), self.message)
        }
    }

    impl std::error::Error for ApiFailure {}

    impl ApiFailure {
        fn empty(message: &str) -> Self {
            Self {
                kind: ErrorKind::EmptyResponse,
                message: message.to_string(),
            }
        }
    }

    /// Decodes an envelope body on the client side.
    ///
    /// An empty body, a body that is not a JSON object, an object without a
    /// `success` flag (`{}` included) and a success without `data` are all
    /// reported as [`ErrorKind::EmptyResponse`].
    pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiFailure> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiFailure::empty("empty response body"));
        }
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|_| ApiFailure::empty("response body is not JSON"))?;
        let Some(object) = value.as_object() else {
            return Err(ApiFailure::empty("response body is not an object"));
        };
        if !object.contains_key("success") {
            return Err(ApiFailure::empty("response body has no success flag"));
        }

        let envelope: Envelope<T> = serde_json::from_value(value).map_err(|err| ApiFailure {
            kind: ErrorKind::ParseError,
            message: err.to_string(),
        })?;
        if envelope.success {
            return envelope
                .data
                .ok_or_else(|| ApiFailure::empty("response carries no data"));
        }
        Err(ApiFailure {
            kind: envelope.kind.unwrap_or(ErrorKind::EmptyResponse),
            message: envelope.error.unwrap_or_default(),
        })
    }
}

pub mod account {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum AccountKind {
        Current,
        Savings,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub name: String,
        pub kind: AccountKind,
        /// Opening balance, defaults to 0.
        #[serde(default)]
        pub balance: Decimal,
        #[serde(default)]
        pub is_default: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: Uuid,
        pub name: String,
        pub kind: AccountKind,
        pub balance: Decimal,
        pub initial_balance: Decimal,
        pub is_default: bool,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountDetail {
        pub account: AccountView,
        pub transactions: Vec<super::transaction::TransactionView>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum RecurringInterval {
        Daily,
        Weekly,
        Monthly,
        Yearly,
    }

    /// Body of both create and full update.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub account_id: Uuid,
        pub kind: TransactionKind,
        /// Must be > 0; `kind` gives the sign.
        pub amount: Decimal,
        pub category: String,
        pub description: Option<String>,
        /// RFC3339 timestamp.
        pub date: DateTime<Utc>,
        #[serde(default)]
        pub is_recurring: bool,
        pub recurring_interval: Option<RecurringInterval>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub account_id: Uuid,
        pub kind: TransactionKind,
        pub amount: Decimal,
        pub category: String,
        pub description: Option<String>,
        pub date: DateTime<Utc>,
        pub is_recurring: bool,
        pub recurring_interval: Option<RecurringInterval>,
        pub next_recurring_date: Option<DateTime<Utc>>,
        pub last_processed_at: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    /// Query string of `GET /transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionListQuery {
        pub account_id: Option<Uuid>,
        pub kind: Option<TransactionKind>,
        #[serde(default)]
        pub recurring_only: bool,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BulkDelete {
        pub ids: Vec<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BulkDeleted {
        pub deleted: u64,
    }
}

pub mod recurring {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RecurringProcess {
        /// Reference instant; the server clock when absent.
        pub now: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecurringProcessed {
        pub templates: usize,
        pub created: Vec<Uuid>,
        #[serde(default)]
        pub failed: Vec<Uuid>,
    }
}

pub mod receipt {
    use super::*;

    /// Draft produced by a receipt scan. Every field is independently
    /// optional.
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReceiptDraft {
        pub amount: Option<Decimal>,
        pub date: Option<DateTime<Utc>>,
        pub description: Option<String>,
        pub category: Option<String>,
        pub merchant_name: Option<String>,
    }
}

pub mod user {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct UserSync {
        pub name: Option<String>,
        pub email: Option<String>,
        pub image_url: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub username: String,
        pub name: Option<String>,
        pub email: Option<String>,
        pub image_url: Option<String>,
        pub updated_at: DateTime<Utc>,
    }
}

#[cfg(test)]
mod tests {
    use super::envelope::{Envelope, decode};
    use super::receipt::ReceiptDraft;
    use super::*;

    #[test]
    fn error_kind_wire_names() {
        let json = serde_json::to_string(&ErrorKind::ExternalServiceUnavailable).unwrap();
        assert_eq!(json, "\"external_service_unavailable\"");
        assert_eq!(ErrorKind::RateLimited.as_str(), "rate_limited");
    }

    #[test]
    fn decode_rejects_empty_bodies() {
        for body in [&b""[..], b"  ", b"{}", b"[]", b"null", b"42", b"not json"] {
            let err = decode::<ReceiptDraft>(body).unwrap_err();
            assert_eq!(err.kind, ErrorKind::EmptyResponse, "body {body:?}");
        }
    }

    #[test]
    fn decode_success_without_data_is_empty() {
        let err = decode::<ReceiptDraft>(br#"{"success": true}"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::EmptyResponse);
    }

    #[test]
    fn decode_failure_keeps_kind_and_message() {
        let body = serde_json::to_vec(&Envelope::<()>::err(ErrorKind::RateLimited, "slow down"))
            .unwrap();
        let err = decode::<ReceiptDraft>(&body).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RateLimited);
        assert_eq!(err.message, "slow down");
    }

    #[test]
    fn draft_uses_camel_case_and_plain_numbers() {
        let body = br#"{"success": true, "data": {"amount": 12.5, "date": null, "description": "Lunch", "category": "Dining", "merchantName": "Cafe"}}"#;
        let draft = decode::<ReceiptDraft>(body).unwrap();
        assert_eq!(draft.amount, Some(Decimal::new(125, 1)));
        assert_eq!(draft.merchant_name.as_deref(), Some("Cafe"));

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["merchantName"], "Cafe");
        assert_eq!(json["amount"], serde_json::json!(12.5));
    }
}
