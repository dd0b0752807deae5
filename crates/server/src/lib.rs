use api_types::{ErrorKind, envelope::Envelope};
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use engine::EngineError;
use receipts::ExtractionError;

pub use guard::{AbuseGuard, Conclusion, GuardError, HttpRateLimiter, RateLimitError, RateLimiter};
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};
pub use user::Caller;

mod accounts;
mod guard;
mod receipts_scan;
mod recurring;
mod server;
mod transactions;
mod user;

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Extraction(ExtractionError),
    Guard(GuardError),
    /// The request itself is malformed.
    Request { status: StatusCode, message: String },
    /// Receipt scanning is not configured on this server.
    ExtractionDisabled,
}

fn engine_kind(err: &EngineError) -> ErrorKind {
    match err {
        EngineError::NotFound(_) => ErrorKind::NotFound,
        EngineError::Validation(_) => ErrorKind::ValidationError,
        EngineError::PartialOwnership { .. } => ErrorKind::PartialOwnership,
        EngineError::Conflict(_) | EngineError::Corrupted(_) | EngineError::Database(_) => {
            ErrorKind::StorageError
        }
    }
}

fn extraction_kind(err: &ExtractionError) -> ErrorKind {
    match err {
        ExtractionError::Validation(_) => ErrorKind::ValidationError,
        ExtractionError::ExternalServiceUnavailable { .. } => ErrorKind::ExternalServiceUnavailable,
        ExtractionError::Parse(_) => ErrorKind::ParseError,
    }
}

fn guard_kind(err: &GuardError) -> ErrorKind {
    match err {
        GuardError::NotAuthenticated => ErrorKind::NotAuthenticated,
        GuardError::RateLimited => ErrorKind::RateLimited,
        GuardError::Unavailable(_) => ErrorKind::ExternalServiceUnavailable,
    }
}

fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotAuthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::PartialOwnership => StatusCode::FORBIDDEN,
        ErrorKind::ExternalServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ParseError | ErrorKind::EmptyResponse => StatusCode::BAD_GATEWAY,
        ErrorKind::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Corrupted(detail) => {
            tracing::error!("corrupted record: {detail}");
            "internal server error".to_string()
        }
        EngineError::Conflict(account_id) => {
            tracing::error!(%account_id, "giving up after repeated concurrent updates");
            "the account is busy, please retry".to_string()
        }
        other => other.to_string(),
    }
}

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::Engine(err) => engine_kind(err),
            ServerError::Extraction(err) => extraction_kind(err),
            ServerError::Guard(err) => guard_kind(err),
            ServerError::Request { .. } => ErrorKind::ValidationError,
            ServerError::ExtractionDisabled => ErrorKind::ExternalServiceUnavailable,
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::Request {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let kind = self.kind();
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_kind(kind), message_for_engine_error(err)),
            ServerError::Extraction(err) => (status_for_kind(kind), err.to_string()),
            ServerError::Guard(err) => (status_for_kind(kind), err.to_string()),
            ServerError::Request { status, message } => (status, message),
            ServerError::ExtractionDisabled => (
                status_for_kind(kind),
                "AI service is not configured.".to_string(),
            ),
        };

        (status, Json(Envelope::<()>::err(kind, error))).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<ExtractionError> for ServerError {
    fn from(value: ExtractionError) -> Self {
        Self::Extraction(value)
    }
}

impl From<GuardError> for ServerError {
    fn from(value: GuardError) -> Self {
        Self::Guard(value)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(value: JsonRejection) -> Self {
        Self::Request {
            status: value.status(),
            message: value.body_text(),
        }
    }
}

impl From<QueryRejection> for ServerError {
    fn from(value: QueryRejection) -> Self {
        Self::bad_request(value.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(value: PathRejection) -> Self {
        Self::bad_request(value.body_text())
    }
}
