//! Receipt scanning endpoint.

use api_types::{envelope::Envelope, receipt::ReceiptDraft};
use axum::{
    Extension, Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};

use crate::{ServerError, server::ServerState, user::Caller};

const FILE_FIELD: &str = "file";

fn draft_view(draft: receipts::Draft) -> ReceiptDraft {
    ReceiptDraft {
        amount: draft.amount,
        date: draft.date,
        description: draft.description,
        category: draft.category,
        merchant_name: draft.merchant_name,
    }
}

/// Accepts a multipart form with a single `file` field holding the image.
pub async fn scan(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Envelope<ReceiptDraft>>, ServerError> {
    let user_id = state.guard.check(&caller).await?;
    let Some(extractor) = state.extractor.clone() else {
        tracing::error!("receipt scan requested but no model service is configured");
        return Err(ServerError::ExtractionDisabled);
    };

    let mut multipart = multipart.map_err(|rejection| ServerError::Request {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|err| ServerError::Request {
        status: err.status(),
        message: err.body_text(),
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let mime_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|err| ServerError::Request {
            status: err.status(),
            message: err.body_text(),
        })?;
        upload = Some((bytes, mime_type));
        break;
    }
    let Some((bytes, mime_type)) = upload else {
        return Err(ServerError::bad_request("No file provided."));
    };

    tracing::debug!(%user_id, bytes = bytes.len(), "scanning receipt");
    let draft = extractor.extract(&bytes, mime_type.as_deref()).await?;

    Ok(Json(Envelope::ok(draft_view(draft))))
}
